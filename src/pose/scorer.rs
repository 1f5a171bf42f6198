use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::pose::landmark::{find, idx, Landmark};

/// Below this span (normalized units) a body measurement is treated as degenerate.
const MIN_SPAN: f64 = 1e-3;

const T_SHOULDER_TOLERANCE: f64 = 0.12;
const T_LEVEL_TOLERANCE: f64 = 0.08;
const T_REACH_FRACTION: f64 = 0.6;

const Y_TARGET_ANGLE_DEG: f64 = 30.0;
const Y_ANGLE_WINDOW_DEG: f64 = 20.0;
const Y_OUTWARD_FRACTION: f64 = 0.12;
const Y_GATE_PENALTY: f64 = 0.45;

const DOWN_VERTICAL_WEIGHT: f64 = 0.8;
const DOWN_MIDLINE_FRACTION: f64 = 0.8;

/// The closed set of target poses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PoseDefinition {
    #[serde(rename = "Arms Down")]
    ArmsDown,
    #[serde(rename = "Y-Pose")]
    YPose,
    #[serde(rename = "T-Pose")]
    TPose,
    #[serde(rename = "L-Pose")]
    LPose,
}

impl PoseDefinition {
    pub const ALL: [PoseDefinition; 4] = [Self::ArmsDown, Self::YPose, Self::TPose, Self::LPose];

    /// Poses the selector may hand out. `LPose` is scored but never chosen.
    pub const SELECTABLE: [PoseDefinition; 3] = [Self::ArmsDown, Self::YPose, Self::TPose];

    pub fn name(self) -> &'static str {
        match self {
            Self::ArmsDown => "Arms Down",
            Self::YPose => "Y-Pose",
            Self::TPose => "T-Pose",
            Self::LPose => "L-Pose",
        }
    }

    pub fn is_selectable(self) -> bool {
        Self::SELECTABLE.contains(&self)
    }

    /// Lenient lookup: case, spaces, `-` and `_` are ignored ("t_pose", "ARMS DOWN").
    pub fn from_name(name: &str) -> Option<Self> {
        let key: String = name
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .flat_map(char::to_lowercase)
            .collect();
        match key.as_str() {
            "armsdown" => Some(Self::ArmsDown),
            "ypose" => Some(Self::YPose),
            "tpose" => Some(Self::TPose),
            "lpose" => Some(Self::LPose),
            _ => None,
        }
    }

    pub fn min_visibility(self) -> f64 {
        match self {
            Self::ArmsDown => 0.3,
            Self::YPose => 0.35,
            Self::TPose | Self::LPose => 0.4,
        }
    }

    /// Continuous match score in [0, 1]. This is what decides round outcomes.
    pub fn score(self, landmarks: &[Landmark]) -> f64 {
        let min_vis = self.min_visibility();
        let score = match self {
            Self::TPose => Body::read(landmarks, min_vis, false).map_or(0.0, |b| t_pose_score(&b)),
            Self::YPose => Body::read(landmarks, min_vis, false).map_or(0.0, |b| y_pose_score(&b)),
            Self::ArmsDown => {
                Body::read(landmarks, min_vis, true).map_or(0.0, |b| arms_down_score(&b))
            }
            Self::LPose => Body::read(landmarks, min_vis, true).map_or(0.0, |b| l_pose_score(&b)),
        };
        clamp01(score)
    }

    /// Strict pass/fail check, kept for diagnostics only.
    pub fn matches(self, landmarks: &[Landmark]) -> bool {
        let min_vis = self.min_visibility();
        match self {
            Self::TPose => Body::read(landmarks, min_vis, false).is_some_and(|b| t_pose_matches(&b)),
            Self::YPose => Body::read(landmarks, min_vis, false).is_some_and(|b| y_pose_matches(&b)),
            Self::ArmsDown => {
                Body::read(landmarks, min_vis, true).is_some_and(|b| arms_down_matches(&b))
            }
            Self::LPose => Body::read(landmarks, min_vis, true).is_some_and(|b| l_pose_matches(&b)),
        }
    }
}

impl fmt::Display for PoseDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PoseDefinition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| format!("unknown pose: {s}"))
    }
}

#[derive(Debug, Clone, Copy)]
struct Point {
    x: f64,
    y: f64,
}

#[derive(Debug, Clone, Copy)]
struct Arm {
    shoulder: Point,
    elbow: Point,
    wrist: Point,
    index_finger: Option<Point>,
    /// +1.0 when this side sits right of the torso centre after mirroring, else -1.0.
    side: f64,
}

/// Upper-body geometry in mirrored, normalized coordinates.
#[derive(Debug, Clone, Copy)]
struct Body {
    left: Arm,
    right: Arm,
    shoulder_y: f64,
    shoulder_width: f64,
    center_x: f64,
    hip_y: Option<f64>,
}

impl Body {
    fn read(landmarks: &[Landmark], min_vis: f64, need_hips: bool) -> Option<Self> {
        let point = |index: usize| -> Option<Point> {
            find(landmarks, index)
                .filter(|lm| lm.visibility >= min_vis)
                .map(|lm| Point {
                    x: 1.0 - lm.x,
                    y: lm.y,
                })
        };

        let ls = point(idx::LEFT_SHOULDER)?;
        let rs = point(idx::RIGHT_SHOULDER)?;
        let le = point(idx::LEFT_ELBOW)?;
        let re = point(idx::RIGHT_ELBOW)?;
        let lw = point(idx::LEFT_WRIST)?;
        let rw = point(idx::RIGHT_WRIST)?;

        let hip_y = match (point(idx::LEFT_HIP), point(idx::RIGHT_HIP)) {
            (Some(lh), Some(rh)) => Some((lh.y + rh.y) / 2.0),
            _ if need_hips => return None,
            _ => None,
        };

        let shoulder_width = (ls.x - rs.x).abs();
        if shoulder_width < MIN_SPAN {
            return None;
        }
        let center_x = (ls.x + rs.x) / 2.0;
        let side_of = |p: Point| if p.x >= center_x { 1.0 } else { -1.0 };

        Some(Self {
            left: Arm {
                shoulder: ls,
                elbow: le,
                wrist: lw,
                index_finger: point(idx::LEFT_INDEX),
                side: side_of(ls),
            },
            right: Arm {
                shoulder: rs,
                elbow: re,
                wrist: rw,
                index_finger: point(idx::RIGHT_INDEX),
                side: side_of(rs),
            },
            shoulder_y: (ls.y + rs.y) / 2.0,
            shoulder_width,
            center_x,
            hip_y,
        })
    }

    fn arms(&self) -> [&Arm; 2] {
        [&self.left, &self.right]
    }

    /// Positive shoulder-to-hip distance, or `None` for degenerate frames.
    fn torso_height(&self) -> Option<(f64, f64)> {
        let hip_y = self.hip_y?;
        let torso = (hip_y - self.shoulder_y).abs();
        (torso >= MIN_SPAN).then_some((hip_y, torso))
    }

    /// Horizontal distance of the wrist past its own shoulder, away from the torso.
    fn reach(&self, arm: &Arm) -> f64 {
        (arm.wrist.x - arm.shoulder.x) * arm.side
    }

    /// Horizontal distance of the wrist from the torso centre, on its own side.
    fn outward(&self, arm: &Arm) -> f64 {
        (arm.wrist.x - self.center_x) * arm.side
    }
}

fn clamp01(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

/// 1 at `target`, falling linearly to 0 at `tolerance` away.
fn closeness(value: f64, target: f64, tolerance: f64) -> f64 {
    if tolerance <= 0.0 {
        return 0.0;
    }
    clamp01(1.0 - (value - target).abs() / tolerance)
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Angle between shoulder->wrist and straight up, in degrees (0 up, 90 sideways).
fn arm_angle_from_vertical(arm: &Arm) -> f64 {
    let dx = arm.wrist.x - arm.shoulder.x;
    let dy = arm.wrist.y - arm.shoulder.y;
    dx.abs().atan2(-dy).to_degrees()
}

fn t_pose_score(b: &Body) -> f64 {
    let sy = b.shoulder_y;
    let shoulder_align = mean(&[
        closeness(b.left.wrist.y, sy, T_SHOULDER_TOLERANCE),
        closeness(b.right.wrist.y, sy, T_SHOULDER_TOLERANCE),
        closeness(b.left.elbow.y, sy, T_SHOULDER_TOLERANCE),
        closeness(b.right.elbow.y, sy, T_SHOULDER_TOLERANCE),
    ]);
    let elbow_align = mean(&[
        closeness(b.left.wrist.y, b.left.elbow.y, T_LEVEL_TOLERANCE),
        closeness(b.right.wrist.y, b.right.elbow.y, T_LEVEL_TOLERANCE),
    ]);

    let hand_align = match (b.left.index_finger, b.right.index_finger) {
        (Some(li), Some(ri)) => Some(mean(&[
            closeness(li.y, b.left.wrist.y, T_LEVEL_TOLERANCE),
            closeness(ri.y, b.right.wrist.y, T_LEVEL_TOLERANCE),
        ])),
        _ => None,
    };

    let alignment = match hand_align {
        Some(hand) => 0.7 * shoulder_align + 0.15 * elbow_align + 0.15 * hand,
        None => (0.7 * shoulder_align + 0.15 * elbow_align) / 0.85,
    };

    let reach_span = T_REACH_FRACTION * b.shoulder_width;
    let reach = b
        .arms()
        .iter()
        .map(|arm| clamp01(b.reach(arm) / reach_span))
        .fold(1.0, f64::min);

    clamp01(alignment) * reach
}

fn y_arm_score(arm: &Arm) -> f64 {
    closeness(arm_angle_from_vertical(arm), Y_TARGET_ANGLE_DEG, Y_ANGLE_WINDOW_DEG)
}

fn y_gate(b: &Body, arm: &Arm) -> bool {
    arm.wrist.y < arm.shoulder.y && b.outward(arm) >= Y_OUTWARD_FRACTION * b.shoulder_width
}

fn y_pose_score(b: &Body) -> f64 {
    let score = y_arm_score(&b.left).min(y_arm_score(&b.right));
    if y_gate(b, &b.left) && y_gate(b, &b.right) {
        score
    } else {
        score * Y_GATE_PENALTY
    }
}

fn arms_down_score(b: &Body) -> f64 {
    let Some((hip_y, torso)) = b.torso_height() else {
        return 0.0;
    };
    let vertical = mean(&[
        closeness(b.left.wrist.y, hip_y, torso),
        closeness(b.right.wrist.y, hip_y, torso),
    ]);
    let midline_span = DOWN_MIDLINE_FRACTION * b.shoulder_width;
    let horizontal = mean(&[
        closeness(b.left.wrist.x, b.center_x, midline_span),
        closeness(b.right.wrist.x, b.center_x, midline_span),
    ]);
    DOWN_VERTICAL_WEIGHT * vertical + (1.0 - DOWN_VERTICAL_WEIGHT) * horizontal
}

fn l_horizontal(b: &Body, arm: &Arm) -> f64 {
    let level = mean(&[
        closeness(arm.wrist.y, b.shoulder_y, T_SHOULDER_TOLERANCE),
        closeness(arm.elbow.y, b.shoulder_y, T_SHOULDER_TOLERANCE),
    ]);
    level * clamp01(b.reach(arm) / (T_REACH_FRACTION * b.shoulder_width))
}

fn l_pose_score(b: &Body) -> f64 {
    let Some((hip_y, torso)) = b.torso_height() else {
        return 0.0;
    };
    let down = |arm: &Arm| closeness(arm.wrist.y, hip_y, torso);
    let left_up = l_horizontal(b, &b.left).min(down(&b.right));
    let right_up = l_horizontal(b, &b.right).min(down(&b.left));
    left_up.max(right_up)
}

fn t_pose_matches(b: &Body) -> bool {
    let level = 0.10;
    b.arms().iter().all(|arm| {
        (arm.wrist.y - b.shoulder_y).abs() < level
            && (arm.elbow.y - b.shoulder_y).abs() < level
            && (arm.wrist.y - arm.elbow.y).abs() < T_LEVEL_TOLERANCE
            && b.reach(arm) >= T_REACH_FRACTION * b.shoulder_width
    })
}

fn y_pose_matches(b: &Body) -> bool {
    b.arms().iter().all(|arm| {
        let angle = arm_angle_from_vertical(arm);
        (15.0..=45.0).contains(&angle) && y_gate(b, arm)
    })
}

fn arms_down_matches(b: &Body) -> bool {
    let Some((hip_y, torso)) = b.torso_height() else {
        return false;
    };
    b.arms().iter().all(|arm| {
        (arm.wrist.y - hip_y).abs() < 0.35 * torso
            && (arm.wrist.x - b.center_x).abs() < b.shoulder_width
    })
}

fn l_pose_matches(b: &Body) -> bool {
    let Some((hip_y, torso)) = b.torso_height() else {
        return false;
    };
    let horizontal = |arm: &Arm| {
        (arm.wrist.y - b.shoulder_y).abs() < 0.10
            && b.reach(arm) >= T_REACH_FRACTION * b.shoulder_width
    };
    let down = |arm: &Arm| (arm.wrist.y - hip_y).abs() < 0.35 * torso;
    (horizontal(&b.left) && down(&b.right)) || (horizontal(&b.right) && down(&b.left))
}
