use pose_round_backend::pose::{Landmark, PoseDefinition};

const VIS: f64 = 0.95;

fn torso() -> Vec<Landmark> {
    vec![
        Landmark::new(11, 0.40, 0.40, VIS),
        Landmark::new(12, 0.60, 0.40, VIS),
        Landmark::new(23, 0.42, 0.70, VIS),
        Landmark::new(24, 0.58, 0.70, VIS),
    ]
}

fn with_arms(le: (f64, f64), re: (f64, f64), lw: (f64, f64), rw: (f64, f64)) -> Vec<Landmark> {
    let mut lms = torso();
    lms.push(Landmark::new(13, le.0, le.1, VIS));
    lms.push(Landmark::new(14, re.0, re.1, VIS));
    lms.push(Landmark::new(15, lw.0, lw.1, VIS));
    lms.push(Landmark::new(16, rw.0, rw.1, VIS));
    lms
}

pub fn t_pose() -> Vec<Landmark> {
    with_arms((0.28, 0.4), (0.72, 0.4), (0.16, 0.4), (0.84, 0.4))
}

pub fn y_pose() -> Vec<Landmark> {
    with_arms((0.325, 0.27), (0.675, 0.27), (0.25, 0.14), (0.75, 0.14))
}

pub fn arms_down() -> Vec<Landmark> {
    with_arms((0.39, 0.55), (0.61, 0.55), (0.38, 0.7), (0.62, 0.7))
}

pub fn l_pose() -> Vec<Landmark> {
    with_arms((0.28, 0.4), (0.61, 0.55), (0.16, 0.4), (0.62, 0.7))
}

pub fn frame_for(pose: PoseDefinition) -> Vec<Landmark> {
    match pose {
        PoseDefinition::TPose => t_pose(),
        PoseDefinition::YPose => y_pose(),
        PoseDefinition::ArmsDown => arms_down(),
        PoseDefinition::LPose => l_pose(),
    }
}

/// Nothing but the torso: no arm can be read, every pose scores zero.
pub fn torso_only() -> Vec<Landmark> {
    torso()
}

pub fn frame_json(landmarks: &[Landmark]) -> serde_json::Value {
    serde_json::json!({ "type": "landmarks", "landmarks": landmarks })
}

pub fn selectable_names() -> Vec<&'static str> {
    PoseDefinition::SELECTABLE.iter().map(|p| p.name()).collect()
}
