pub mod detector;
pub mod landmark;
pub mod scorer;
pub mod smoother;

pub use landmark::{Landmark, LandmarkFrame};
pub use scorer::PoseDefinition;
pub use smoother::LandmarkSmoother;
