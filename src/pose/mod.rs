pub mod estimator;
pub mod keypoint;

pub use estimator::{PoseEstimator, TimingInfo};
pub use keypoint::{BodyPart, Keypoint, PoseResult};
