//! Data models for pose labels.

mod instance;
mod labels;
mod skeleton;

pub use instance::{Instance, Point};
pub use labels::{LabeledFrame, Labels, Video};
pub use skeleton::{Node, Skeleton};
