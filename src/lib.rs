//! poselab - pose annotation labels with Label Studio interchange.
//!
//! The `model` module holds the in-memory label model: skeletons, per-frame
//! instances of keypoints, and the `Labels` collection tying them to video
//! frames. The `format` module converts between that model and external
//! annotation tools; Label Studio JSON is the format currently built in.

pub mod format;
pub mod model;

pub use format::{AnnotationFormat, FormatError, LabelStudioFormat};
pub use model::{Instance, LabeledFrame, Labels, Node, Point, Skeleton, Video};
