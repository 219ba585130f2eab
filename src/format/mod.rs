//! Annotation format import/export system.
//!
//! This module provides a trait-based system for importing and exporting
//! pose labels in external annotation formats. Formats implement the
//! [`AnnotationFormat`] trait; Label Studio JSON is the one currently built
//! in.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use poselab::format::{AnnotationFormat, ImportOptions, LabelStudioFormat};
//! use poselab::model::Skeleton;
//!
//! let skeleton = Skeleton::new(&["head", "thorax", "tail"]);
//! let format = LabelStudioFormat;
//! let labels = format.import(path, &ImportOptions::new(skeleton))?;
//! ```

mod error;
mod label_studio;
mod traits;

#[cfg(test)]
mod tests;

pub use error::FormatError;
pub use label_studio::{
    LabelStudioFormat, LsAnnotationSet, LsKeypoint, LsKeypointValue, LsRectangle,
    LsRectangleValue, LsRelation, LsResult, LsTask, LsTaskMeta, LsVideoMeta, parse_tasks,
    read_labels, save_labels, task_to_labeled_frame, write_labels,
};
pub use traits::{
    AnnotationFormat, ExportOptions, ExportResult, FormatWarning, ImportOptions, WarningSeverity,
};
