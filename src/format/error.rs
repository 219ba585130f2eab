//! Error types for annotation format operations.

use thiserror::Error;

/// Errors that can occur during annotation format operations.
#[derive(Error, Debug)]
pub enum FormatError {
    /// I/O error during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing or serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Task carries neither an `annotations` nor a `completions` key
    #[error("task {task_id}: cannot find annotation data")]
    MissingAnnotationKey {
        /// Identifier of the offending task (`"??"` when the tool assigned none)
        task_id: String,
    },

    /// Task has no video metadata to resolve a frame against
    #[error("unable to locate video information for task")]
    MissingVideoInfo,

    /// A relation edge references an ID that is not an unclaimed keypoint
    #[error("relation references unknown or already claimed keypoint '{id}'")]
    MissingKeypoint {
        /// The referenced annotation ID
        id: String,
    },

    /// Required field is missing or empty
    #[error("missing required field: {field}")]
    MissingField {
        /// Name of the missing field
        field: String,
    },

    /// Failure while parsing a single task, annotated with the task's identifier
    #[error("while parsing task {task_id}: {source}")]
    TaskParse {
        /// Identifier of the offending task (`"??"` when the tool assigned none)
        task_id: String,
        /// The underlying failure
        #[source]
        source: Box<FormatError>,
    },
}

impl FormatError {
    /// Create a missing field error.
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Wrap an error as a per-task parse failure.
    pub fn in_task(task_id: impl Into<String>, source: FormatError) -> Self {
        Self::TaskParse {
            task_id: task_id.into(),
            source: Box::new(source),
        }
    }
}
