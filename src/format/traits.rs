//! Trait definitions for annotation format implementations.

use std::path::{Path, PathBuf};

use crate::format::error::FormatError;
use crate::model::{Labels, Skeleton};

/// Trait for annotation format import/export implementations.
///
/// Each external format implements this trait to provide bidirectional
/// conversion between the pose label model and the format's on-disk
/// representation.
pub trait AnnotationFormat: Send + Sync {
    /// Unique identifier for this format (e.g. "label_studio").
    fn id(&self) -> &'static str;

    /// Human-readable name for display.
    fn display_name(&self) -> &'static str;

    /// File extensions this format uses (e.g. `["json"]`).
    fn extensions(&self) -> &[&'static str];

    /// Import labels from the specified path.
    fn import(&self, path: &Path, options: &ImportOptions) -> Result<Labels, FormatError>;

    /// Export labels to the specified path.
    fn export(
        &self,
        labels: &Labels,
        path: &Path,
        options: &ExportOptions,
    ) -> Result<ExportResult, FormatError>;
}

/// Options for import operations.
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Skeleton the imported instances are expected to follow.
    pub skeleton: Skeleton,
}

impl ImportOptions {
    /// Create import options for the given skeleton.
    pub fn new(skeleton: Skeleton) -> Self {
        Self { skeleton }
    }
}

/// Options for export operations.
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    /// Whether to pretty-print the output file.
    pub pretty: bool,
}

impl ExportOptions {
    /// Create new export options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set pretty-printing.
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

/// Result of an export operation.
#[derive(Debug, Default)]
pub struct ExportResult {
    /// Number of frames exported.
    pub frames_exported: usize,

    /// Number of instances exported.
    pub instances_exported: usize,

    /// Warnings generated during export (e.g. assumed image bounds).
    pub warnings: Vec<FormatWarning>,

    /// Files created during export.
    pub files_created: Vec<PathBuf>,
}

impl ExportResult {
    /// Check if there were any warnings.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Warning generated during format conversion.
#[derive(Debug, Clone)]
pub struct FormatWarning {
    /// Human-readable warning message.
    pub message: String,

    /// Severity level of the warning.
    pub severity: WarningSeverity,
}

impl FormatWarning {
    /// Create a new warning.
    pub fn new(message: impl Into<String>, severity: WarningSeverity) -> Self {
        Self {
            message: message.into(),
            severity,
        }
    }

    /// Create an info-level warning.
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(message, WarningSeverity::Info)
    }

    /// Create a warning-level warning.
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(message, WarningSeverity::Warning)
    }
}

/// Severity level for format warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningSeverity {
    /// Informational message, not a problem.
    Info,
    /// Warning that something was assumed or discarded.
    Warning,
    /// Error that may affect data integrity.
    Error,
}
