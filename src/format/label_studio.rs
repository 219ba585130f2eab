//! Label Studio JSON format implementation.
//!
//! Nomenclature used by the external tool:
//! - a *task* maps to a single frame of data to be annotated, the closest
//!   correspondence is to a [`LabeledFrame`],
//! - an *annotation* set is a flat list of result items: rectangles mark
//!   individuals, keypoints mark single body parts, and relations attach
//!   keypoints to the individual that owns them.
//!
//! Reading reassembles that flattened hierarchy into instances via the
//! relation graph; writing flattens it back out.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::format::error::FormatError;
use crate::format::traits::{
    AnnotationFormat, ExportOptions, ExportResult, FormatWarning, ImportOptions,
};
use crate::model::{Instance, LabeledFrame, Labels, Point, Skeleton, Video};

/// Image size assumed for videos whose shape is unknown.
const FALLBACK_IMAGE_SIZE: (u64, u64) = (100, 100);

/// Placeholder class label for exported individuals.
const INSTANCE_CLASS_LABEL: &str = "instance_class";

/// Fixed direction tag on exported relations; the tool requires one but the
/// reader treats every edge as undirected.
const RELATION_DIRECTION: &str = "right";

// ---------------------------------------------------------------------------
// External schema
// ---------------------------------------------------------------------------

/// One Label Studio task record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LsTask {
    /// Task identifier assigned by the tool; used in diagnostics only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    /// Task payload; unused by this crate and written back as an empty object.
    #[serde(default = "empty_object")]
    pub data: serde_json::Value,

    /// Task metadata, carrying the video reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<LsTaskMeta>,

    /// Annotation sets under the current tool's key name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Vec<LsAnnotationSet>>,

    /// Annotation sets under the key name used by older tool versions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completions: Option<Vec<LsAnnotationSet>>,
}

impl LsTask {
    /// Task identifier for diagnostics, `"??"` when the tool assigned none.
    fn id_for_display(&self) -> String {
        self.id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "??".to_string())
    }

    /// The task's annotation sets, preferring `annotations` over `completions`.
    fn annotation_sets(&self) -> Option<&[LsAnnotationSet]> {
        self.annotations.as_deref().or(self.completions.as_deref())
    }
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

/// Task metadata block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LsTaskMeta {
    /// Video reference for the task's frame.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<LsVideoMeta>,
}

/// Video reference recorded on a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LsVideoMeta {
    /// Path or name of the video file.
    pub filename: String,
    /// Index of the frame within the video.
    pub frame_idx: u64,
    /// Video shape as (frames, height, width, channels), when known.
    #[serde(default)]
    pub shape: Option<(u64, u64, u64, u64)>,
}

/// One annotation set: a flat list of result items plus review metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LsAnnotationSet {
    /// Result items in this set.
    pub result: Vec<LsResult>,
    /// Whether the annotator cancelled the task.
    #[serde(default)]
    pub was_cancelled: bool,
    /// Whether this set is marked as ground truth.
    #[serde(default)]
    pub ground_truth: bool,
    /// Creation timestamp (ISO 8601).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Last update timestamp (ISO 8601).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    /// Annotation lead time in seconds.
    #[serde(default)]
    pub lead_time: f64,
    /// Result count reported by the tool.
    #[serde(default)]
    pub result_count: u32,
}

/// One entry of a task's flattened result list, discriminated by `type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LsResult {
    /// A rectangle marking one individual (instance).
    #[serde(rename = "rectanglelabels")]
    Rectangle(LsRectangle),

    /// A single keypoint.
    #[serde(rename = "keypointlabels")]
    Keypoint(LsKeypoint),

    /// An edge linking a keypoint result to an individual result.
    #[serde(rename = "relation")]
    Relation(LsRelation),

    /// Any other result type the tool may emit; ignored by the reader.
    #[serde(other)]
    Other,
}

impl LsResult {
    /// Annotation ID of this item, for the item kinds that carry one.
    pub fn id(&self) -> Option<&str> {
        match self {
            LsResult::Rectangle(rect) => Some(&rect.id),
            LsResult::Keypoint(kpt) => Some(&kpt.id),
            LsResult::Relation(_) | LsResult::Other => None,
        }
    }

    /// Kind discriminant used when filtering by type.
    pub(crate) fn kind(&self) -> LsResultKind {
        match self {
            LsResult::Rectangle(_) => LsResultKind::Rectangle,
            LsResult::Keypoint(_) => LsResultKind::Keypoint,
            LsResult::Relation(_) => LsResultKind::Relation,
            LsResult::Other => LsResultKind::Other,
        }
    }

    /// Inner keypoint item, when this is a keypoint result.
    pub fn as_keypoint(&self) -> Option<&LsKeypoint> {
        match self {
            LsResult::Keypoint(kpt) => Some(kpt),
            _ => None,
        }
    }

    /// Inner rectangle item, when this is a rectangle result.
    pub fn as_rectangle(&self) -> Option<&LsRectangle> {
        match self {
            LsResult::Rectangle(rect) => Some(rect),
            _ => None,
        }
    }
}

/// Result item kinds, mirroring the `type` tags of [`LsResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LsResultKind {
    Rectangle,
    Keypoint,
    Relation,
    Other,
}

/// A `rectanglelabels` result item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LsRectangle {
    /// Annotation ID, unique within the task.
    pub id: String,
    /// Rectangle geometry and labels.
    pub value: LsRectangleValue,
    /// Width of the annotated image in pixels.
    #[serde(default)]
    pub original_width: u64,
    /// Height of the annotated image in pixels.
    #[serde(default)]
    pub original_height: u64,
    /// Image rotation applied by the tool.
    #[serde(default)]
    pub image_rotation: f64,
    /// Name of the labeling control that produced this item.
    #[serde(default)]
    pub from_name: String,
    /// Name of the object the item is attached to.
    #[serde(default)]
    pub to_name: String,
}

/// Geometry payload of a rectangle result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LsRectangleValue {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Rectangle width.
    pub width: f64,
    /// Rectangle height.
    pub height: f64,
    /// Rotation in degrees.
    #[serde(default)]
    pub rotation: f64,
    /// Class labels attached to the rectangle.
    #[serde(default)]
    pub rectanglelabels: Vec<String>,
}

/// A `keypointlabels` result item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LsKeypoint {
    /// Annotation ID, unique within the task.
    pub id: String,
    /// Keypoint position and labels.
    pub value: LsKeypointValue,
    /// Width of the annotated image in pixels; required to reconstruct
    /// absolute coordinates from the percentage position.
    pub original_width: u64,
    /// Height of the annotated image in pixels.
    pub original_height: u64,
    /// Image rotation applied by the tool.
    #[serde(default)]
    pub image_rotation: f64,
    /// Name of the labeling control that produced this item.
    #[serde(default)]
    pub from_name: String,
    /// Name of the object the item is attached to.
    #[serde(default)]
    pub to_name: String,
}

/// Position payload of a keypoint result.
///
/// Coordinates are percentages of the original image size. A keypoint the
/// annotator never placed has NaN coordinates; strict JSON has no NaN
/// literal, so `null` stands in on the wire in both directions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LsKeypointValue {
    /// X position as a percentage of `original_width`.
    #[serde(with = "nan_as_null")]
    pub x: f64,
    /// Y position as a percentage of `original_height`.
    #[serde(with = "nan_as_null")]
    pub y: f64,
    /// Node labels; the first one names the skeleton node.
    pub keypointlabels: Vec<String>,
}

/// A `relation` result item: a one-way edge between two annotation IDs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LsRelation {
    /// Source annotation ID.
    pub from_id: String,
    /// Target annotation ID.
    pub to_id: String,
    /// Directional tag required by the tool's schema; ignored on read.
    #[serde(default)]
    pub direction: String,
}

mod nan_as_null {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_nan() {
            serializer.serialize_none()
        } else {
            serializer.serialize_f64(*value)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
    }
}

// ---------------------------------------------------------------------------
// Read direction
// ---------------------------------------------------------------------------

/// Read Label Studio annotations from a JSON file.
pub fn read_labels(path: &Path, skeleton: &Skeleton) -> Result<Labels, FormatError> {
    let json = std::fs::read_to_string(path)?;
    let tasks: Vec<LsTask> = serde_json::from_str(&json)?;
    parse_tasks(&tasks, skeleton)
}

/// Convert task records into a [`Labels`] collection, in input order.
///
/// A task carrying neither `annotations` nor `completions` fails the whole
/// conversion with [`FormatError::MissingAnnotationKey`]; there is no
/// best-effort mode.
pub fn parse_tasks(tasks: &[LsTask], skeleton: &Skeleton) -> Result<Labels, FormatError> {
    let mut frames = Vec::with_capacity(tasks.len());
    for task in tasks {
        if task.annotation_sets().is_none() {
            return Err(FormatError::MissingAnnotationKey {
                task_id: task.id_for_display(),
            });
        }
        frames.push(task_to_labeled_frame(task, skeleton)?);
    }
    Ok(Labels::new(frames))
}

/// Parse one task record into a labeled frame.
///
/// Any failure is wrapped as [`FormatError::TaskParse`] carrying the task's
/// identifier and the underlying error.
pub fn task_to_labeled_frame(
    task: &LsTask,
    skeleton: &Skeleton,
) -> Result<LabeledFrame, FormatError> {
    parse_task(task, skeleton).map_err(|source| FormatError::in_task(task.id_for_display(), source))
}

fn parse_task(task: &LsTask, skeleton: &Skeleton) -> Result<LabeledFrame, FormatError> {
    let sets = task
        .annotation_sets()
        .ok_or_else(|| FormatError::MissingAnnotationKey {
            task_id: task.id_for_display(),
        })?;

    if sets.len() > 1 {
        log::warn!(
            "Task {}: multiple annotation sets found, only taking the first",
            task.id_for_display()
        );
    }

    // Only the first annotation set is parsed.
    let results = &sets
        .first()
        .ok_or_else(|| FormatError::missing_field("annotations[0]"))?
        .result;

    let individuals = filter_and_index(results, LsResultKind::Rectangle);
    let keypoints = filter_and_index(results, LsResultKind::Keypoint);
    let relations = build_relation_map(results);

    // IDs consumed by an individual; tracked separately so the keypoint
    // index itself stays immutable.
    let mut claimed: HashSet<&str> = HashSet::new();
    let mut instances = Vec::new();

    // Multi-subject case: each rectangle claims the keypoints related to it.
    for (&indv_id, _) in &individuals {
        let mut points: IndexMap<String, Point> = IndexMap::new();
        let neighbors = relations
            .get(indv_id)
            .map(|ids| ids.as_slice())
            .unwrap_or(&[]);

        for &rel_id in neighbors {
            let kpt = keypoints
                .get(rel_id)
                .filter(|_| !claimed.contains(rel_id))
                .and_then(|item| item.as_keypoint())
                .ok_or_else(|| FormatError::MissingKeypoint {
                    id: rel_id.to_string(),
                })?;
            claimed.insert(rel_id);

            let node = node_name(kpt)?;
            let point = keypoint_to_pixels(kpt);
            // NaN coordinates mean the keypoint was never placed; its ID
            // stays claimed so it cannot resurface as a leftover.
            if point.is_nan() {
                continue;
            }
            points.insert(node.to_string(), point);
        }

        if !points.is_empty() {
            instances.push(Instance::new(points, skeleton));
        }
    }

    // Keypoints no rectangle claimed form one more instance. This covers
    // single-subject tasks (no rectangles at all) as well as ungrouped
    // keypoints in multi-subject tasks; these were positively placed by the
    // annotator, so they carry an explicit visibility flag.
    let mut leftovers: IndexMap<String, Point> = IndexMap::new();
    for (&kpt_id, item) in &keypoints {
        if claimed.contains(kpt_id) {
            continue;
        }
        if let Some(kpt) = item.as_keypoint() {
            let node = node_name(kpt)?;
            let point = keypoint_to_pixels(kpt).with_visible(true);
            if point.is_nan() {
                continue;
            }
            leftovers.insert(node.to_string(), point);
        }
    }
    if !leftovers.is_empty() {
        instances.push(Instance::new(leftovers, skeleton));
    }

    let (video, frame_idx) = video_from_task(task)?;
    Ok(LabeledFrame::new(video, frame_idx, instances))
}

/// Filter result items by kind and index them by annotation ID.
///
/// Later duplicates of an ID overwrite earlier values while keeping the
/// first-encounter position; this mirrors the source format's last-write-wins
/// quirk and is not corrected. Items of the requested kind that carry no ID
/// cannot be indexed and are skipped.
pub(crate) fn filter_and_index<'a>(
    results: &'a [LsResult],
    kind: LsResultKind,
) -> IndexMap<&'a str, &'a LsResult> {
    let mut indexed = IndexMap::new();
    for item in results.iter().filter(|r| r.kind() == kind) {
        if let Some(id) = item.id() {
            indexed.insert(id, item);
        }
    }
    indexed
}

/// Build a symmetric adjacency map from the `relation` items.
///
/// The source format stores one-way `from_id` -> `to_id` edges; each edge is
/// recorded here in both directions. IDs that appear in no relation are
/// absent from the map, so callers must treat a lookup miss as "no edges",
/// not an error.
pub(crate) fn build_relation_map<'a>(results: &'a [LsResult]) -> HashMap<&'a str, Vec<&'a str>> {
    let mut relmap: HashMap<&str, Vec<&str>> = HashMap::new();
    for item in results {
        if let LsResult::Relation(rel) = item {
            relmap
                .entry(rel.from_id.as_str())
                .or_default()
                .push(rel.to_id.as_str());
            relmap
                .entry(rel.to_id.as_str())
                .or_default()
                .push(rel.from_id.as_str());
        }
    }
    relmap
}

/// Resolve the video reference and frame index recorded on a task.
pub(crate) fn video_from_task(task: &LsTask) -> Result<(Video, u64), FormatError> {
    let meta = task
        .meta
        .as_ref()
        .and_then(|m| m.video.as_ref())
        .ok_or(FormatError::MissingVideoInfo)?;

    let mut video = Video::new(&meta.filename);
    video.shape = meta.shape;
    Ok((video, meta.frame_idx))
}

/// Convert a keypoint's percentage coordinates to absolute pixels using the
/// item's own recorded image dimensions.
fn keypoint_to_pixels(kpt: &LsKeypoint) -> Point {
    Point::new(
        kpt.value.x * kpt.original_width as f64 / 100.0,
        kpt.value.y * kpt.original_height as f64 / 100.0,
    )
}

/// The skeleton node a keypoint is labeled with.
fn node_name(kpt: &LsKeypoint) -> Result<&str, FormatError> {
    kpt.value
        .keypointlabels
        .first()
        .map(String::as_str)
        .ok_or_else(|| FormatError::missing_field("keypointlabels"))
}

// ---------------------------------------------------------------------------
// Write direction
// ---------------------------------------------------------------------------

/// Convert a [`Labels`] collection into Label Studio task records, one task
/// per frame, in frame order.
pub fn write_labels(labels: &Labels) -> Vec<LsTask> {
    write_tasks(labels).0
}

/// Write a [`Labels`] collection to a Label Studio JSON file.
pub fn save_labels(labels: &Labels, path: &Path) -> Result<(), FormatError> {
    LabelStudioFormat
        .export(labels, path, &ExportOptions::new().pretty(true))
        .map(|_| ())
}

pub(crate) fn write_tasks(labels: &Labels) -> (Vec<LsTask>, Vec<FormatWarning>) {
    let mut warnings = Vec::new();
    let mut tasks = Vec::with_capacity(labels.len());

    for frame in labels.iter() {
        let (height, width) = match (frame.video.height(), frame.video.width()) {
            (Some(height), Some(width)) => (height, width),
            _ => {
                let message = format!(
                    "video '{}' has no known shape, assuming {}x{} image bounds",
                    frame.video.filename, FALLBACK_IMAGE_SIZE.0, FALLBACK_IMAGE_SIZE.1
                );
                log::warn!("{}", message);
                warnings.push(FormatWarning::warning(message));
                FALLBACK_IMAGE_SIZE
            }
        };

        let mut results = Vec::new();
        for instance in &frame.instances {
            let inst_id = Uuid::new_v4().to_string();
            results.push(LsResult::Rectangle(LsRectangle {
                id: inst_id.clone(),
                value: LsRectangleValue {
                    x: 0.0,
                    y: 0.0,
                    width: width as f64,
                    height: height as f64,
                    rotation: 0.0,
                    // TODO: carry real instance identity once the model
                    // distinguishes instance classes
                    rectanglelabels: vec![INSTANCE_CLASS_LABEL.to_string()],
                },
                original_width: width,
                original_height: height,
                image_rotation: 0.0,
                from_name: "individuals".to_string(),
                to_name: "image".to_string(),
            }));

            for (node, point) in &instance.points {
                let point_id = Uuid::new_v4().to_string();
                results.push(LsResult::Keypoint(LsKeypoint {
                    id: point_id.clone(),
                    value: LsKeypointValue {
                        x: point.x / width as f64 * 100.0,
                        y: point.y / height as f64 * 100.0,
                        keypointlabels: vec![node.clone()],
                    },
                    original_width: width,
                    original_height: height,
                    image_rotation: 0.0,
                    from_name: "keypoint-label".to_string(),
                    to_name: "image".to_string(),
                }));

                results.push(LsResult::Relation(LsRelation {
                    from_id: point_id,
                    to_id: inst_id.clone(),
                    direction: RELATION_DIRECTION.to_string(),
                }));
            }
        }

        let now = timestamp();
        tasks.push(LsTask {
            id: None,
            data: empty_object(),
            meta: Some(LsTaskMeta {
                video: Some(LsVideoMeta {
                    filename: frame.video.filename.clone(),
                    frame_idx: frame.frame_idx,
                    shape: frame.video.shape,
                }),
            }),
            annotations: Some(vec![LsAnnotationSet {
                result: results,
                was_cancelled: false,
                ground_truth: false,
                created_at: Some(now.clone()),
                updated_at: Some(now),
                lead_time: 0.0,
                result_count: 1,
            }]),
            completions: None,
        });
    }

    (tasks, warnings)
}

/// Current UTC time in the tool's timestamp format: ISO 8601 with
/// microsecond precision and a `Z` suffix.
fn timestamp() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.6fZ")
        .to_string()
}

// ---------------------------------------------------------------------------
// Format trait implementation
// ---------------------------------------------------------------------------

/// Label Studio JSON format.
pub struct LabelStudioFormat;

impl AnnotationFormat for LabelStudioFormat {
    fn id(&self) -> &'static str {
        "label_studio"
    }

    fn display_name(&self) -> &'static str {
        "Label Studio (JSON)"
    }

    fn extensions(&self) -> &[&'static str] {
        &["json"]
    }

    fn import(&self, path: &Path, options: &ImportOptions) -> Result<Labels, FormatError> {
        log::info!("Importing Label Studio annotations from {:?}", path);

        let labels = read_labels(path, &options.skeleton)?;

        log::info!(
            "Imported {} frames with {} instances",
            labels.len(),
            labels.total_instances()
        );

        Ok(labels)
    }

    fn export(
        &self,
        labels: &Labels,
        path: &Path,
        options: &ExportOptions,
    ) -> Result<ExportResult, FormatError> {
        log::info!("Exporting Label Studio annotations to {:?}", path);

        let (tasks, warnings) = write_tasks(labels);
        let json = if options.pretty {
            serde_json::to_string_pretty(&tasks)?
        } else {
            serde_json::to_string(&tasks)?
        };
        std::fs::write(path, json)?;

        let result = ExportResult {
            frames_exported: labels.len(),
            instances_exported: labels.total_instances(),
            warnings,
            files_created: vec![path.to_path_buf()],
        };

        log::info!(
            "Exported {} frames with {} instances ({} warnings)",
            result.frames_exported,
            result.instances_exported,
            result.warnings.len()
        );

        Ok(result)
    }
}
