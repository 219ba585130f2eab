//! Tests for Label Studio task parsing and instance reconstruction.

use serde_json::json;

use crate::format::error::FormatError;
use crate::format::label_studio::{LsTask, parse_tasks, task_to_labeled_frame};
use crate::model::Skeleton;

fn task_from_json(value: serde_json::Value) -> LsTask {
    serde_json::from_value(value).expect("Failed to parse task fixture")
}

fn insect_skeleton() -> Skeleton {
    Skeleton::new(&["head", "tail"])
}

/// One individual ("r1") with two related keypoints on a 200x100 image.
fn example_task() -> LsTask {
    task_from_json(json!({
        "id": 1,
        "data": {},
        "meta": {
            "video": { "filename": "clip.mp4", "frame_idx": 3, "shape": [10, 100, 200, 3] }
        },
        "annotations": [{
            "result": [
                { "id": "r1", "type": "rectanglelabels",
                  "value": { "x": 0, "y": 0, "width": 200, "height": 100, "rotation": 0,
                             "rectanglelabels": ["instance_class"] },
                  "original_width": 200, "original_height": 100 },
                { "id": "k1", "type": "keypointlabels",
                  "value": { "x": 50.0, "y": 50.0, "keypointlabels": ["head"] },
                  "original_width": 200, "original_height": 100 },
                { "id": "k2", "type": "keypointlabels",
                  "value": { "x": 25.0, "y": 25.0, "keypointlabels": ["tail"] },
                  "original_width": 200, "original_height": 100 },
                { "type": "relation", "from_id": "k1", "to_id": "r1", "direction": "right" },
                { "type": "relation", "from_id": "k2", "to_id": "r1", "direction": "right" },
            ],
            "was_cancelled": false,
            "ground_truth": false
        }]
    }))
}

#[test]
fn test_percentage_coordinates_become_pixels() {
    let frame = task_to_labeled_frame(&example_task(), &insect_skeleton()).unwrap();

    assert_eq!(frame.video.filename, "clip.mp4");
    assert_eq!(frame.frame_idx, 3);
    assert_eq!(frame.instances.len(), 1);

    let instance = &frame.instances[0];
    assert_eq!(instance.len(), 2);

    let head = instance.point("head").unwrap();
    assert!((head.x - 100.0).abs() < 1e-9);
    assert!((head.y - 50.0).abs() < 1e-9);

    let tail = instance.point("tail").unwrap();
    assert!((tail.x - 50.0).abs() < 1e-9);
    assert!((tail.y - 25.0).abs() < 1e-9);
}

#[test]
fn test_grouped_points_have_unset_visibility() {
    let frame = task_to_labeled_frame(&example_task(), &insect_skeleton()).unwrap();

    for point in frame.instances[0].points.values() {
        assert_eq!(point.visible, None);
    }
}

#[test]
fn test_points_follow_skeleton_order() {
    // Relations list the tail keypoint first; the instance still reports
    // points in skeleton order.
    let task = task_from_json(json!({
        "meta": { "video": { "filename": "clip.mp4", "frame_idx": 0, "shape": null } },
        "annotations": [{
            "result": [
                { "id": "r1", "type": "rectanglelabels",
                  "value": { "x": 0, "y": 0, "width": 100, "height": 100 },
                  "original_width": 100, "original_height": 100 },
                { "id": "k2", "type": "keypointlabels",
                  "value": { "x": 20.0, "y": 20.0, "keypointlabels": ["tail"] },
                  "original_width": 100, "original_height": 100 },
                { "id": "k1", "type": "keypointlabels",
                  "value": { "x": 10.0, "y": 10.0, "keypointlabels": ["head"] },
                  "original_width": 100, "original_height": 100 },
                { "type": "relation", "from_id": "k2", "to_id": "r1" },
                { "type": "relation", "from_id": "k1", "to_id": "r1" },
            ]
        }]
    }));

    let frame = task_to_labeled_frame(&task, &insect_skeleton()).unwrap();
    let names: Vec<&String> = frame.instances[0].points.keys().collect();
    assert_eq!(names, vec!["head", "tail"]);
}

#[test]
fn test_nan_keypoints_are_dropped() {
    let task = task_from_json(json!({
        "id": 5,
        "meta": { "video": { "filename": "clip.mp4", "frame_idx": 0, "shape": [1, 100, 100, 3] } },
        "annotations": [{
            "result": [
                { "id": "r1", "type": "rectanglelabels",
                  "value": { "x": 0, "y": 0, "width": 100, "height": 100 },
                  "original_width": 100, "original_height": 100 },
                { "id": "k1", "type": "keypointlabels",
                  "value": { "x": 10.0, "y": 10.0, "keypointlabels": ["head"] },
                  "original_width": 100, "original_height": 100 },
                { "id": "k2", "type": "keypointlabels",
                  "value": { "x": null, "y": null, "keypointlabels": ["tail"] },
                  "original_width": 100, "original_height": 100 },
                { "type": "relation", "from_id": "k1", "to_id": "r1" },
                { "type": "relation", "from_id": "k2", "to_id": "r1" },
            ]
        }]
    }));

    let frame = task_to_labeled_frame(&task, &insect_skeleton()).unwrap();

    assert_eq!(frame.instances.len(), 1);
    let instance = &frame.instances[0];
    assert_eq!(instance.len(), 1);
    assert!(instance.point("head").is_some());
    assert!(instance.point("tail").is_none());
}

#[test]
fn test_instance_with_only_nan_keypoints_is_omitted() {
    let task = task_from_json(json!({
        "meta": { "video": { "filename": "clip.mp4", "frame_idx": 0, "shape": [1, 100, 100, 3] } },
        "annotations": [{
            "result": [
                { "id": "r1", "type": "rectanglelabels",
                  "value": { "x": 0, "y": 0, "width": 100, "height": 100 },
                  "original_width": 100, "original_height": 100 },
                { "id": "k1", "type": "keypointlabels",
                  "value": { "x": null, "y": null, "keypointlabels": ["head"] },
                  "original_width": 100, "original_height": 100 },
                { "type": "relation", "from_id": "k1", "to_id": "r1" },
            ]
        }]
    }));

    let frame = task_to_labeled_frame(&task, &insect_skeleton()).unwrap();
    assert!(frame.instances.is_empty());
}

#[test]
fn test_leftover_keypoints_form_one_visible_instance() {
    let task = task_from_json(json!({
        "meta": { "video": { "filename": "clip.mp4", "frame_idx": 0, "shape": [1, 100, 100, 3] } },
        "annotations": [{
            "result": [
                { "id": "r1", "type": "rectanglelabels",
                  "value": { "x": 0, "y": 0, "width": 100, "height": 100 },
                  "original_width": 100, "original_height": 100 },
                { "id": "k1", "type": "keypointlabels",
                  "value": { "x": 10.0, "y": 10.0, "keypointlabels": ["head"] },
                  "original_width": 100, "original_height": 100 },
                { "id": "k2", "type": "keypointlabels",
                  "value": { "x": 20.0, "y": 20.0, "keypointlabels": ["tail"] },
                  "original_width": 100, "original_height": 100 },
                { "type": "relation", "from_id": "k1", "to_id": "r1" },
            ]
        }]
    }));

    let frame = task_to_labeled_frame(&task, &insect_skeleton()).unwrap();

    assert_eq!(frame.instances.len(), 2);
    // The claimed keypoint keeps unset visibility, the leftover is explicit.
    assert_eq!(frame.instances[0].point("head").unwrap().visible, None);
    let leftover = &frame.instances[1];
    assert_eq!(leftover.len(), 1);
    assert_eq!(leftover.point("tail").unwrap().visible, Some(true));
}

#[test]
fn test_single_subject_task_without_rectangles() {
    let task = task_from_json(json!({
        "meta": { "video": { "filename": "clip.mp4", "frame_idx": 0, "shape": [1, 100, 100, 3] } },
        "annotations": [{
            "result": [
                { "id": "k1", "type": "keypointlabels",
                  "value": { "x": 10.0, "y": 10.0, "keypointlabels": ["head"] },
                  "original_width": 100, "original_height": 100 },
                { "id": "k2", "type": "keypointlabels",
                  "value": { "x": 20.0, "y": 20.0, "keypointlabels": ["tail"] },
                  "original_width": 100, "original_height": 100 },
            ]
        }]
    }));

    let frame = task_to_labeled_frame(&task, &insect_skeleton()).unwrap();

    assert_eq!(frame.instances.len(), 1);
    let instance = &frame.instances[0];
    assert_eq!(instance.len(), 2);
    assert!(instance.points.values().all(|p| p.visible == Some(true)));
}

#[test]
fn test_completions_key_is_accepted() {
    let task = task_from_json(json!({
        "meta": { "video": { "filename": "clip.mp4", "frame_idx": 0, "shape": [1, 100, 100, 3] } },
        "completions": [{
            "result": [
                { "id": "k1", "type": "keypointlabels",
                  "value": { "x": 10.0, "y": 10.0, "keypointlabels": ["head"] },
                  "original_width": 100, "original_height": 100 },
            ]
        }]
    }));

    let labels = parse_tasks(&[task], &insect_skeleton()).unwrap();
    assert_eq!(labels.len(), 1);
    assert_eq!(labels.labeled_frames[0].instances.len(), 1);
}

#[test]
fn test_multiple_annotation_sets_use_only_the_first() {
    let task = task_from_json(json!({
        "meta": { "video": { "filename": "clip.mp4", "frame_idx": 0, "shape": [1, 100, 100, 3] } },
        "annotations": [
            {
                "result": [
                    { "id": "k1", "type": "keypointlabels",
                      "value": { "x": 10.0, "y": 10.0, "keypointlabels": ["head"] },
                      "original_width": 100, "original_height": 100 },
                ]
            },
            {
                "result": [
                    { "id": "k2", "type": "keypointlabels",
                      "value": { "x": 20.0, "y": 20.0, "keypointlabels": ["tail"] },
                      "original_width": 100, "original_height": 100 },
                    { "id": "k3", "type": "keypointlabels",
                      "value": { "x": 30.0, "y": 30.0, "keypointlabels": ["head"] },
                      "original_width": 100, "original_height": 100 },
                ]
            }
        ]
    }));

    let frame = task_to_labeled_frame(&task, &insect_skeleton()).unwrap();

    assert_eq!(frame.instances.len(), 1);
    let instance = &frame.instances[0];
    assert_eq!(instance.len(), 1);
    assert!(instance.point("head").is_some());
    assert!(instance.point("tail").is_none());
}

#[test]
fn test_missing_annotation_key_fails_whole_collection() {
    let bare = task_from_json(json!({
        "id": 9,
        "meta": { "video": { "filename": "clip.mp4", "frame_idx": 0, "shape": null } }
    }));

    let result = parse_tasks(&[example_task(), bare], &insect_skeleton());

    match result {
        Err(FormatError::MissingAnnotationKey { task_id }) => assert_eq!(task_id, "9"),
        other => panic!("Expected MissingAnnotationKey, got {:?}", other),
    }
}

#[test]
fn test_missing_video_info_is_wrapped_with_task_id() {
    let task = task_from_json(json!({
        "id": 7,
        "annotations": [{ "result": [] }]
    }));

    let result = task_to_labeled_frame(&task, &insect_skeleton());

    match result {
        Err(FormatError::TaskParse { task_id, source }) => {
            assert_eq!(task_id, "7");
            assert!(matches!(*source, FormatError::MissingVideoInfo));
        }
        other => panic!("Expected TaskParse, got {:?}", other),
    }
}

#[test]
fn test_unknown_task_id_displays_as_question_marks() {
    let task = task_from_json(json!({
        "annotations": [{ "result": [] }]
    }));

    let result = task_to_labeled_frame(&task, &insect_skeleton());

    match result {
        Err(FormatError::TaskParse { task_id, .. }) => assert_eq!(task_id, "??"),
        other => panic!("Expected TaskParse, got {:?}", other),
    }
}

#[test]
fn test_relation_to_unknown_keypoint_fails_the_task() {
    let task = task_from_json(json!({
        "id": 3,
        "meta": { "video": { "filename": "clip.mp4", "frame_idx": 0, "shape": null } },
        "annotations": [{
            "result": [
                { "id": "r1", "type": "rectanglelabels",
                  "value": { "x": 0, "y": 0, "width": 100, "height": 100 },
                  "original_width": 100, "original_height": 100 },
                { "type": "relation", "from_id": "k9", "to_id": "r1" },
            ]
        }]
    }));

    let result = task_to_labeled_frame(&task, &insect_skeleton());

    match result {
        Err(FormatError::TaskParse { task_id, source }) => {
            assert_eq!(task_id, "3");
            match *source {
                FormatError::MissingKeypoint { ref id } => assert_eq!(id, "k9"),
                ref other => panic!("Expected MissingKeypoint, got {:?}", other),
            }
        }
        other => panic!("Expected TaskParse, got {:?}", other),
    }
}

#[test]
fn test_empty_annotation_set_list_fails_the_task() {
    let task = task_from_json(json!({
        "id": 4,
        "meta": { "video": { "filename": "clip.mp4", "frame_idx": 0, "shape": null } },
        "annotations": []
    }));

    let result = task_to_labeled_frame(&task, &insect_skeleton());
    assert!(matches!(result, Err(FormatError::TaskParse { .. })));
}

#[test]
fn test_frames_keep_input_order() {
    let mut tasks = Vec::new();
    for idx in 0..4 {
        tasks.push(task_from_json(json!({
            "id": idx,
            "meta": { "video": { "filename": "clip.mp4", "frame_idx": idx, "shape": null } },
            "annotations": [{ "result": [
                { "id": "k1", "type": "keypointlabels",
                  "value": { "x": 10.0, "y": 10.0, "keypointlabels": ["head"] },
                  "original_width": 100, "original_height": 100 },
            ] }]
        })));
    }

    let labels = parse_tasks(&tasks, &insect_skeleton()).unwrap();

    assert_eq!(labels.len(), 4);
    for (idx, frame) in labels.iter().enumerate() {
        assert_eq!(frame.frame_idx, idx as u64);
    }
}
