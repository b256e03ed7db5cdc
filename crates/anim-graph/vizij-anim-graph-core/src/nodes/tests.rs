//! Behavioural coverage for node evaluation.

use std::sync::Arc;

use serde_json::{json, Value as JsonValue};

use super::float::range_ease;
use super::node_state::EaseState;
use crate::config::{BoneMaskBlendMode, Config};
use crate::context::BranchState;
use crate::controller::{AnimationGraphController, NodeValue};
use crate::diagnostics::DiagnosticsCfg;
use crate::error::GraphError;
use crate::pose::PoseTask;
use crate::skeleton::Skeleton;
use crate::task_list::BoneMaskTaskList;
use crate::types::{Easing, GraphDefinition};

fn skeleton() -> Skeleton {
    Skeleton::new(2)
        .with_mask("upper", vec![1.0, 0.0])
        .with_mask("lower", vec![0.0, 1.0])
}

fn quiet_config() -> Config {
    Config {
        diagnostics: DiagnosticsCfg {
            log_warnings: false,
            ..Default::default()
        },
        ..Default::default()
    }
}

fn definition(parameters: JsonValue, nodes: JsonValue) -> GraphDefinition {
    serde_json::from_value(json!({
        "root_node": 0,
        "control_parameters": parameters,
        "nodes": nodes,
    }))
    .expect("valid definition")
}

fn build_with(
    parameters: JsonValue,
    nodes: JsonValue,
    config: Config,
) -> Result<AnimationGraphController, GraphError> {
    AnimationGraphController::new(Arc::new(definition(parameters, nodes)), &skeleton(), config)
}

fn build(parameters: JsonValue, nodes: JsonValue) -> AnimationGraphController {
    build_with(parameters, nodes, quiet_config()).expect("graph should bind")
}

fn float_param(name: &str, value: f32) -> JsonValue {
    json!({ "name": name, "value": { "type": "float", "data": value } })
}

fn bool_param(name: &str, value: bool) -> JsonValue {
    json!({ "name": name, "value": { "type": "bool", "data": value } })
}

fn id_param(name: &str, value: &str) -> JsonValue {
    json!({ "name": name, "value": { "type": "id", "data": value } })
}

fn root() -> JsonValue {
    json!({ "pose": { "type": "reference_pose" } })
}

fn float_at(controller: &mut AnimationGraphController, index: i16, branch: BranchState) -> f32 {
    match controller.evaluate_value(index, branch) {
        Ok(NodeValue::Float(value)) => value,
        other => panic!("expected float, got {other:?}"),
    }
}

fn bool_at(controller: &mut AnimationGraphController, index: i16) -> bool {
    match controller.evaluate_value(index, BranchState::Active) {
        Ok(NodeValue::Bool(value)) => value,
        other => panic!("expected bool, got {other:?}"),
    }
}

fn mask_at(controller: &mut AnimationGraphController, index: i16, dt: f32) -> BoneMaskTaskList {
    match controller.evaluate_at(index, BranchState::Active, dt) {
        Ok(NodeValue::BoneMask(list)) => list,
        other => panic!("expected bone mask, got {other:?}"),
    }
}

fn resolve(list: &BoneMaskTaskList) -> Vec<f32> {
    list.resolve(&skeleton())
}

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-5
}

// --- Constants -----------------------------------------------------------

#[test]
fn constants_ignore_branch_state() {
    let mut c = build(
        json!([]),
        json!([
            root(),
            { "float": { "type": "constant", "value": 2.5 } },
            { "bool": { "type": "constant", "value": true } },
            { "vector": { "type": "constant", "value": [1.0, 2.0, 3.0, 4.0] } },
            { "id": { "type": "constant", "value": "walk" } },
        ]),
    );
    for branch in [BranchState::Active, BranchState::Inactive] {
        assert_eq!(c.evaluate_value(1, branch), Ok(NodeValue::Float(2.5)));
        assert_eq!(c.evaluate_value(2, branch), Ok(NodeValue::Bool(true)));
        assert_eq!(
            c.evaluate_value(3, branch),
            Ok(NodeValue::Vector([1.0, 2.0, 3.0, 4.0]))
        );
        assert_eq!(c.evaluate_value(4, branch), Ok(NodeValue::Id("walk".into())));
    }
}

#[test]
fn pose_nodes_are_not_values() {
    let mut c = build(json!([]), json!([root()]));
    assert_eq!(
        c.evaluate_value(0, BranchState::Active),
        Err(GraphError::NotAValueNode { index: 0 })
    );
    assert_eq!(
        c.evaluate_value(9, BranchState::Active),
        Err(GraphError::NotAValueNode { index: 9 })
    );
}

// --- Cached values -------------------------------------------------------

#[test]
fn on_exit_cache_freezes_while_inactive() {
    let mut c = build(
        json!([float_param("speed", 3.0)]),
        json!([
            root(),
            { "float": { "type": "control_parameter", "parameter": "speed" } },
            { "float": { "type": "cached", "input": 1, "mode": "on_exit" } },
        ]),
    );
    assert_eq!(float_at(&mut c, 2, BranchState::Active), 3.0);

    c.set_float("speed", 7.0).unwrap();
    assert_eq!(float_at(&mut c, 2, BranchState::Inactive), 3.0);

    c.set_float("speed", 9.0).unwrap();
    assert_eq!(float_at(&mut c, 2, BranchState::Active), 9.0);
}

#[test]
fn on_entry_cache_latches_first_read() {
    let mut c = build(
        json!([float_param("speed", 3.0)]),
        json!([
            root(),
            { "float": { "type": "control_parameter", "parameter": "speed" } },
            { "float": { "type": "cached", "input": 1, "mode": "on_entry" } },
        ]),
    );
    assert_eq!(float_at(&mut c, 2, BranchState::Active), 3.0);
    c.set_float("speed", 7.0).unwrap();
    assert_eq!(float_at(&mut c, 2, BranchState::Active), 3.0);
    assert_eq!(float_at(&mut c, 2, BranchState::Inactive), 3.0);
}

#[test]
fn inactive_cache_without_value_reads_through() {
    let mut c = build(
        json!([bool_param("flag", true)]),
        json!([
            root(),
            { "bool": { "type": "control_parameter", "parameter": "flag" } },
            { "bool": { "type": "cached", "input": 1 } },
        ]),
    );
    assert_eq!(
        c.evaluate_value(2, BranchState::Inactive),
        Ok(NodeValue::Bool(true))
    );
    c.set_bool("flag", false).unwrap();
    assert_eq!(
        c.evaluate_value(2, BranchState::Inactive),
        Ok(NodeValue::Bool(true))
    );
}

// --- Float operators -----------------------------------------------------

#[test]
fn math_handles_operands_and_flags() {
    let mut c = build(
        json!([]),
        json!([
            root(),
            { "float": { "type": "constant", "value": 6.0 } },
            { "float": { "type": "constant", "value": 4.0 } },
            { "float": { "type": "math", "input_a": 1, "input_b": 2, "operator": "sub" } },
            { "float": { "type": "math", "input_a": 1, "value_b": 0.0, "operator": "div" } },
            { "float": { "type": "math", "input_a": 2, "value_b": 6.0, "operator": "sub",
                         "return_absolute": true, "return_negated": true } },
            { "float": { "type": "math", "input_a": 1, "value_b": 4.0, "operator": "mod" } },
        ]),
    );
    assert_eq!(float_at(&mut c, 3, BranchState::Active), 2.0);
    assert_eq!(float_at(&mut c, 4, BranchState::Active), 0.0);
    assert_eq!(float_at(&mut c, 5, BranchState::Active), -2.0);
    assert_eq!(float_at(&mut c, 6, BranchState::Active), 2.0);
}

#[test]
fn fractional_parts_follow_floor() {
    let mut c = build(
        json!([]),
        json!([
            root(),
            { "float": { "type": "constant", "value": -1.25 } },
            { "float": { "type": "math", "input_a": 1, "operator": "fractional_part" } },
            { "float": { "type": "math", "input_a": 1, "operator": "inverse_fractional_part" } },
            { "float": { "type": "math", "input_a": 1, "operator": "integer_part" } },
        ]),
    );
    assert_eq!(float_at(&mut c, 2, BranchState::Active), 0.75);
    assert_eq!(float_at(&mut c, 3, BranchState::Active), 0.25);
    assert_eq!(float_at(&mut c, 4, BranchState::Active), -2.0);
}

#[test]
fn clamp_and_remap() {
    let mut c = build(
        json!([float_param("x", 5.0)]),
        json!([
            root(),
            { "float": { "type": "control_parameter", "parameter": "x" } },
            { "float": { "type": "clamp", "input": 1, "min": 0.0, "max": 2.0 } },
            { "float": { "type": "remap",
                         "input": 1, "input_range": [0.0, 10.0], "output_range": [0.0, 100.0] } },
            { "float": { "type": "remap",
                         "input": 1, "input_range": [1.0, 1.0], "output_range": [3.0, 4.0] } },
        ]),
    );
    assert_eq!(float_at(&mut c, 2, BranchState::Active), 2.0);
    assert_eq!(float_at(&mut c, 3, BranchState::Active), 50.0);
    assert_eq!(float_at(&mut c, 4, BranchState::Active), 3.0);

    c.set_float("x", 20.0).unwrap();
    assert_eq!(float_at(&mut c, 3, BranchState::Active), 200.0);
}

#[test]
fn angle_math_wraps_degrees() {
    let mut c = build(
        json!([float_param("angle", 270.0)]),
        json!([
            root(),
            { "float": { "type": "control_parameter", "parameter": "angle" } },
            { "float": { "type": "angle_math", "input": 1, "operation": "clamp_to180" } },
            { "float": { "type": "angle_math", "input": 1, "operation": "clamp_to360" } },
            { "float": { "type": "angle_math", "input": 1, "operation": "flip_hemisphere" } },
        ]),
    );
    assert_eq!(float_at(&mut c, 2, BranchState::Active), -90.0);
    assert_eq!(float_at(&mut c, 3, BranchState::Active), 270.0);
    assert_eq!(float_at(&mut c, 4, BranchState::Active), 90.0);

    c.set_float("angle", -90.0).unwrap();
    assert_eq!(float_at(&mut c, 3, BranchState::Active), 270.0);
}

#[test]
fn switch_and_selector_pick_values() {
    let mut c = build(
        json!([bool_param("a", false), bool_param("b", true)]),
        json!([
            root(),
            { "bool": { "type": "control_parameter", "parameter": "a" } },
            { "bool": { "type": "control_parameter", "parameter": "b" } },
            { "float": { "type": "constant", "value": 1.0 } },
            { "float": { "type": "constant", "value": 2.0 } },
            { "float": { "type": "switch", "switch": 1, "if_true": 3, "if_false": 4 } },
            { "float": { "type": "selector",
                         "conditions": [1, 2], "values": [10.0, 20.0], "default_value": -1.0 } },
        ]),
    );
    assert_eq!(float_at(&mut c, 5, BranchState::Active), 2.0);
    assert_eq!(float_at(&mut c, 6, BranchState::Active), 20.0);

    c.set_bool("a", true).unwrap();
    assert_eq!(float_at(&mut c, 5, BranchState::Active), 1.0);
    assert_eq!(float_at(&mut c, 6, BranchState::Active), 10.0);

    c.set_bool("a", false).unwrap();
    c.set_bool("b", false).unwrap();
    assert_eq!(float_at(&mut c, 6, BranchState::Active), -1.0);
}

#[test]
fn id_to_float_and_vector_info() {
    let mut c = build(
        json!([id_param("gait", "run")]),
        json!([
            root(),
            { "id": { "type": "control_parameter", "parameter": "gait" } },
            { "float": { "type": "id_to_float",
                         "input": 1, "ids": ["walk", "run"], "values": [1.0, 3.0],
                         "default_value": 0.5 } },
            { "vector": { "type": "constant", "value": [3.0, 0.0, 4.0, 9.0] } },
            { "float": { "type": "vector_info", "input": 3, "component": "length" } },
            { "float": { "type": "vector_info", "input": 3, "component": "w" } },
        ]),
    );
    assert_eq!(float_at(&mut c, 2, BranchState::Active), 3.0);
    c.set_id("gait", "crawl").unwrap();
    assert_eq!(float_at(&mut c, 2, BranchState::Active), 0.5);
    assert_eq!(float_at(&mut c, 4, BranchState::Active), 5.0);
    assert_eq!(float_at(&mut c, 5, BranchState::Active), 9.0);
}

#[test]
fn ease_moves_towards_target_over_time() {
    let mut state = EaseState::settled(0.0);
    assert_eq!(range_ease(&mut state, 0.5, 1.0, 1.0, Easing::Linear), 0.5);
    assert_eq!(range_ease(&mut state, 0.5, 1.0, 1.0, Easing::Linear), 1.0);

    let mut state = EaseState::settled(0.0);
    assert_eq!(range_ease(&mut state, 0.5, 1.0, 1.0, Easing::InQuad), 0.25);

    // Retargeting restarts from the current value.
    assert_eq!(range_ease(&mut state, 0.5, 0.0, 1.0, Easing::Linear), 0.125);

    // Within snap distance the target is taken immediately.
    assert_eq!(range_ease(&mut state, 0.0, 0.13, 1.0, Easing::Linear), 0.13);
}

#[test]
fn ease_node_advances_with_delta() {
    let mut c = build(
        json!([float_param("x", 0.0)]),
        json!([
            root(),
            { "float": { "type": "control_parameter", "parameter": "x" } },
            { "float": { "type": "ease", "input": 1, "ease_time": 1.0, "easing": "linear" } },
        ]),
    );
    c.set_float("x", 2.0).unwrap();
    let halfway = match c.evaluate_at(2, BranchState::Active, 0.5) {
        Ok(NodeValue::Float(v)) => v,
        other => panic!("expected float, got {other:?}"),
    };
    assert!(approx(halfway, 1.0));
    assert_eq!(float_at(&mut c, 2, BranchState::Active), 1.0);
}

// --- Bool operators ------------------------------------------------------

#[test]
fn logic_and_comparisons() {
    let mut c = build(
        json!([float_param("x", 0.5), id_param("gait", "walk")]),
        json!([
            root(),
            { "float": { "type": "control_parameter", "parameter": "x" } },
            { "bool": { "type": "float_comparison",
                        "input": 1, "comparison_value": 0.25, "comparison": "greater_than" } },
            { "bool": { "type": "float_range_comparison",
                        "input": 1, "range": [0.0, 0.5], "inclusive": false } },
            { "bool": { "type": "not", "input": 3 } },
            { "bool": { "type": "and", "conditions": [2, 4] } },
            { "bool": { "type": "or", "conditions": [3] } },
            { "id": { "type": "control_parameter", "parameter": "gait" } },
            { "bool": { "type": "id_comparison",
                        "input": 7, "ids": ["walk", "run"], "comparison": "doesnt_match" } },
            { "bool": { "type": "float_comparison",
                        "input": 1, "comparison_value": 0.55, "comparison": "near_equal",
                        "epsilon": 0.1 } },
        ]),
    );
    assert!(bool_at(&mut c, 2));
    assert!(!bool_at(&mut c, 3));
    assert!(bool_at(&mut c, 4));
    assert!(bool_at(&mut c, 5));
    assert!(!bool_at(&mut c, 6));
    assert!(!bool_at(&mut c, 8));
    assert!(bool_at(&mut c, 9));

    c.set_id("gait", "swim").unwrap();
    assert!(bool_at(&mut c, 8));
}

#[test]
fn is_target_set_reads_target() {
    let mut c = build(
        json!([{ "name": "look", "value": { "type": "target", "data": { "type": "unset" } } }]),
        json!([
            root(),
            { "target": { "type": "control_parameter", "parameter": "look" } },
            { "bool": { "type": "is_target_set", "input": 1 } },
        ]),
    );
    assert!(!bool_at(&mut c, 2));
    c.set_target(
        "look",
        crate::target::Target::Bone {
            bone_id: "head".into(),
            offsets: None,
        },
    )
    .unwrap();
    assert!(bool_at(&mut c, 2));
}

// --- Targets -------------------------------------------------------------

#[test]
fn offset_on_non_bone_target_warns_and_passes_through() {
    let mut c = build(
        json!([]),
        json!([
            root(),
            { "target": { "type": "constant", "value": { "type": "unset" } } },
            { "target": { "type": "offset", "input": 1, "translation_offset": [0.0, 1.0, 0.0] } },
        ]),
    );
    assert_eq!(
        c.evaluate_value(2, BranchState::Active),
        Ok(NodeValue::Target(crate::target::Target::Unset))
    );
    let warnings = c.take_warnings();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].node, 2);
    assert!(warnings[0].message.contains("target is not set"));
}

#[test]
fn offset_on_bone_target_is_applied() {
    let mut c = build(
        json!([]),
        json!([
            root(),
            { "target": { "type": "constant", "value": { "type": "bone", "bone_id": "head" } } },
            { "target": { "type": "offset", "input": 1, "translation_offset": [0.0, 1.0, 0.0] } },
        ]),
    );
    match c.evaluate_value(2, BranchState::Active) {
        Ok(NodeValue::Target(crate::target::Target::Bone { bone_id, offsets })) => {
            assert_eq!(bone_id, "head");
            assert_eq!(offsets.map(|o| o.translation), Some([0.0, 1.0, 0.0]));
        }
        other => panic!("expected bone target, got {other:?}"),
    }
    assert!(c.warnings().is_empty());
}

// --- Bone masks ----------------------------------------------------------

fn mask_graph(config: Config) -> AnimationGraphController {
    build_with(
        json!([
            float_param("w", 0.0),
            id_param("layer", "none"),
            bool_param("flip", false),
        ]),
        json!([
            root(),
            { "bone_mask": { "type": "mask", "bone_mask_id": "upper" } },
            { "bone_mask": { "type": "mask", "bone_mask_id": "lower" } },
            { "float": { "type": "control_parameter", "parameter": "w" } },
            { "bone_mask": { "type": "blend", "source": 1, "target": 2, "blend_weight": 3 } },
            { "id": { "type": "control_parameter", "parameter": "layer" } },
            { "bone_mask": { "type": "selector", "parameter": 5, "masks": [1, 2],
                             "parameter_values": ["upper", "lower"], "blend_time_seconds": 1.0 } },
            { "bool": { "type": "control_parameter", "parameter": "flip" } },
            { "bone_mask": { "type": "switch", "switch": 7, "if_true": 1, "if_false": 2 } },
        ]),
        config,
    )
    .expect("mask graph should bind")
}

#[test]
fn blend_endpoints_return_inputs_exactly() {
    let mut c = mask_graph(quiet_config());
    let upper = mask_at(&mut c, 1, 0.0);
    let lower = mask_at(&mut c, 2, 0.0);

    assert_eq!(mask_at(&mut c, 4, 0.0), upper);
    c.set_float("w", 1.0).unwrap();
    assert_eq!(mask_at(&mut c, 4, 0.0), lower);
}

#[test]
fn partial_blend_follows_config_mode() {
    let mut pass = mask_graph(quiet_config());
    pass.set_float("w", 0.5).unwrap();
    assert_eq!(resolve(&mask_at(&mut pass, 4, 0.0)), vec![1.0, 0.0]);

    let mut blend = mask_graph(Config {
        bone_mask_blend: BoneMaskBlendMode::Blend,
        ..quiet_config()
    });
    blend.set_float("w", 0.5).unwrap();
    assert_eq!(resolve(&mask_at(&mut blend, 4, 0.0)), vec![0.5, 0.5]);
}

#[test]
fn selector_blends_over_blend_time() {
    let mut c = mask_graph(quiet_config());
    // No option matches "none", so the identity default applies.
    assert_eq!(resolve(&mask_at(&mut c, 6, 0.0)), vec![1.0, 1.0]);

    c.set_id("layer", "upper").unwrap();
    let mid = mask_at(&mut c, 6, 0.25);
    let status = c.bone_mask_selector_status(6).expect("selector status");
    assert!(status.blending);
    assert_eq!(status.blend_target, Some(0));
    assert!(approx(status.blend_weight, 0.25));
    let weights = resolve(&mid);
    assert!(approx(weights[0], 1.0));
    assert!(approx(weights[1], 0.75));

    let done = mask_at(&mut c, 6, 0.75);
    let status = c.bone_mask_selector_status(6).expect("selector status");
    assert!(!status.blending);
    assert_eq!(status.selected_option, Some(0));
    assert_eq!(done, mask_at(&mut c, 1, 0.0));
}

#[test]
fn switch_flips_between_lists_without_blending() {
    let mut c = mask_graph(quiet_config());
    let upper = mask_at(&mut c, 1, 0.0);
    let lower = mask_at(&mut c, 2, 0.0);
    assert_eq!(mask_at(&mut c, 8, 0.0), lower);

    c.set_bool("flip", true).unwrap();
    let flipped = mask_at(&mut c, 8, 0.25);
    assert_eq!(flipped, upper);
    assert_eq!(resolve(&flipped), vec![1.0, 0.0]);

    c.set_bool("flip", false).unwrap();
    let back = mask_at(&mut c, 8, 0.25);
    assert_eq!(back, lower);
    assert_eq!(resolve(&back), vec![0.0, 1.0]);
}

#[test]
fn unknown_mask_id_warns_and_weighs_zero() {
    let mut c = build(
        json!([]),
        json!([
            root(),
            { "bone_mask": { "type": "mask", "bone_mask_id": "tail" } },
        ]),
    );
    assert_eq!(c.warnings().len(), 1);
    assert!(c.warnings()[0].message.contains("tail"));
    assert_eq!(resolve(&mask_at(&mut c, 1, 0.0)), vec![0.0, 0.0]);
}

// --- Clips ---------------------------------------------------------------

#[test]
fn looping_clip_wraps_and_counts_loops() {
    let mut c = build(
        json!([]),
        json!([{ "pose": { "type": "clip", "data_slot": 3, "duration": 2.0 } }]),
    );
    let first = c.update(1.5);
    assert_eq!(first.current_time, 0.75);
    assert_eq!(
        first.pose,
        PoseTask::SampleClip {
            data_slot: 3,
            time: 0.75
        }
    );

    let second = c.update(1.0);
    assert_eq!(second.previous_time, 0.75);
    assert_eq!(second.current_time, 0.25);
    assert_eq!(second.duration, 2.0);
}

#[test]
fn clip_plays_in_reverse_and_clamps_when_not_looping() {
    let mut c = build(
        json!([bool_param("reverse", false)]),
        json!([
            { "pose": { "type": "clip",
                        "data_slot": 0, "duration": 1.0, "looping": false, "play_in_reverse": 1 } },
            { "bool": { "type": "control_parameter", "parameter": "reverse" } },
        ]),
    );
    assert_eq!(c.update(0.5).current_time, 0.5);
    assert_eq!(c.update(2.0).current_time, 1.0);
    c.set_bool("reverse", true).unwrap();
    assert_eq!(c.update(0.25).current_time, 0.75);
}

// --- State machines ------------------------------------------------------

fn two_state_machine() -> AnimationGraphController {
    build(
        json!([bool_param("go", false)]),
        json!([
            { "pose": { "type": "state_machine", "default_state": 0, "states": [
                { "state": 1, "transitions": [
                    { "condition": 5, "transition": 4, "target_state": 1 }
                ] },
                { "state": 2 }
            ] } },
            { "pose": { "type": "state", "child": 3 } },
            { "pose": { "type": "state", "child": 6 } },
            { "pose": { "type": "clip", "data_slot": 0, "duration": 1.0 } },
            { "pose": { "type": "transition", "target_state": 2, "duration": 0.5 } },
            { "bool": { "type": "control_parameter", "parameter": "go" } },
            { "pose": { "type": "clip", "data_slot": 1, "duration": 1.0 } },
        ]),
    )
}

#[test]
fn state_machine_starts_in_default_state() {
    let mut c = two_state_machine();
    let status = c.state_machine_status(0).expect("machine status");
    assert_eq!(status.active_state_index, 0);
    assert_eq!(status.active_transition, None);

    let result = c.update(0.25);
    assert!(matches!(result.pose, PoseTask::SampleClip { data_slot: 0, .. }));
}

#[test]
fn transition_blends_then_commits() {
    let mut c = two_state_machine();
    c.update(0.25);
    c.set_bool("go", true).unwrap();
    c.update(0.25);

    let status = c.state_machine_status(0).expect("machine status");
    assert_eq!(status.active_state_index, 1);
    assert_eq!(status.active_transition, Some(4));
    assert_eq!(status.transition_progress, Some(0.0));

    match c.update(0.25).pose {
        PoseTask::Blend {
            source,
            target,
            weight,
            bone_mask,
        } => {
            assert_eq!(weight, 0.5);
            assert!(bone_mask.is_none());
            assert!(matches!(*source, PoseTask::SampleClip { data_slot: 0, .. }));
            assert_eq!(
                *target,
                PoseTask::SampleClip {
                    data_slot: 1,
                    time: 0.25
                }
            );
        }
        other => panic!("expected blend, got {other:?}"),
    }

    c.update(0.25);
    assert_eq!(
        c.state_machine_status(0).and_then(|s| s.transition_progress),
        Some(1.0)
    );

    let committed = c.update(0.25);
    assert!(matches!(committed.pose, PoseTask::SampleClip { data_slot: 1, .. }));
    let status = c.state_machine_status(0).expect("machine status");
    assert_eq!(status.active_state_index, 1);
    assert_eq!(status.active_transition, None);
}

fn clip_time(pose: &PoseTask) -> (u16, f32) {
    match pose {
        PoseTask::SampleClip { data_slot, time } => (*data_slot, *time),
        other => panic!("expected clip sample, got {other:?}"),
    }
}

#[test]
fn forced_return_updates_shared_state_once_per_tick() {
    let mut c = build(
        json!([bool_param("go", false)]),
        json!([
            { "pose": { "type": "state_machine", "default_state": 0, "states": [
                { "state": 1, "transitions": [
                    { "condition": 5, "transition": 4, "target_state": 1 }
                ] },
                { "state": 2, "transitions": [
                    { "condition": 7, "transition": 8, "target_state": 0, "can_be_forced": true }
                ] }
            ] } },
            { "pose": { "type": "state", "child": 3 } },
            { "pose": { "type": "state", "child": 6 } },
            { "pose": { "type": "clip", "data_slot": 0, "duration": 1.0 } },
            { "pose": { "type": "transition", "target_state": 2, "duration": 1.0 } },
            { "bool": { "type": "control_parameter", "parameter": "go" } },
            { "pose": { "type": "clip", "data_slot": 1, "duration": 1.0 } },
            { "bool": { "type": "not", "input": 5 } },
            { "pose": { "type": "transition", "target_state": 1, "duration": 1.0 } },
        ]),
    );
    c.update(0.1);
    c.set_bool("go", true).unwrap();
    c.update(0.1);
    c.update(0.1);
    c.set_bool("go", false).unwrap();
    c.update(0.1);

    let status = c.state_machine_status(0).expect("machine status");
    assert_eq!(status.active_state_index, 0);
    assert_eq!(status.active_transition, Some(8));

    // State 1 is the new target and also the source of the interrupted
    // transition; its clip restarted and must advance by a single tick.
    let result = c.update(0.1);
    assert!(approx(result.current_time, 0.1));
    match result.pose {
        PoseTask::Blend {
            source,
            target,
            weight,
            ..
        } => {
            assert!(approx(weight, 0.1));
            let (slot, time) = clip_time(&target);
            assert_eq!(slot, 0);
            assert!(approx(time, 0.1));
            match *source {
                PoseTask::Blend {
                    source: inner_source,
                    target: inner_target,
                    weight: inner_weight,
                    ..
                } => {
                    assert!(approx(inner_weight, 0.3));
                    let (slot, time) = clip_time(&inner_source);
                    assert_eq!(slot, 0);
                    assert!(approx(time, 0.1));
                    let (slot, time) = clip_time(&inner_target);
                    assert_eq!(slot, 1);
                    assert!(approx(time, 0.3));
                }
                other => panic!("expected interrupted blend, got {other:?}"),
            }
        }
        other => panic!("expected blend, got {other:?}"),
    }
}

#[test]
fn state_machine_status_is_none_for_other_nodes() {
    let c = two_state_machine();
    assert!(c.state_machine_status(3).is_none());
    assert!(c.state_machine_status(-1).is_none());
    assert!(c.bone_mask_selector_status(0).is_none());
}

// --- Construction errors -------------------------------------------------

#[test]
fn wiring_errors_are_reported() {
    let err = build_with(
        json!([]),
        json!([root(), { "float": { "type": "clamp", "input": 7, "min": 0.0, "max": 1.0 } }]),
        quiet_config(),
    )
    .unwrap_err();
    assert_eq!(
        err,
        GraphError::IndexOutOfRange {
            node: 1,
            index: 7,
            len: 2
        }
    );

    let err = build_with(
        json!([]),
        json!([root(), { "bool": { "type": "not", "input": 0 } }]),
        quiet_config(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        GraphError::KindMismatch {
            node: 1,
            expected: "bool",
            found: "pose",
            ..
        }
    ));

    let err = build_with(
        json!([float_param("x", 0.0)]),
        json!([root(), { "bool": { "type": "control_parameter", "parameter": "x" } }]),
        quiet_config(),
    )
    .unwrap_err();
    assert!(matches!(err, GraphError::ParameterKindMismatch { .. }));

    let err = build_with(
        json!([]),
        json!([root(), { "float": { "type": "control_parameter", "parameter": "missing" } }]),
        quiet_config(),
    )
    .unwrap_err();
    assert_eq!(
        err,
        GraphError::UnboundParameter {
            node: 1,
            name: "missing".into()
        }
    );
}

#[test]
fn selector_counts_must_match() {
    let err = build_with(
        json!([]),
        json!([
            root(),
            { "bool": { "type": "constant", "value": true } },
            { "float": { "type": "selector", "conditions": [1], "values": [1.0, 2.0] } },
        ]),
        quiet_config(),
    )
    .unwrap_err();
    assert!(matches!(err, GraphError::CountMismatch { node: 2, left: 1, right: 2, .. }));
}

#[test]
fn state_machine_structure_is_validated() {
    let err = build_with(
        json!([]),
        json!([{ "pose": { "type": "state_machine", "default_state": 0, "states": [] } }]),
        quiet_config(),
    )
    .unwrap_err();
    assert_eq!(err, GraphError::EmptyStateMachine { node: 0 });

    let err = build_with(
        json!([]),
        json!([
            { "pose": { "type": "state_machine", "default_state": 2, "states": [{ "state": 1 }] } },
            { "pose": { "type": "state" } },
        ]),
        quiet_config(),
    )
    .unwrap_err();
    assert_eq!(
        err,
        GraphError::InvalidDefaultState {
            node: 0,
            index: 2,
            count: 1
        }
    );
}

#[test]
fn cycles_and_bad_roots_are_rejected() {
    let err = build_with(
        json!([]),
        json!([
            root(),
            { "float": { "type": "clamp", "input": 2, "min": 0.0, "max": 1.0 } },
            { "float": { "type": "clamp", "input": 1, "min": 0.0, "max": 1.0 } },
        ]),
        quiet_config(),
    )
    .unwrap_err();
    assert_eq!(err, GraphError::Cycle);

    let err = build_with(
        json!([]),
        json!([{ "float": { "type": "constant", "value": 1.0 } }]),
        quiet_config(),
    )
    .unwrap_err();
    assert_eq!(err, GraphError::InvalidRoot { index: 0 });

    let err = build_with(json!([]), json!([]), quiet_config()).unwrap_err();
    assert_eq!(err, GraphError::EmptyGraph);
}

#[test]
fn host_parameter_errors_leave_values_untouched() {
    let mut c = build(
        json!([float_param("x", 1.0)]),
        json!([root(), { "float": { "type": "control_parameter", "parameter": "x" } }]),
    );
    assert!(matches!(
        c.set_bool("x", true),
        Err(GraphError::ParameterKindMismatch { .. })
    ));
    assert_eq!(
        c.set_float("y", 2.0),
        Err(GraphError::UnknownParameter("y".into()))
    );
    assert_eq!(float_at(&mut c, 1, BranchState::Active), 1.0);

    let handle = c.parameter_handle("x").expect("declared parameter");
    c.set_parameter_by_handle(handle, crate::parameters::ParameterValue::Float(4.0))
        .unwrap();
    assert_eq!(float_at(&mut c, 1, BranchState::Active), 4.0);
}
