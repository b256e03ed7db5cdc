use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use vizij_anim_graph_core::{
    AnimationGraphController, BranchState, Config, DiagnosticsCfg, GraphDefinition, GraphError,
    GraphPoseNodeResult, NodeValue, Skeleton, Target,
};
use vizij_test_fixtures::{anim_graphs, skeletons};

fn biped() -> Result<Skeleton> {
    skeletons::load("biped")
}

fn quiet() -> Config {
    Config {
        diagnostics: DiagnosticsCfg {
            log_warnings: false,
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Drive the locomotion graph through idle, walk, run and back.
fn scripted_run(
    definition: Arc<GraphDefinition>,
    skeleton: &Skeleton,
) -> Result<Vec<GraphPoseNodeResult>> {
    let mut c = AnimationGraphController::new(definition, skeleton, Config::default())?;
    let mut out = Vec::new();
    for frame in 0..120 {
        match frame {
            10 => c.set_bool("moving", true)?,
            40 => c.set_float("speed", 3.0)?,
            80 => c.set_float("speed", 0.0)?,
            100 => c.set_bool("moving", false)?,
            _ => {}
        }
        out.push(c.update(1.0 / 60.0));
    }
    Ok(out)
}

#[test]
fn fresh_controllers_produce_identical_output() -> Result<()> {
    let definition = Arc::new(anim_graphs::load::<GraphDefinition>("locomotion")?);
    let skeleton = biped()?;
    let a = scripted_run(definition.clone(), &skeleton)?;
    let b = scripted_run(definition, &skeleton)?;
    assert_eq!(serde_json::to_string(&a)?, serde_json::to_string(&b)?);
    Ok(())
}

#[test]
fn controllers_run_in_parallel() -> Result<()> {
    fn assert_send<T: Send>() {}
    assert_send::<AnimationGraphController>();

    let definition = Arc::new(anim_graphs::load::<GraphDefinition>("locomotion")?);
    let skeleton = biped()?;
    let expected = scripted_run(definition.clone(), &skeleton)?;

    let results = thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let definition = definition.clone();
                let skeleton = &skeleton;
                scope.spawn(move || scripted_run(definition, skeleton))
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("worker panicked"))
            .collect::<Result<Vec<_>>>()
    })?;
    for run in results {
        assert_eq!(run, expected);
    }
    Ok(())
}

#[test]
fn cyclic_definition_is_rejected() -> Result<()> {
    let definition = GraphDefinition::from_json(&anim_graphs::json("cyclic")?)?;
    let err = AnimationGraphController::new(Arc::new(definition), &biped()?, quiet())
        .expect_err("cycle must be rejected");
    assert_eq!(err, GraphError::Cycle);
    Ok(())
}

#[test]
fn malformed_json_is_a_parse_error() {
    let err = GraphDefinition::from_json("{ \"root_node\": 0 }").expect_err("nodes missing");
    assert!(matches!(err, GraphError::Parse(_)));
}

#[test]
fn soft_errors_warn_without_aborting() -> Result<()> {
    let definition: GraphDefinition = anim_graphs::load("look-at")?;
    let mut c = AnimationGraphController::new(Arc::new(definition), &biped()?, quiet())?;

    // Unknown bone mask id is reported while wiring.
    assert_eq!(c.warnings().len(), 1);
    assert_eq!(c.warnings()[0].node, 6);

    match c.evaluate_value(2, BranchState::Active)? {
        NodeValue::Target(Target::Bone { bone_id, offsets }) => {
            assert_eq!(bone_id, "head");
            let offsets = offsets.context("offsets applied")?;
            assert_eq!(offsets.translation, [0.0, 0.1, 0.0]);
        }
        other => panic!("expected bone target, got {other:?}"),
    }

    assert_eq!(c.evaluate_value(4, BranchState::Active)?, NodeValue::Target(Target::Unset));
    assert_eq!(c.evaluate_value(5, BranchState::Active)?, NodeValue::Bool(false));
    let result = c.update(0.1);
    assert_eq!(result.pose, vizij_anim_graph_core::PoseTask::ReferencePose);

    let warnings = c.take_warnings();
    assert_eq!(warnings.len(), 2);
    assert_eq!(warnings[1].node, 4);
    assert!(c.warnings().is_empty());
    Ok(())
}

#[test]
fn warning_retention_is_capped() -> Result<()> {
    let definition: GraphDefinition = anim_graphs::load("look-at")?;
    let config = Config {
        diagnostics: DiagnosticsCfg {
            max_retained: 1,
            log_warnings: false,
            ..Default::default()
        },
        ..Default::default()
    };
    let mut c = AnimationGraphController::new(Arc::new(definition), &biped()?, config)?;
    c.evaluate_value(4, BranchState::Active)?;
    c.evaluate_value(4, BranchState::Active)?;
    assert_eq!(c.warnings().len(), 1);
    assert_eq!(c.dropped_warnings(), 2);
    Ok(())
}

#[test]
fn every_fixture_graph_parses() -> Result<()> {
    for key in anim_graphs::keys() {
        GraphDefinition::from_json(&anim_graphs::json(&key)?)
            .with_context(|| format!("fixture {key}"))?;
    }
    Ok(())
}
