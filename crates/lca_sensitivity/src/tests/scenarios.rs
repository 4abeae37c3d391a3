//! Reference scenarios with known answers
//!
//! These tests verify:
//! - A one-parameter design has the documented shape and bounded indices
//! - The OAT relative change of `y = x` over `[1, 5]` is 133.33 %
//! - A constant model yields zero indices and zero relative variance

use super::{assert_close, impacts, init_test_logging};
use crate::analysis::{
    OatConfig, OatSweeper, SobolConfig, StochasticDashboard, analyze, decompose,
};
use crate::error::EstimationFailure;
use crate::model::{Evaluator, FnModel, ImpactModel};
use crate::params::{ParamDef, ParamRegistry};
use crate::sampling::{Problem, sample, transform};

/// One parameter, two impacts, n = 4
///
/// Four base points are too few for the estimators to land inside `[0, 1]`
/// in general. The `[-0.05, 1.05]` bound below holds for this unscrambled
/// design only, whose points are fixed; a scrambled or differently sized
/// design may fall outside it.
#[test]
fn test_single_parameter_two_impacts() {
    init_test_logging();

    let registry = ParamRegistry::from_params(vec![ParamDef::linear("x", 3.0, 1.0, 5.0)]).unwrap();
    let impacts = impacts(&["linear", "square"]);
    let model = FnModel::new(["x"])
        .with_impact("linear", |p| 2.0 * p[0] + 1.0)
        .with_impact("square", |p| p[0] * p[0]);
    let config = SobolConfig {
        base_count: 4,
        scramble: false,
        num_resamples: 0,
        ..Default::default()
    };

    let problem = Problem::new(["x"]).unwrap();
    let design = sample(&problem, &config).unwrap();
    assert_eq!(design.rows(), 4 * (2 + 2));
    assert_eq!(design.matrix().ncols(), 1);

    let assignment = transform(&design, &["x"], &registry).unwrap();
    let outputs = Evaluator::RawModel(&model)
        .evaluate(&assignment, &impacts)
        .unwrap();
    let indices = analyze(&problem, &outputs, &config).unwrap();

    assert_eq!(indices.s1().dim(), (1, 2));
    assert_eq!(indices.st().dim(), (1, 2));
    for value in indices.s1().iter().chain(indices.st()) {
        assert!((-0.05..=1.05).contains(value), "index {value} out of bounds");
    }
    assert!(indices.diagnostics().is_empty());
}

/// `range(5) = [1, 2, 3, 4, 5]` and `y = x`
#[test]
fn test_oat_identity_model() {
    init_test_logging();

    let registry = ParamRegistry::from_params(vec![ParamDef::linear("x", 3.0, 1.0, 5.0)]).unwrap();
    let impacts = impacts(&["y"]);
    let compiled = FnModel::new(["x"])
        .with_impact("y", |p| p[0])
        .compile(&impacts)
        .unwrap();
    let sweeper = OatSweeper::new(&registry, &compiled, &impacts, OatConfig { steps: 5 });

    let sweep = sweeper.sweep("x").unwrap();
    assert_eq!(sweep.values(), &[1.0, 2.0, 3.0, 4.0, 5.0]);
    assert_close(sweep.relative_change()[0], 400.0 / 3.0, 1e-9, "relative change");

    let matrix = sweeper.oat_matrix().unwrap();
    assert_close(matrix.get("x", "y").unwrap(), 133.333_333, 1e-5, "matrix entry");
}

/// Output independent of every parameter
#[test]
fn test_constant_model() {
    init_test_logging();

    let registry = ParamRegistry::from_params(vec![
        ParamDef::linear("a", 1.0, 0.0, 2.0),
        ParamDef::triangle("b", 1.0, 0.5, 3.0),
    ])
    .unwrap();
    let impacts = impacts(&["flat"]);
    let model = FnModel::new(["a", "b"]).with_impact("flat", |_| 42.0);
    let config = SobolConfig {
        base_count: 16,
        seed: Some(3),
        ..Default::default()
    };

    let dashboard =
        StochasticDashboard::new(&registry, Evaluator::RawModel(&model), &impacts, &config)
            .unwrap();
    let indices = dashboard.indices();
    assert!(indices.s1().iter().all(|&v| v == 0.0));
    assert!(indices.st().iter().all(|&v| v == 0.0));
    assert!(matches!(
        indices.failure(0),
        Some(EstimationFailure::ZeroVariance { .. })
    ));

    let variations = decompose(dashboard.run().outputs(), indices.names(), indices.s1()).unwrap();
    assert_eq!(variations.relative_variance_pct(), &[0.0]);
    assert_eq!(variations.residual(), &[0.0]);
}
