use crate::error::{Result, SensitivityError};
use crate::model::{ParamAssignment, ParamValue};
use crate::params::{ParamRegistry, ParameterSource};

use super::DesignMatrix;

/// Map design columns onto parameter values.
///
/// Column `i` of `design` is pushed through the `rand` of the parameter named
/// `names[i]`. Every other registry parameter is bound to its default as a
/// scalar the evaluator broadcasts. `names` must match the design's column
/// order exactly: a silent permutation would attribute variance to the wrong
/// parameter.
pub fn transform<P: ParameterSource, S: AsRef<str>>(
    design: &DesignMatrix,
    names: &[S],
    registry: &ParamRegistry<P>,
) -> Result<ParamAssignment> {
    let columns = design.names();
    let aligned = columns.len() == names.len()
        && columns.iter().zip(names).all(|(c, n)| c == n.as_ref());
    if !aligned {
        return Err(SensitivityError::invalid(format!(
            "design columns {:?} do not match parameter order {:?}",
            columns,
            names.iter().map(|n| n.as_ref()).collect::<Vec<&str>>()
        )));
    }

    tracing::info!(
        rows = design.rows(),
        variable = names.len(),
        "Transforming samples"
    );

    let mut assignment = ParamAssignment::new();
    for (name, column) in columns.iter().zip(design.matrix().columns()) {
        let param = registry.require(name)?;
        let values = column.iter().map(|&u| param.rand(u)).collect();
        assignment.insert(param.name(), ParamValue::Vector(values));
    }
    for param in registry.all() {
        if design.problem().index_of(param.name()).is_none() {
            assignment.insert(param.name(), ParamValue::Scalar(param.default_value()));
        }
    }
    Ok(assignment)
}
