//! Impact definitions and the model evaluation contract.

mod evaluator;
mod impact;

pub use evaluator::{
    CompiledModel, Evaluator, FnModel, ImpactFn, ImpactModel, ParamAssignment, ParamValue,
};
pub use impact::{ImpactDef, ImpactTable};
