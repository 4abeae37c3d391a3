use rustc_hash::FxHashMap;

use super::{ParamDef, ParameterSource};
use crate::error::{Result, SensitivityError};

/// Read-only collection of parameters, built once and passed explicitly.
///
/// Insertion order is the canonical order of every parameter list the
/// registry hands out.
#[derive(Debug, Clone)]
pub struct ParamRegistry<P = ParamDef> {
    params: Vec<P>,
    index: FxHashMap<String, usize>,
}

impl<P: ParameterSource> ParamRegistry<P> {
    /// Build a registry, validating every definition.
    ///
    /// Fails on duplicate names or on the first invalid definition.
    pub fn from_params(params: impl IntoIterator<Item = P>) -> Result<Self> {
        let params: Vec<P> = params.into_iter().collect();
        let mut index = FxHashMap::default();
        for (i, param) in params.iter().enumerate() {
            param.validate()?;
            if index.insert(param.name().to_string(), i).is_some() {
                return Err(SensitivityError::invalid(format!(
                    "parameter `{}` is defined twice",
                    param.name()
                )));
            }
        }
        Ok(Self { params, index })
    }

    pub fn get(&self, name: &str) -> Option<&P> {
        self.index.get(name).map(|&i| &self.params[i])
    }

    /// Lookup that fails with `UnknownParameter`
    pub fn require(&self, name: &str) -> Result<&P> {
        self.get(name)
            .ok_or_else(|| SensitivityError::UnknownParameter(name.to_string()))
    }

    pub fn all(&self) -> &[P] {
        &self.params
    }

    pub fn names(&self) -> Vec<&str> {
        self.params.iter().map(ParameterSource::name).collect()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Parameters that vary during sampling
    pub fn variable(&self) -> Vec<&P> {
        self.params.iter().filter(|p| p.is_variable()).collect()
    }

    /// Parameters pinned at their default
    pub fn fixed(&self) -> Vec<&P> {
        self.params.iter().filter(|p| !p.is_variable()).collect()
    }

    /// Variable parameters restricted to `names`, in registry order
    pub fn variable_among<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<&P>> {
        let mut selected = vec![false; self.params.len()];
        for name in names {
            let name = name.as_ref();
            let idx = self
                .index
                .get(name)
                .ok_or_else(|| SensitivityError::UnknownParameter(name.to_string()))?;
            selected[*idx] = true;
        }
        Ok(self
            .params
            .iter()
            .zip(selected)
            .filter(|(p, keep)| *keep && p.is_variable())
            .map(|(p, _)| p)
            .collect())
    }
}
