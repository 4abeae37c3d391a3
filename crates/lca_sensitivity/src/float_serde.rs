//! Serde helpers that keep non-finite floats visible in JSON.
//!
//! `serde_json` writes NaN and infinities as `null`, which drops the sign of
//! an infinite relative change. Fields routed through these modules write
//! them as the strings `"inf"`, `"-inf"` and `"nan"` and read them back.
//! Matrices use the `{"rows", "cols", "data"}` layout with row-major data.

use ndarray::Array2;
use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

const INF: &str = "inf";
const NEG_INF: &str = "-inf";
const NAN: &str = "nan";

/// A float that serializes non-finite values as string markers.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Marked(f64);

impl Serialize for Marked {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let value = self.0;
        if value.is_finite() {
            serializer.serialize_f64(value)
        } else if value.is_nan() {
            serializer.serialize_str(NAN)
        } else if value > 0.0 {
            serializer.serialize_str(INF)
        } else {
            serializer.serialize_str(NEG_INF)
        }
    }
}

impl<'de> Deserialize<'de> for Marked {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(f64),
            Marker(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Number(value) => Ok(Marked(value)),
            Repr::Marker(marker) => match marker.as_str() {
                INF => Ok(Marked(f64::INFINITY)),
                NEG_INF => Ok(Marked(f64::NEG_INFINITY)),
                NAN => Ok(Marked(f64::NAN)),
                other => Err(de::Error::invalid_value(
                    de::Unexpected::Str(other),
                    &"a number, \"inf\", \"-inf\" or \"nan\"",
                )),
            },
        }
    }
}

#[derive(Serialize)]
struct MatrixRef {
    rows: usize,
    cols: usize,
    data: Vec<Marked>,
}

impl MatrixRef {
    fn new(matrix: &Array2<f64>) -> Self {
        Self {
            rows: matrix.nrows(),
            cols: matrix.ncols(),
            data: matrix.iter().copied().map(Marked).collect(),
        }
    }
}

#[derive(Deserialize)]
struct MatrixRepr {
    rows: usize,
    cols: usize,
    data: Vec<Marked>,
}

impl MatrixRepr {
    fn into_array<E: de::Error>(self) -> Result<Array2<f64>, E> {
        let data = self.data.into_iter().map(|m| m.0).collect();
        Array2::from_shape_vec((self.rows, self.cols), data).map_err(E::custom)
    }
}

/// For `f64` fields.
pub mod float {
    use super::*;

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        Marked(*value).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Marked::deserialize(deserializer).map(|m| m.0)
    }
}

/// For `Vec<f64>` fields.
pub mod vec {
    use super::*;

    pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(values.iter().copied().map(Marked))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        let marked = Vec::<Marked>::deserialize(deserializer)?;
        Ok(marked.into_iter().map(|m| m.0).collect())
    }
}

/// For `Array2<f64>` fields.
pub mod matrix {
    use super::*;

    pub fn serialize<S: Serializer>(matrix: &Array2<f64>, serializer: S) -> Result<S::Ok, S::Error> {
        MatrixRef::new(matrix).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Array2<f64>, D::Error> {
        MatrixRepr::deserialize(deserializer)?.into_array()
    }
}

/// For `Option<Array2<f64>>` fields.
pub mod option_matrix {
    use super::*;

    pub fn serialize<S: Serializer>(
        matrix: &Option<Array2<f64>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        matrix.as_ref().map(MatrixRef::new).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Array2<f64>>, D::Error> {
        Option::<MatrixRepr>::deserialize(deserializer)?
            .map(MatrixRepr::into_array)
            .transpose()
    }
}

/// For `Vec<Option<Array2<f64>>>` fields.
pub mod option_matrices {
    use super::*;

    pub fn serialize<S: Serializer>(
        matrices: &[Option<Array2<f64>>],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(matrices.iter().map(|m| m.as_ref().map(MatrixRef::new)))
    }
}
