//! Low-discrepancy base sequences for the Saltelli design.
//!
//! Sobol points come from the `sobol` crate with Joe–Kuo D6 direction
//! numbers in Gray-code order. A pseudo-random sequence with the same
//! interface covers designs wider than the parameter table.

use std::fmt;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use sobol::Sobol;
use sobol::params::JoeKuoD6;

use crate::error::SequenceError;

/// Widest Sobol sequence the standard Joe–Kuo D6 table supports.
pub const MAX_SOBOL_DIMENSION: usize = 21_201;

const TWO_32: f64 = 4_294_967_296.0;
const SCALE: f64 = 1.0 / TWO_32;

/// Source of points in the unit hypercube.
pub trait LowDiscrepancySequence {
    /// Number of coordinates in each point
    fn dimension(&self) -> usize;

    /// Advance the sequence and return the next point, each coordinate in [0, 1).
    fn next_point(&mut self) -> &[f64];

    /// Return to the initial state; the same points are produced again.
    fn reset(&mut self);

    /// Discard the next `n` points.
    fn skip(&mut self, n: usize);
}

/// Gray-code Sobol sequence, optionally randomized by a digital shift.
pub struct SobolSequence {
    params: JoeKuoD6,
    inner: Sobol<f64>,
    shift: Vec<u32>,
    point: Vec<f64>,
    index: u64,
}

impl fmt::Debug for SobolSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SobolSequence")
            .field("dimension", &self.shift.len())
            .field("shift", &self.shift)
            .field("index", &self.index)
            .finish()
    }
}

impl SobolSequence {
    /// Unshifted sequence starting at the origin.
    pub fn new(dimension: usize) -> Result<Self, SequenceError> {
        Self::with_shift(vec![0; dimension])
    }

    /// Sequence whose points are XOR-ed with one random word per dimension.
    ///
    /// The shift keeps the stratification of the sequence while making
    /// independent runs statistically independent.
    pub fn scrambled(dimension: usize, rng: &mut impl Rng) -> Result<Self, SequenceError> {
        let shift = (0..dimension).map(|_| rng.random::<u32>()).collect();
        Self::with_shift(shift)
    }

    fn with_shift(shift: Vec<u32>) -> Result<Self, SequenceError> {
        let dimension = shift.len();
        if dimension == 0 {
            return Err(SequenceError::ZeroDimension);
        }
        if dimension > MAX_SOBOL_DIMENSION {
            return Err(SequenceError::DimensionTooLarge {
                requested: dimension,
                max: MAX_SOBOL_DIMENSION,
            });
        }

        let params = JoeKuoD6::standard();
        let inner = Sobol::<f64>::new(dimension, &params);
        Ok(Self {
            params,
            inner,
            point: vec![0.0; dimension],
            shift,
            index: 0,
        })
    }

    /// Index of the point the next call to `next_point` returns
    pub fn position(&self) -> u64 {
        self.index
    }
}

impl LowDiscrepancySequence for SobolSequence {
    fn dimension(&self) -> usize {
        self.shift.len()
    }

    fn next_point(&mut self) -> &[f64] {
        // The sequence only ends past 2^64 points.
        let raw = self.inner.next().unwrap_or_default();
        for ((p, x), s) in self.point.iter_mut().zip(&raw).zip(&self.shift) {
            let bits = (x * TWO_32) as u32;
            *p = f64::from(bits ^ s) * SCALE;
        }
        self.index += 1;
        &self.point
    }

    fn reset(&mut self) {
        self.inner = Sobol::<f64>::new(self.shift.len(), &self.params);
        self.index = 0;
    }

    fn skip(&mut self, n: usize) {
        if n > 0 {
            self.inner.nth(n - 1);
            self.index += n as u64;
        }
    }
}

/// Pseudo-random points, used when a design is wider than the Sobol table.
#[derive(Debug, Clone)]
pub struct RandomSequence {
    rng: SmallRng,
    seed: u64,
    point: Vec<f64>,
}

impl RandomSequence {
    pub fn new(dimension: usize, seed: u64) -> Result<Self, SequenceError> {
        if dimension == 0 {
            return Err(SequenceError::ZeroDimension);
        }
        Ok(Self {
            rng: SmallRng::seed_from_u64(seed),
            seed,
            point: vec![0.0; dimension],
        })
    }
}

impl LowDiscrepancySequence for RandomSequence {
    fn dimension(&self) -> usize {
        self.point.len()
    }

    fn next_point(&mut self) -> &[f64] {
        for p in &mut self.point {
            *p = self.rng.random::<f64>();
        }
        &self.point
    }

    fn reset(&mut self) {
        self.rng = SmallRng::seed_from_u64(self.seed);
    }

    fn skip(&mut self, n: usize) {
        for _ in 0..n {
            self.next_point();
        }
    }
}
