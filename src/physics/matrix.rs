use rand::Rng;
use rand::rngs::SmallRng;

use crate::error::SimulationError;

/// Row-major table of attraction coefficients.
///
/// Entry `(i, j)` is the coefficient a particle of color `i` uses when
/// reacting to a neighbor of color `j`. It is not symmetric in general.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    data: Vec<f64>,
    size: usize,
}

impl Matrix {
    /// Creates a zeroed `size x size` matrix, reporting allocation failure.
    pub fn new(size: usize) -> Result<Self, SimulationError> {
        let len = size
            .checked_mul(size)
            .ok_or(SimulationError::InvalidSettings("too many colors"))?;
        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(SimulationError::allocation("matrix"))?;
        data.resize(len, 0.0);
        Ok(Self { data, size })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.size + j]
    }

    pub fn set(&mut self, i: usize, j: usize, value: f64) {
        self.data[i * self.size + j] = value;
    }

    /// Fills every entry with an independent uniform draw from `[-1, 1]`.
    pub fn randomize(&mut self, rng: &mut SmallRng) {
        self.data.iter_mut().for_each(|val| {
            *val = rng.gen_range(-1.0..=1.0);
        });
    }
}

/// Strategy for filling the attraction matrix at initialization.
pub trait MatrixGenerator: Send + Sync {
    fn generate(&self, size: usize, rng: &mut SmallRng) -> Result<Matrix, SimulationError>;
}

pub struct RandomMatrixGenerator;

impl MatrixGenerator for RandomMatrixGenerator {
    fn generate(&self, size: usize, rng: &mut SmallRng) -> Result<Matrix, SimulationError> {
        let mut matrix = Matrix::new(size)?;
        matrix.randomize(rng);
        Ok(matrix)
    }
}

/// No inter-particle attraction; only the universal short-range repulsion remains.
pub struct ZeroMatrixGenerator;

impl MatrixGenerator for ZeroMatrixGenerator {
    fn generate(&self, size: usize, _rng: &mut SmallRng) -> Result<Matrix, SimulationError> {
        Matrix::new(size)
    }
}
