//! Lifecycle of a single particle field.
//!
//! A [`Simulation`] starts uninitialized. `init` allocates and draws a field,
//! after which frames can be advanced and positions read. Re-initializing
//! drops the previous field before the new one is allocated, and a failed
//! `init` leaves the simulation uninitialized.

use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info, trace};

use crate::error::SimulationError;
use crate::physics::matrix::{MatrixGenerator, RandomMatrixGenerator};
use crate::physics::{FieldPhysics, PhysicsSettings, PositionSnapshot};

/// Seed derived from the wall clock, for callers that supply none.
pub fn time_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

pub struct Simulation {
    settings: PhysicsSettings,
    matrix_generator: Box<dyn MatrixGenerator>,
    state: Option<FieldPhysics>,
    particle_count: usize,
    seed: u64,
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulation {
    /// Uninitialized simulation using the reference parameters.
    pub fn new() -> Self {
        Self::with_settings(PhysicsSettings::default())
    }

    pub fn with_settings(settings: PhysicsSettings) -> Self {
        Self {
            settings,
            matrix_generator: Box::new(RandomMatrixGenerator),
            state: None,
            particle_count: 0,
            seed: 0,
        }
    }

    /// Replaces the strategy used to fill the attraction matrix on the next `init`.
    pub fn with_matrix_generator(mut self, matrix_generator: Box<dyn MatrixGenerator>) -> Self {
        self.matrix_generator = matrix_generator;
        self
    }

    /// Allocates a fresh field of `particle_count` particles.
    ///
    /// Without a seed one is taken from the clock; [`get_seed`](Self::get_seed)
    /// reports whichever was used. A negative count is rejected before anything
    /// is touched. Any other failure leaves the simulation uninitialized, with
    /// the seed and count of the last successful run still reported.
    pub fn init(&mut self, particle_count: i64, seed: Option<u64>) -> Result<(), SimulationError> {
        let count = usize::try_from(particle_count)
            .map_err(|_| SimulationError::InvalidParticleCount(particle_count))?;

        // release the previous field before allocating the next one
        self.state = None;
        let seed = seed.unwrap_or_else(time_seed);

        let physics = FieldPhysics::new(
            count,
            self.settings.clone(),
            seed,
            self.matrix_generator.as_ref(),
        )?;
        info!(
            "initialized {} particles with seed {} on a {}x{} grid",
            count,
            seed,
            physics.grid().grid_size(),
            physics.grid().grid_size()
        );
        self.seed = seed;
        self.particle_count = count;
        self.state = Some(physics);
        Ok(())
    }

    /// Replays the current run from its first frame.
    pub fn restart(&mut self) -> Result<(), SimulationError> {
        if self.state.is_none() {
            return Err(SimulationError::NotInitialized);
        }
        debug!("restarting with seed {}", self.seed);
        self.init(self.particle_count as i64, Some(self.seed))
    }

    /// Starts a new run with the current particle count and another seed.
    pub fn reseed(&mut self, seed: Option<u64>) -> Result<(), SimulationError> {
        if self.state.is_none() {
            return Err(SimulationError::NotInitialized);
        }
        self.init(self.particle_count as i64, seed)
    }

    /// Releases every buffer. The last seed stays readable.
    pub fn teardown(&mut self) {
        if self.state.take().is_some() {
            debug!("simulation torn down");
        }
    }

    pub fn advance_frame(&mut self) -> Result<(), SimulationError> {
        let physics = self.state.as_mut().ok_or(SimulationError::NotInitialized)?;
        physics.update();
        trace!("advanced to frame {}", physics.frame());
        Ok(())
    }

    pub fn get_positions(&self) -> Result<PositionSnapshot, SimulationError> {
        Ok(self.physics()?.take_snapshot())
    }

    /// The seed in effect, including one derived from the clock.
    pub fn get_seed(&self) -> u64 {
        self.seed
    }

    pub fn is_ready(&self) -> bool {
        self.state.is_some()
    }

    pub fn particle_count(&self) -> Result<usize, SimulationError> {
        Ok(self.physics()?.particles().len())
    }

    pub fn settings(&self) -> &PhysicsSettings {
        &self.settings
    }

    /// The live field, for read-only inspection.
    pub fn physics(&self) -> Result<&FieldPhysics, SimulationError> {
        self.state.as_ref().ok_or(SimulationError::NotInitialized)
    }
}
