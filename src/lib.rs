//! Particle life on the unit torus.
//!
//! Particles of a few colors attract or repel each other according to a
//! random, generally asymmetric, color-pair matrix. Each frame rebuilds a
//! uniform grid over the torus, sums the forces from the wrapped 3x3 cell
//! neighborhood of every particle, then integrates velocity with exponential
//! friction and position with wraparound.
//!
//! ```no_run
//! use particle_field::Simulation;
//!
//! let mut simulation = Simulation::new();
//! simulation.init(2500, Some(7)).unwrap();
//! simulation.advance_frame().unwrap();
//! let positions = simulation.get_positions().unwrap();
//! assert_eq!(positions.x.len(), 2500);
//! ```

pub mod app_settings;
pub mod error;
pub mod physics;
pub mod simulation;

pub use app_settings::AppSettings;
pub use error::SimulationError;
pub use physics::{FieldPhysics, Particle, PhysicsSettings, PositionSnapshot};
pub use simulation::Simulation;
