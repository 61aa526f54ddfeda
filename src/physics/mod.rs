use nalgebra::Vector2;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::SimulationError;

pub mod force;
pub mod grid;
pub mod matrix;

use force::force;
use grid::SpatialGrid;
use matrix::{Matrix, MatrixGenerator};

pub type Position = Vector2<f64>;
pub type Velocity = Vector2<f64>;

#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub position: Position,
    pub velocity: Velocity,
    pub color: usize,
}

impl Particle {
    pub fn new(position: Position, color: usize) -> Self {
        Self {
            position,
            velocity: Velocity::zeros(),
            color,
        }
    }
}

/// Parameters of the field dynamics.
///
/// The defaults are the reference constants; two runs only reproduce each
/// other when these match exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsSettings {
    /// Fixed time step per frame
    pub dt: f64,
    /// Time for velocity to halve with no applied force
    pub friction_half: f64,
    /// Interaction radius, also the minimum grid cell width
    pub rmax: f64,
    /// Number of particle colors
    pub colors: usize,
    /// Global force multiplier
    pub force_factor: f64,
    /// Inner radius fraction of universal repulsion
    pub beta: f64,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            dt: 0.02,
            friction_half: 0.04,
            rmax: 0.1,
            colors: 6,
            force_factor: 3.0,
            beta: force::BETA,
        }
    }
}

impl PhysicsSettings {
    /// Per-frame velocity decay, `0.5 ^ (dt / friction_half)`.
    pub fn friction_factor(&self) -> f64 {
        0.5_f64.powf(self.dt / self.friction_half)
    }

    /// Cells per axis; each cell is at least `rmax` wide.
    pub fn grid_size(&self) -> usize {
        (1.0 / self.rmax).floor() as usize
    }

    pub fn validate(&self) -> Result<(), SimulationError> {
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(SimulationError::InvalidSettings("dt must be positive"));
        }
        if !(self.friction_half.is_finite() && self.friction_half > 0.0) {
            return Err(SimulationError::InvalidSettings("friction_half must be positive"));
        }
        // a 3x3 neighborhood must not visit the same cell twice
        if !(self.rmax > 0.0 && self.grid_size() >= 3) {
            return Err(SimulationError::InvalidSettings("rmax must lie in (0, 1/3]"));
        }
        if self.colors == 0 {
            return Err(SimulationError::InvalidSettings("colors must be at least 1"));
        }
        if !self.force_factor.is_finite() {
            return Err(SimulationError::InvalidSettings("force_factor must be finite"));
        }
        if !(self.beta > 0.0 && self.beta < 1.0) {
            return Err(SimulationError::InvalidSettings("beta must lie in (0, 1)"));
        }
        Ok(())
    }
}

/// Minimum-image displacement along one axis of the unit torus.
#[inline]
pub fn wrap_delta(d: f64) -> f64 {
    if d > 0.5 {
        d - 1.0
    } else if d < -0.5 {
        d + 1.0
    } else {
        d
    }
}

/// Shortest displacement from `from` to `to` on the unit torus.
#[inline]
pub fn toroidal_delta(from: &Position, to: &Position) -> Vector2<f64> {
    Vector2::new(wrap_delta(to.x - from.x), wrap_delta(to.y - from.y))
}

/// Wraps a coordinate back into `[0, 1)`.
#[inline]
pub fn wrap_unit(p: f64) -> f64 {
    let wrapped = p.rem_euclid(1.0);
    // a tiny negative plus one rounds onto the seam
    if wrapped >= 1.0 {
        0.0
    } else {
        wrapped
    }
}

/// Read-only copy of the particle store, index-aligned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PositionSnapshot {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub color: Vec<usize>,
}

fn buffer<T>(len: usize, name: &'static str) -> Result<Vec<T>, SimulationError> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)
        .map_err(SimulationError::allocation(name))?;
    Ok(v)
}

/// Particle store plus the per-frame stepper that owns the grid and matrix.
pub struct FieldPhysics {
    particles: Vec<Particle>,
    settings: PhysicsSettings,
    matrix: Matrix,
    friction_factor: f64,
    spatial_grid: SpatialGrid,
    force_buffer: Vec<Vector2<f64>>,
    frame: u64,
}

impl FieldPhysics {
    /// Allocates every buffer and draws the initial field from `seed`.
    ///
    /// The matrix is drawn first, then position x, position y and color for
    /// each particle in store order.
    pub fn new(
        particle_count: usize,
        settings: PhysicsSettings,
        seed: u64,
        matrix_generator: &dyn MatrixGenerator,
    ) -> Result<Self, SimulationError> {
        settings.validate()?;
        let mut rng = SmallRng::seed_from_u64(seed);

        let mut particles = buffer(particle_count, "particles")?;
        let mut force_buffer = buffer(particle_count, "force")?;
        force_buffer.resize(particle_count, Vector2::zeros());
        let spatial_grid = SpatialGrid::new(settings.grid_size(), particle_count)?;
        let matrix = matrix_generator.generate(settings.colors, &mut rng)?;

        for _ in 0..particle_count {
            let x = rng.gen::<f64>();
            let y = rng.gen::<f64>();
            let color = rng.gen_range(0..settings.colors);
            particles.push(Particle::new(Position::new(x, y), color));
        }

        Ok(Self {
            particles,
            friction_factor: settings.friction_factor(),
            settings,
            matrix,
            spatial_grid,
            force_buffer,
            frame: 0,
        })
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn settings(&self) -> &PhysicsSettings {
        &self.settings
    }

    pub fn matrix(&self) -> &Matrix {
        &self.matrix
    }

    pub fn grid(&self) -> &SpatialGrid {
        &self.spatial_grid
    }

    /// Frames advanced since initialization.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Advances the whole field by one time step.
    ///
    /// Forces for every particle are read from the pre-step state before any
    /// velocity changes, and every velocity is final before any position moves.
    pub fn update(&mut self) {
        self.frame += 1;
        if self.particles.is_empty() {
            return;
        }

        self.spatial_grid.rebuild(&self.particles);

        let particles = &self.particles;
        let grid = &self.spatial_grid;
        let matrix = &self.matrix;
        let rmax = self.settings.rmax;
        let beta = self.settings.beta;
        let force_scale = rmax * self.settings.force_factor;

        let chunk_size = (particles.len() / num_cpus::get()).max(1);
        self.force_buffer
            .par_chunks_mut(chunk_size)
            .enumerate()
            .for_each(|(chunk_idx, force_chunk)| {
                let start_idx = chunk_idx * chunk_size;

                for (local_i, total) in force_chunk.iter_mut().enumerate() {
                    let i = start_idx + local_i;
                    let particle_i = &particles[i];
                    let (gx, gy) = grid.cell_coords(&particle_i.position);

                    let mut sum = Vector2::zeros();
                    for j in grid.neighborhood(gx, gy) {
                        if j == i {
                            continue;
                        }
                        let particle_j = &particles[j];
                        let delta = toroidal_delta(&particle_i.position, &particle_j.position);
                        let r = delta.norm();

                        if r > 0.0 && r < rmax {
                            let attraction = matrix.get(particle_i.color, particle_j.color);
                            let f = force(r / rmax, attraction, beta);
                            sum += delta * (1.0 / r) * f;
                        }
                    }
                    *total = sum * force_scale;
                }
            });

        let dt = self.settings.dt;
        let friction_factor = self.friction_factor;

        self.particles
            .par_iter_mut()
            .zip(self.force_buffer.par_iter())
            .for_each(|(particle, total)| {
                particle.velocity = particle.velocity * friction_factor + *total * dt;
            });

        self.particles.par_iter_mut().for_each(|particle| {
            particle.position += particle.velocity * dt;
            particle.position.x = wrap_unit(particle.position.x);
            particle.position.y = wrap_unit(particle.position.y);
        });
    }

    /// Particles per color.
    pub fn type_count(&self) -> Vec<usize> {
        let mut type_count = vec![0; self.settings.colors];
        for particle in &self.particles {
            type_count[particle.color] += 1;
        }
        type_count
    }

    pub fn mean_speed(&self) -> f64 {
        if self.particles.is_empty() {
            return 0.0;
        }
        let total: f64 = self.particles.iter().map(|p| p.velocity.norm()).sum();
        total / self.particles.len() as f64
    }

    pub fn take_snapshot(&self) -> PositionSnapshot {
        PositionSnapshot {
            x: self.particles.iter().map(|p| p.position.x).collect(),
            y: self.particles.iter().map(|p| p.position.y).collect(),
            color: self.particles.iter().map(|p| p.color).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::matrix::{RandomMatrixGenerator, ZeroMatrixGenerator};
    use super::*;

    fn field(n: usize, seed: u64, generator: &dyn MatrixGenerator) -> FieldPhysics {
        FieldPhysics::new(n, PhysicsSettings::default(), seed, generator).unwrap()
    }

    #[test]
    fn defaults_are_reference_constants() {
        let s = PhysicsSettings::default();
        assert_eq!(s.dt, 0.02);
        assert_eq!(s.friction_half, 0.04);
        assert_eq!(s.rmax, 0.1);
        assert_eq!(s.colors, 6);
        assert_eq!(s.force_factor, 3.0);
        assert_eq!(s.beta, 0.3);
        assert_eq!(s.grid_size(), 10);
        assert!((s.friction_factor() - 0.5_f64.sqrt()).abs() < 1e-15);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn rejects_unusable_settings() {
        let bad = [
            PhysicsSettings { dt: 0.0, ..Default::default() },
            PhysicsSettings { friction_half: -1.0, ..Default::default() },
            PhysicsSettings { rmax: 0.4, ..Default::default() },
            PhysicsSettings { rmax: 0.0, ..Default::default() },
            PhysicsSettings { colors: 0, ..Default::default() },
            PhysicsSettings { beta: 1.0, ..Default::default() },
            PhysicsSettings { force_factor: f64::NAN, ..Default::default() },
        ];
        for settings in bad {
            assert!(
                matches!(settings.validate(), Err(SimulationError::InvalidSettings(_))),
                "{settings:?} accepted"
            );
        }
    }

    #[test]
    fn minimum_image_across_seam() {
        let a = Position::new(0.01, 0.5);
        let b = Position::new(0.99, 0.5);
        let d = toroidal_delta(&a, &b);
        assert!((d.x + 0.02).abs() < 1e-12);
        assert!((d.norm() - 0.02).abs() < 1e-12);
        assert!((toroidal_delta(&b, &a).x - 0.02).abs() < 1e-12);
        assert_eq!(wrap_delta(0.3), 0.3);
    }

    #[test]
    fn wrap_unit_stays_in_range() {
        assert_eq!(wrap_unit(0.25), 0.25);
        assert!((wrap_unit(1.25) - 0.25).abs() < 1e-15);
        assert!((wrap_unit(-0.25) - 0.75).abs() < 1e-15);
        assert_eq!(wrap_unit(1.0), 0.0);
        assert_eq!(wrap_unit(-1e-18), 0.0);
        assert_eq!(wrap_unit(-0.0), 0.0);
    }

    #[test]
    fn initial_draw_is_in_range() {
        let physics = field(2000, 11, &RandomMatrixGenerator);
        assert_eq!(physics.particles().len(), 2000);
        for p in physics.particles() {
            assert!((0.0..1.0).contains(&p.position.x));
            assert!((0.0..1.0).contains(&p.position.y));
            assert!(p.color < 6);
            assert_eq!(p.velocity, Velocity::zeros());
        }
        assert_eq!(physics.type_count().iter().sum::<usize>(), 2000);
        assert!(physics.type_count().iter().all(|&c| c > 0));
    }

    #[test]
    fn friction_alone_halves_speed_every_half_life() {
        let mut physics = field(1, 5, &ZeroMatrixGenerator);
        physics.particles[0].position = Position::new(0.5, 0.5);
        physics.particles[0].velocity = Velocity::new(1.0, 0.0);

        physics.update();
        let p = &physics.particles[0];
        let expected = 0.5_f64.powf(0.02 / 0.04);
        assert!((p.velocity.x - expected).abs() < 1e-12);
        assert_eq!(p.velocity.y, 0.0);
        assert!((p.position.x - (0.5 + expected * 0.02)).abs() < 1e-12);

        physics.update();
        assert!((physics.particles[0].velocity.x - 0.5).abs() < 1e-12);
    }

    #[test]
    fn close_pair_repels_across_seam() {
        let mut physics = field(2, 1, &ZeroMatrixGenerator);
        physics.particles[0].position = Position::new(0.01, 0.5);
        physics.particles[1].position = Position::new(0.99, 0.5);

        physics.update();
        let left = &physics.particles[0];
        let right = &physics.particles[1];
        assert!(left.velocity.x > 0.0, "{:?}", left.velocity);
        assert!(right.velocity.x < 0.0, "{:?}", right.velocity);
        assert!((left.velocity.x + right.velocity.x).abs() < 1e-12);
        assert!(left.velocity.y.abs() < 1e-12);
    }

    #[test]
    fn grid_forces_match_all_pairs() {
        let mut physics = field(400, 21, &RandomMatrixGenerator);
        let before = physics.particles.clone();
        let s = physics.settings.clone();

        physics.update();

        for (i, p1) in before.iter().enumerate() {
            let mut sum = Vector2::zeros();
            for (j, p2) in before.iter().enumerate() {
                if i == j {
                    continue;
                }
                let delta = toroidal_delta(&p1.position, &p2.position);
                let r = delta.norm();
                if r > 0.0 && r < s.rmax {
                    let f = force(r / s.rmax, physics.matrix.get(p1.color, p2.color), s.beta);
                    sum += delta * (1.0 / r) * f;
                }
            }
            let expected = sum * (s.rmax * s.force_factor) * s.dt;
            let got = physics.particles[i].velocity;
            assert!((got - expected).norm() < 1e-12, "particle {i}: {got:?} vs {expected:?}");
        }
    }

    #[test]
    fn positions_stay_contained() {
        let mut physics = field(1500, 8, &RandomMatrixGenerator);
        for _ in 0..50 {
            physics.update();
            for p in physics.particles() {
                assert!((0.0..1.0).contains(&p.position.x), "{:?}", p.position);
                assert!((0.0..1.0).contains(&p.position.y), "{:?}", p.position);
            }
        }
        assert_eq!(physics.frame(), 50);
    }

    #[test]
    fn empty_field_steps() {
        let mut physics = field(0, 0, &RandomMatrixGenerator);
        physics.update();
        assert_eq!(physics.take_snapshot(), PositionSnapshot::default());
        assert_eq!(physics.mean_speed(), 0.0);
    }
}
