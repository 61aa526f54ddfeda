// Uniform grid over the unit torus, rebuilt from scratch every frame by counting sort.
use super::{Particle, Position};
use crate::error::SimulationError;

/// Contiguous slice of the index arena holding one cell's particles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CellRange {
    pub start: usize,
    pub count: usize,
}

pub struct SpatialGrid {
    cells: Vec<CellRange>,
    /// Particle indices grouped by cell
    indices: Vec<usize>,
    /// Per-cell write cursor used during the scatter pass
    cursor: Vec<usize>,
    grid_size: usize,
}

fn zeroed<T: Clone + Default>(len: usize, buffer: &'static str) -> Result<Vec<T>, SimulationError> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)
        .map_err(SimulationError::allocation(buffer))?;
    v.resize(len, T::default());
    Ok(v)
}

impl SpatialGrid {
    /// Allocates a `grid_size x grid_size` grid able to index `particle_count` particles.
    pub fn new(grid_size: usize, particle_count: usize) -> Result<Self, SimulationError> {
        let total_cells = grid_size
            .checked_mul(grid_size)
            .ok_or(SimulationError::InvalidSettings("grid has too many cells"))?;
        Ok(Self {
            cells: zeroed(total_cells, "grid cells")?,
            indices: zeroed(particle_count, "grid indices")?,
            cursor: zeroed(total_cells, "grid cursor")?,
            grid_size,
        })
    }

    pub fn grid_size(&self) -> usize {
        self.grid_size
    }

    /// Cell coordinates of a position.
    ///
    /// Clamped into range so a coordinate that rounds onto the far edge still
    /// lands in the last cell.
    #[inline]
    pub fn cell_coords(&self, position: &Position) -> (usize, usize) {
        let max = self.grid_size as i64 - 1;
        let scale = self.grid_size as f64;
        let gx = ((position.x * scale).floor() as i64).clamp(0, max);
        let gy = ((position.y * scale).floor() as i64).clamp(0, max);
        (gx as usize, gy as usize)
    }

    #[inline]
    fn cell_id(&self, gx: usize, gy: usize) -> usize {
        gy * self.grid_size + gx
    }

    /// Regroups particle indices by cell: count, prefix sum, scatter.
    pub fn rebuild(&mut self, particles: &[Particle]) {
        debug_assert_eq!(particles.len(), self.indices.len());

        for cell in &mut self.cells {
            cell.count = 0;
        }

        for particle in particles {
            let (gx, gy) = self.cell_coords(&particle.position);
            let id = self.cell_id(gx, gy);
            self.cells[id].count += 1;
        }

        let mut running_sum = 0;
        for cell in &mut self.cells {
            cell.start = running_sum;
            running_sum += cell.count;
        }

        self.cursor.iter_mut().for_each(|c| *c = 0);
        for (i, particle) in particles.iter().enumerate() {
            let (gx, gy) = self.cell_coords(&particle.position);
            let id = self.cell_id(gx, gy);
            let insert_pos = self.cells[id].start + self.cursor[id];
            self.indices[insert_pos] = i;
            self.cursor[id] += 1;
        }
    }

    /// Particle indices in cell `(gx, gy)`.
    pub fn bucket(&self, gx: usize, gy: usize) -> &[usize] {
        let cell = self.cells[self.cell_id(gx, gy)];
        &self.indices[cell.start..cell.start + cell.count]
    }

    /// Particle indices in the 3x3 block of cells around `(gx, gy)`, wrapping
    /// across the edges of the torus.
    pub fn neighborhood(&self, gx: usize, gy: usize) -> impl Iterator<Item = usize> + '_ {
        let n = self.grid_size;
        (0..3)
            .flat_map(move |dx| (0..3).map(move |dy| ((gx + n + dx - 1) % n, (gy + n + dy - 1) % n)))
            .flat_map(move |(nx, ny)| self.bucket(nx, ny).iter().copied())
    }

    pub fn cells(&self) -> &[CellRange] {
        &self.cells
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }
}
