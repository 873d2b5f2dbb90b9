use super::particle::{CellCoord, Particle};
use crate::error::SphError;
use crate::units::*;
use cgmath::prelude::*;
use microprofile::scope;

pub type ParticleIndex = u32;

/// Uniform grid over the simulation box, bucketing particle indices by cell.
///
/// Cell size is the smoothing radius, so all neighbors of a particle are in the 3x3 block around its cell.
/// Buckets are kept across steps to avoid reallocation. Only buckets that got touched since the last
/// rebuild are cleared, which matters when the grid is much larger than the particle count.
pub struct SpatialGrid {
    width: usize,
    height: usize,
    buckets: Vec<Vec<ParticleIndex>>,
    occupied: Vec<bool>,
    occupied_buckets: Vec<usize>,
}

impl SpatialGrid {
    /// Grid with `width x height` cells, each dimension raised to at least one cell.
    pub fn new(width: usize, height: usize) -> SpatialGrid {
        let width = width.max(1);
        let height = height.max(1);
        let num_cells = width * height;
        SpatialGrid {
            width,
            height,
            buckets: vec![Vec::new(); num_cells],
            occupied: vec![false; num_cells],
            occupied_buckets: Vec::new(),
        }
    }

    /// Grid covering a box of the given size, `ceil(size / cell_size)` cells per axis (at least one).
    pub fn for_box(box_width: Real, box_height: Real, cell_size: Real) -> SpatialGrid {
        let width = (box_width / cell_size).ceil() as usize;
        let height = (box_height / cell_size).ceil() as usize;
        Self::new(width, height)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    fn bucket_index(&self, cell: CellCoord) -> usize {
        cell.x + cell.y * self.width
    }

    /// Cell used for bucketing, particles outside of the grid are assigned to the nearest border cell.
    #[inline]
    pub fn clamp_cell(&self, cell: CellCoord) -> CellCoord {
        CellCoord {
            x: cell.x.min(self.width - 1),
            y: cell.y.min(self.height - 1),
        }
    }

    pub fn contains(&self, cell: CellCoord) -> bool {
        cell.x < self.width && cell.y < self.height
    }

    pub fn bucket(&self, cell: CellCoord) -> Option<&[ParticleIndex]> {
        if self.contains(cell) {
            Some(&self.buckets[self.bucket_index(cell)])
        } else {
            None
        }
    }

    pub fn num_occupied_buckets(&self) -> usize {
        self.occupied_buckets.len()
    }

    pub fn clear(&mut self) {
        for &bucket_index in self.occupied_buckets.iter() {
            self.buckets[bucket_index].clear();
            self.occupied[bucket_index] = false;
        }
        self.occupied_buckets.clear();
    }

    pub fn insert(&mut self, particle_index: ParticleIndex, cell: CellCoord) -> Result<(), SphError> {
        if !self.contains(cell) {
            return Err(SphError::CellOutOfBounds {
                x: cell.x,
                y: cell.y,
                width: self.width,
                height: self.height,
            });
        }
        self.push(self.bucket_index(cell), particle_index);
        Ok(())
    }

    #[inline]
    fn push(&mut self, bucket_index: usize, particle_index: ParticleIndex) {
        self.buckets[bucket_index].push(particle_index);
        if !self.occupied[bucket_index] {
            self.occupied[bucket_index] = true;
            self.occupied_buckets.push(bucket_index);
        }
    }

    pub fn rebuild(&mut self, particles: &[Particle]) {
        microprofile::scope!("SpatialGrid", "rebuild");
        self.clear();
        for (i, p) in particles.iter().enumerate() {
            let bucket_index = self.bucket_index(self.clamp_cell(p.cell()));
            self.push(bucket_index, i as ParticleIndex);
        }
    }

    /// Calls `f` with every particle j in the 3x3 cell block around particle i with `|rj - ri|² <= h²`.
    /// Includes i itself.
    #[inline(always)]
    pub fn for_each_neighbor(&self, particles: &[Particle], i: usize, mut f: impl FnMut(usize)) {
        let pi = &particles[i];
        let smooth_radius_sq = pi.smooth_radius() * pi.smooth_radius();
        let center = self.clamp_cell(pi.cell());

        for dy in -1..=1_isize {
            let y = center.y as isize + dy;
            if y < 0 || y >= self.height as isize {
                continue;
            }
            for dx in -1..=1_isize {
                let x = center.x as isize + dx;
                if x < 0 || x >= self.width as isize {
                    continue;
                }
                let bucket = &self.buckets[x as usize + y as usize * self.width];
                for &j in bucket.iter() {
                    let j = j as usize;
                    if (particles[j].position - pi.position).magnitude2() <= smooth_radius_sq {
                        f(j);
                    }
                }
            }
        }
    }

    pub fn query_neighborhood(&self, particles: &[Particle], i: usize) -> Vec<ParticleIndex> {
        let mut neighbors = Vec::new();
        self.for_each_neighbor(particles, i, |j| neighbors.push(j as ParticleIndex));
        neighbors
    }
}
