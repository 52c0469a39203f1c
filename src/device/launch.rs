//! Launch geometry: a 2D grid of 2D thread blocks, and the view of
//! that geometry each thread gets while it runs.

use std::iter::StepBy;
use std::ops::Range;

use itertools::iproduct;

use errors::{MandelError, Result};

/// A pair of extents or indices, one per axis.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Dim2 {
    /// Along the real axis (image columns).
    pub x: usize,
    /// Along the imaginary axis (image rows).
    pub y: usize,
}

impl Dim2 {
    /// Shorthand constructor.
    pub fn new(x: usize, y: usize) -> Dim2 {
        Dim2 { x, y }
    }

    /// x times y.
    pub fn area(&self) -> usize {
        self.x * self.y
    }
}

/// How many blocks to launch, and how many threads in each.  Every
/// component is positive.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LaunchConfig {
    grid: Dim2,
    block: Dim2,
}

impl LaunchConfig {
    /// `grid` is measured in blocks, `block` in threads.
    pub fn new(grid: (usize, usize), block: (usize, usize)) -> Result<LaunchConfig> {
        if grid.0 == 0 || grid.1 == 0 {
            return Err(MandelError::precondition(format!(
                "grid dimensions must be positive, got {}x{}",
                grid.0, grid.1
            )));
        }
        if block.0 == 0 || block.1 == 0 {
            return Err(MandelError::precondition(format!(
                "block dimensions must be positive, got {}x{}",
                block.0, block.1
            )));
        }
        let overflows = grid
            .0
            .checked_mul(block.0)
            .and_then(|x| grid.1.checked_mul(block.1).and_then(|y| x.checked_mul(y)))
            .is_none();
        if overflows {
            return Err(MandelError::precondition("launch geometry is too large"));
        }
        Ok(LaunchConfig {
            grid: Dim2::new(grid.0, grid.1),
            block: Dim2::new(block.0, block.1),
        })
    }

    /// Grid extent, in blocks.
    pub fn grid(&self) -> Dim2 {
        self.grid
    }

    /// Block extent, in threads.
    pub fn block(&self) -> Dim2 {
        self.block
    }

    /// Number of blocks in the grid.
    pub fn block_count(&self) -> usize {
        self.grid.area()
    }

    /// Number of threads in each block.
    pub fn threads_per_block(&self) -> usize {
        self.block.area()
    }

    /// Number of threads in the whole launch.
    pub fn total_threads(&self) -> usize {
        self.block_count() * self.threads_per_block()
    }

    /// Every block index in the grid, row by row.
    pub fn blocks(&self) -> impl Iterator<Item = Dim2> {
        iproduct!(0..self.grid.y, 0..self.grid.x).map(|(y, x)| Dim2::new(x, y))
    }

    /// The threads of one block, in order.
    pub fn block_threads(&self, block_idx: Dim2) -> impl Iterator<Item = ThreadContext> {
        let config = *self;
        iproduct!(0..config.block.y, 0..config.block.x)
            .map(move |(y, x)| config.thread(block_idx, Dim2::new(x, y)))
    }

    /// Every thread of the launch, block by block.
    pub fn threads(&self) -> impl Iterator<Item = ThreadContext> {
        let config = *self;
        self.blocks()
            .flat_map(move |block_idx| config.block_threads(block_idx))
    }

    /// The context of the thread at `thread_idx` within block `block_idx`.
    pub fn thread(&self, block_idx: Dim2, thread_idx: Dim2) -> ThreadContext {
        ThreadContext {
            grid_dim: self.grid,
            block_dim: self.block,
            block_idx,
            thread_idx,
        }
    }
}

/// The pixels one thread owns: every `grid_size().x`-th column from
/// its starting column, and within each of those every
/// `grid_size().y`-th row from its starting row.
pub type GridStride = ::itertools::Product<StepBy<Range<usize>>, StepBy<Range<usize>>>;

/// What a running thread knows about itself and the launch.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ThreadContext {
    /// Grid extent, in blocks.
    pub grid_dim: Dim2,
    /// Block extent, in threads.
    pub block_dim: Dim2,
    /// This thread's block.
    pub block_idx: Dim2,
    /// This thread's position within its block.
    pub thread_idx: Dim2,
}

impl ThreadContext {
    /// Absolute position of this thread in the launch.
    #[inline]
    pub fn position(&self) -> Dim2 {
        Dim2::new(
            self.block_dim.x * self.block_idx.x + self.thread_idx.x,
            self.block_dim.y * self.block_idx.y + self.thread_idx.y,
        )
    }

    /// Total threads along each axis of the launch.
    #[inline]
    pub fn grid_size(&self) -> Dim2 {
        Dim2::new(
            self.grid_dim.x * self.block_dim.x,
            self.grid_dim.y * self.block_dim.y,
        )
    }

    /// The `(x, y)` pixels of a `width` by `height` image this thread
    /// is responsible for.  Across all threads of a launch these sets
    /// are disjoint and together cover the image.
    pub fn grid_stride(&self, width: usize, height: usize) -> GridStride {
        let start = self.position();
        let stride = self.grid_size();
        iproduct!(
            (start.x..width).step_by(stride.x),
            (start.y..height).step_by(stride.y)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn launch_components_must_be_positive() {
        assert!(LaunchConfig::new((0, 1), (1, 1)).unwrap_err().is_precondition());
        assert!(LaunchConfig::new((1, 0), (1, 1)).is_err());
        assert!(LaunchConfig::new((1, 1), (0, 1)).is_err());
        assert!(LaunchConfig::new((1, 1), (1, 0)).is_err());
        assert!(LaunchConfig::new((::std::usize::MAX, 2), (2, 1)).is_err());
    }

    #[test]
    fn launch_counts_threads() {
        let config = LaunchConfig::new((32, 16), (32, 8)).unwrap();
        assert_eq!(config.block_count(), 512);
        assert_eq!(config.threads_per_block(), 256);
        assert_eq!(config.total_threads(), 131_072);
        assert_eq!(config.threads().count(), 131_072);
    }

    #[test]
    fn thread_positions_follow_block_layout() {
        let config = LaunchConfig::new((4, 3), (8, 2)).unwrap();
        let thread = config.thread(Dim2::new(2, 1), Dim2::new(5, 1));
        assert_eq!(thread.position(), Dim2::new(21, 3));
        assert_eq!(thread.grid_size(), Dim2::new(32, 6));
    }

    #[test]
    fn grid_stride_walks_columns_then_rows() {
        let config = LaunchConfig::new((1, 1), (2, 2)).unwrap();
        let thread = config.thread(Dim2::new(0, 0), Dim2::new(1, 0));
        let owned: Vec<(usize, usize)> = thread.grid_stride(5, 3).collect();
        assert_eq!(owned, vec![(1, 0), (1, 2), (3, 0), (3, 2)]);
    }

    #[test]
    fn idle_threads_own_nothing() {
        let config = LaunchConfig::new((4, 4), (4, 4)).unwrap();
        let thread = config.thread(Dim2::new(3, 3), Dim2::new(3, 3));
        assert_eq!(thread.grid_stride(10, 10).count(), 0);
    }
}
