//! Kernels, and the device memory they write into.

use std::sync::atomic::{AtomicU8, Ordering};

use errors::Result;
use escape::{pixel_value, IterationCap};
use planes::{Pixel, PlaneMapper, Viewport};

use super::launch::ThreadContext;

/// A view of one device allocation as a 2D image, shared by every
/// thread of a launch.  Threads of a well-formed kernel never write
/// the same pixel, so relaxed stores are enough; the launch's join
/// orders them before any download.
pub struct DeviceMemory<'a> {
    cells: &'a [AtomicU8],
    width: usize,
    height: usize,
}

impl<'a> DeviceMemory<'a> {
    pub(crate) fn new(cells: &'a [AtomicU8], width: usize, height: usize) -> DeviceMemory<'a> {
        debug_assert_eq!(cells.len(), width * height);
        DeviceMemory {
            cells,
            width,
            height,
        }
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Write `value` at column `x`, row `y`.  Writes outside the
    /// image are dropped.
    #[inline]
    pub fn store(&self, x: usize, y: usize, value: u8) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x].store(value, Ordering::Relaxed);
        }
    }
}

/// Code run once per device thread.  Kernels return nothing; results
/// go straight into device memory.
pub trait Kernel: Sync {
    /// Do this thread's share of the work.
    fn execute(&self, thread: &ThreadContext, memory: &DeviceMemory);
}

/// The escape-time kernel.  Each thread walks its grid-stride share
/// of the image, so any launch geometry covers every pixel.
#[derive(Copy, Clone, Debug)]
pub struct MandelKernel {
    mapper: PlaneMapper,
    cap: IterationCap,
}

impl MandelKernel {
    /// A kernel rendering `viewport` onto a `width` by `height` image.
    pub fn new(
        viewport: &Viewport,
        width: usize,
        height: usize,
        cap: IterationCap,
    ) -> Result<MandelKernel> {
        Ok(MandelKernel {
            mapper: PlaneMapper::new(width, height, *viewport)?,
            cap,
        })
    }
}

impl Kernel for MandelKernel {
    fn execute(&self, thread: &ThreadContext, memory: &DeviceMemory) {
        for (x, y) in thread.grid_stride(memory.width(), memory.height()) {
            memory.store(x, y, pixel_value(&self.mapper, &Pixel(x, y), self.cap));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use device::launch::LaunchConfig;

    #[test]
    fn one_thread_renders_the_whole_image() {
        let cells: Vec<AtomicU8> = (0..12).map(|_| AtomicU8::new(0)).collect();
        let memory = DeviceMemory::new(&cells, 4, 3);
        let viewport = Viewport::new(-2.0, 2.0, -1.5, 1.5).unwrap();
        let cap = IterationCap::new(9).unwrap();
        let kernel = MandelKernel::new(&viewport, 4, 3, cap).unwrap();

        let config = LaunchConfig::new((1, 1), (1, 1)).unwrap();
        for thread in config.threads() {
            kernel.execute(&thread, &memory);
        }

        let mapper = PlaneMapper::new(4, 3, viewport).unwrap();
        for y in 0..3 {
            for x in 0..4 {
                let stored = cells[y * 4 + x].load(Ordering::Relaxed);
                assert_eq!(stored, pixel_value(&mapper, &Pixel(x, y), cap));
            }
        }
        // (0, 1) samples -2 - 0.5i, (2, 1) samples -0.5i inside the cardioid.
        assert_eq!(cells[4].load(Ordering::Relaxed), 0);
        assert_eq!(cells[6].load(Ordering::Relaxed), 9);
    }

    #[test]
    fn stores_outside_the_image_are_dropped() {
        let cells: Vec<AtomicU8> = (0..4).map(|_| AtomicU8::new(0)).collect();
        let memory = DeviceMemory::new(&cells, 2, 2);
        memory.store(2, 0, 7);
        memory.store(0, 2, 7);
        memory.store(1, 1, 7);
        let stored: Vec<u8> = cells.iter().map(|c| c.load(Ordering::Relaxed)).collect();
        assert_eq!(stored, vec![0, 0, 0, 7]);
    }
}
