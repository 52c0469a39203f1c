// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! CPU renderers.  Both walk every pixel of the caller's buffer and
//! write the escape time of that pixel's sample point; they differ
//! only in how the work is scheduled, so their output is
//! bit-for-bit the same.

extern crate crossbeam;

use std::sync::Mutex;

use buffer::ImageBuffer;
use errors::{MandelError, Result};
use escape::{pixel_value, IterationCap};
use planes::{Pixel, PlaneMapper, Viewport};

/// Anything that can fill an image buffer with escape times.  The
/// CPU renderers and the device renderer all sit behind this trait,
/// so callers can swap one for another without changing results.
pub trait Renderer {
    /// A short name for logs and benchmarks.
    fn name(&self) -> &str;

    /// Overwrite every pixel of `image` with the escape time of its
    /// sample point in `viewport`.
    fn render(&self, viewport: &Viewport, image: &mut ImageBuffer, cap: IterationCap) -> Result<()>;
}

/// Fill one row of pixels.  The row index fixes the imaginary part;
/// each column is mapped from scratch rather than by accumulating
/// steps, which keeps the floating point identical to the other
/// backends.
#[inline]
fn render_row(mapper: &PlaneMapper, row: usize, line: &mut [u8], cap: IterationCap) {
    for (column, pixel) in line.iter_mut().enumerate() {
        *pixel = pixel_value(mapper, &Pixel(column, row), cap);
    }
}

/// Single-threaded: a plain nested loop, one pixel at a time.
#[derive(Copy, Clone, Debug, Default)]
pub struct SequentialRenderer;

impl Renderer for SequentialRenderer {
    fn name(&self) -> &str {
        "sequential"
    }

    fn render(&self, viewport: &Viewport, image: &mut ImageBuffer, cap: IterationCap) -> Result<()> {
        let mapper = PlaneMapper::new(image.width(), image.height(), *viewport)?;
        debug!(
            "sequential render of {}x{} pixels, cap {}",
            image.width(),
            image.height(),
            cap.get()
        );
        let width = image.width();
        let pixels = image.as_mut_slice();
        for row in 0..mapper.integral_plane.1 {
            for column in 0..mapper.integral_plane.0 {
                pixels[row * width + column] = pixel_value(&mapper, &Pixel(column, row), cap);
            }
        }
        Ok(())
    }
}

/// Multi-threaded: a fixed pool of scoped workers pulls whole rows
/// off a shared queue until none are left.  Each row goes to exactly
/// one worker, so the buffer needs no locking.
#[derive(Copy, Clone, Debug)]
pub struct ParallelRenderer {
    threads: usize,
}

impl ParallelRenderer {
    /// A renderer with `threads` workers; there must be at least one.
    pub fn new(threads: usize) -> Result<ParallelRenderer> {
        if threads == 0 {
            return Err(MandelError::precondition("the thread count must be positive"));
        }
        Ok(ParallelRenderer { threads })
    }

    /// Number of workers this renderer spawns.
    pub fn threads(&self) -> usize {
        self.threads
    }
}

impl Default for ParallelRenderer {
    /// One worker per logical CPU.
    fn default() -> Self {
        ParallelRenderer {
            threads: num_cpus::get().max(1),
        }
    }
}

impl Renderer for ParallelRenderer {
    fn name(&self) -> &str {
        "parallel"
    }

    fn render(&self, viewport: &Viewport, image: &mut ImageBuffer, cap: IterationCap) -> Result<()> {
        let mapper = PlaneMapper::new(image.width(), image.height(), *viewport)?;
        let workers = self.threads.min(image.height());
        debug!(
            "parallel render of {}x{} pixels, cap {}, {} workers",
            image.width(),
            image.height(),
            cap.get(),
            workers
        );

        let rows = Mutex::new(image.rows_mut().enumerate());
        let mapper = &mapper;
        let rows = &rows;
        crossbeam::scope(|spawner| {
            for worker in 0..workers {
                spawner.spawn(move |_| {
                    let mut done = 0;
                    loop {
                        // A poisoned queue means another worker died; the
                        // scope reports that once everyone has stopped.
                        let next = match rows.lock() {
                            Ok(mut queue) => queue.next(),
                            Err(_) => break,
                        };
                        match next {
                            Some((row, line)) => {
                                render_row(mapper, row, line, cap);
                                done += 1;
                            }
                            None => break,
                        }
                    }
                    trace!("worker {} rendered {} rows", worker, done);
                });
            }
        })
        .map_err(|_| MandelError::WorkerPanicked)
    }
}
