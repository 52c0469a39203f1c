// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The escape-time function.  Takes a point on the complex plane and
//! repeatedly squares it and adds the original point, counting how
//! many steps pass before the result leaves the circle of radius two.
//! Points that never leave within the iteration cap are presumed to
//! be in the Mandelbrot set.
//!
//! Nothing here holds state, so the same functions run unchanged on a
//! single thread, on a pool of CPU workers, and inside a device
//! kernel.

use num::{clamp, Complex};

use errors::{MandelError, Result};
use planes::{Pixel, PlaneMapper};
#[cfg(test)]
use planes::Viewport;

/// The maximum number of escape-test iterations per pixel.  Also the
/// value reported for points that never escape.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct IterationCap(u32);

impl IterationCap {
    /// The cap must be at least one.
    pub fn new(cap: u32) -> Result<IterationCap> {
        if cap == 0 {
            return Err(MandelError::precondition("the iteration cap must be positive"));
        }
        Ok(IterationCap(cap))
    }

    /// The raw cap.
    pub fn get(self) -> u32 {
        self.0
    }
}

/// Returns the index of the first iteration whose result has a
/// squared modulus of at least 4, or `max_iters` if none does.
#[inline]
pub fn escape_time(c: Complex<f64>, max_iters: u32) -> u32 {
    let mut z: Complex<f64> = Complex { re: 0.0, im: 0.0 };
    for i in 0..max_iters {
        z = z * z + c;
        if z.norm_sqr() >= 4.0 {
            return i;
        }
    }
    max_iters
}

/// The same test, taking the real and imaginary parts separately.
#[inline]
pub fn mandel(x: f64, y: f64, max_iters: u32) -> u32 {
    escape_time(Complex::new(x, y), max_iters)
}

/// Map one pixel, run the escape test, and clamp the result to a
/// byte.  Every backend produces its pixels through this call.
#[inline]
pub fn pixel_value(mapper: &PlaneMapper, pixel: &Pixel, cap: IterationCap) -> u8 {
    clamp(escape_time(mapper.pixel_to_point(pixel), cap.get()), 0, 255) as u8
}
