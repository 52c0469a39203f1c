#![deny(missing_docs)]
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Escape-time Mandelbrot renderer
//!
//! The Mandelbrot set is the set of points `c` on the complex plane
//! for which repeatedly squaring `z` and adding `c`, starting from
//! zero, never runs off to infinity.  Once `|z|` reaches two it never
//! comes back, so the number of steps it takes to get there (the
//! "escape time") is a cheap and pretty proxy for how far outside the
//! set a point lies.  Points that haven't escaped by the iteration cap
//! are reported as the cap itself.
//!
//! This crate maps a rectangular viewport of the complex plane onto a
//! grid of pixels and writes one escape time per pixel into a
//! caller-owned buffer of bytes.  The same per-pixel function runs on
//! three backends that produce identical images:
//!
//! * `SequentialRenderer`, a plain nested loop;
//! * `ParallelRenderer`, a pool of scoped threads sharing rows;
//! * `DeviceRenderer`, which launches a grid-stride kernel over a 2D
//!   grid of 2D thread blocks on a `Device` with its own memory.

extern crate crossbeam;
#[macro_use]
extern crate failure;
extern crate itertools;
#[macro_use]
extern crate log;
extern crate num;
extern crate num_cpus;

pub mod buffer;
pub mod device;
pub mod errors;
pub mod escape;
pub mod planes;
pub mod renderer;

pub use buffer::ImageBuffer;
pub use device::{Device, DeviceRenderer, EmulatedDevice, LaunchConfig};
pub use errors::{MandelError, Result};
pub use escape::{escape_time, mandel, IterationCap};
pub use planes::{Pixel, PlaneMapper, Viewport};
pub use renderer::{ParallelRenderer, Renderer, SequentialRenderer};
