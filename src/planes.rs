//! Contains the PlaneMapper struct, which describes a relationship
//! between a rectangle on the integral plane with an origin at 0,0,
//! and a rectangle on the complex plane bounded by a Viewport.  The
//! mapping is the same on the host and on the device, so every
//! backend samples exactly the same points.
use num::Complex;

use errors::{MandelError, Result};

/// The rectangle of the complex plane to sample.  The real part is
/// the x-component and the imaginary part the y-component.  A
/// Viewport can only be built through `new`, so the minimum bound is
/// always strictly less than the maximum on both axes.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Viewport {
    min_x: f64,
    max_x: f64,
    min_y: f64,
    max_y: f64,
}

impl Viewport {
    /// Bounds are given in the order: minimum real, maximum real,
    /// minimum imaginary, maximum imaginary.
    pub fn new(min_x: f64, max_x: f64, min_y: f64, max_y: f64) -> Result<Viewport> {
        if !(min_x.is_finite() && max_x.is_finite() && min_y.is_finite() && max_y.is_finite()) {
            return Err(MandelError::precondition(
                "viewport bounds must be finite numbers",
            ));
        }

        if min_x >= max_x {
            return Err(MandelError::precondition(format!(
                "the left edge ({}) is not to the left of the right edge ({})",
                min_x, max_x
            )));
        }

        if min_y >= max_y {
            return Err(MandelError::precondition(format!(
                "the lower edge ({}) is not below the upper edge ({})",
                min_y, max_y
            )));
        }

        if !((max_x - min_x).is_finite() && (max_y - min_y).is_finite()) {
            return Err(MandelError::precondition(format!(
                "viewport spans of {} by {} are too wide to sample",
                max_x - min_x,
                max_y - min_y
            )));
        }

        Ok(Viewport {
            min_x,
            max_x,
            min_y,
            max_y,
        })
    }

    /// Build a viewport from its left-lower and right-upper corners.
    pub fn from_corners(leftlower: Complex<f64>, rightupper: Complex<f64>) -> Result<Viewport> {
        Viewport::new(leftlower.re, rightupper.re, leftlower.im, rightupper.im)
    }

    /// Minimum real bound.
    pub fn min_x(&self) -> f64 {
        self.min_x
    }

    /// Maximum real bound.
    pub fn max_x(&self) -> f64 {
        self.max_x
    }

    /// Minimum imaginary bound.
    pub fn min_y(&self) -> f64 {
        self.min_y
    }

    /// Maximum imaginary bound.
    pub fn max_y(&self) -> f64 {
        self.max_y
    }
}

/// Describes the width and height of an integral plane that is assumed to start at
/// 0,0 and all values are assumed to be non-negative integers.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct IntegralPlane(pub usize, pub usize);

/// Describes the column, row of a pixel in the integral plane.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Pixel(pub usize, pub usize);

/// Maps pixels of an integral plane onto sample points of a
/// Viewport.  Each pixel is sampled at its top-left corner, not its
/// center.
#[derive(Copy, Clone, Debug)]
pub struct PlaneMapper {
    /// Width and height of the integral cartesian plane.
    pub integral_plane: IntegralPlane,
    /// The region of the complex plane being sampled.
    pub viewport: Viewport,
    // Width and height of one pixel, in complex-plane units.
    pixel_size: (f64, f64),
}

impl PlaneMapper {
    /// Constructor.  Takes the size of the integral plane and the
    /// viewport it covers.
    pub fn new(width: usize, height: usize, viewport: Viewport) -> Result<PlaneMapper> {
        if width == 0 || height == 0 {
            return Err(MandelError::precondition(format!(
                "image dimensions must be positive, got {}x{}",
                width, height
            )));
        }

        let pixel_size = (
            (viewport.max_x - viewport.min_x) / (width as f64),
            (viewport.max_y - viewport.min_y) / (height as f64),
        );
        if !(pixel_size.0.is_finite() && pixel_size.1.is_finite()) {
            return Err(MandelError::precondition(format!(
                "pixel size {:?} is not a finite number",
                pixel_size
            )));
        }

        Ok(PlaneMapper {
            integral_plane: IntegralPlane(width, height),
            viewport,
            pixel_size,
        })
    }

    /// The total number of points in the integral grid.
    pub fn len(&self) -> usize {
        self.integral_plane.0 * self.integral_plane.1
    }

    /// True if the plane has no pixels, which a constructed mapper never does.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Width and height of a single pixel on the complex plane.
    pub fn pixel_size(&self) -> (f64, f64) {
        self.pixel_size
    }

    /// Given a pixel on the integral cartesian plane, return the
    /// complex number at its top-left corner.
    #[inline]
    pub fn pixel_to_point(&self, pixel: &Pixel) -> Complex<f64> {
        Complex::new(
            self.viewport.min_x + (pixel.0 as f64) * self.pixel_size.0,
            self.viewport.min_y + (pixel.1 as f64) * self.pixel_size.1,
        )
    }
}
