//! The image buffer: one unsigned byte per pixel, row-major, rows
//! running along the imaginary axis and columns along the real axis.
//! The caller allocates and owns it; renderers only overwrite its
//! contents, they never resize it.

use std::slice::ChunksMut;

use errors::{MandelError, Result};

/// A zero-initialised grid of iteration counts.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageBuffer {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

fn check_dimensions(width: usize, height: usize) -> Result<usize> {
    if width == 0 || height == 0 {
        return Err(MandelError::precondition(format!(
            "image dimensions must be positive, got {}x{}",
            width, height
        )));
    }
    width.checked_mul(height).ok_or_else(|| {
        MandelError::precondition(format!("image of {}x{} pixels is too large", width, height))
    })
}

impl ImageBuffer {
    /// Allocate a `width` by `height` buffer filled with zeros.
    pub fn new(width: usize, height: usize) -> Result<ImageBuffer> {
        let len = check_dimensions(width, height)?;
        Ok(ImageBuffer {
            width,
            height,
            pixels: vec![0 as u8; len],
        })
    }

    /// Wrap an existing row-major vector of pixels.
    pub fn from_raw(width: usize, height: usize, pixels: Vec<u8>) -> Result<ImageBuffer> {
        let len = check_dimensions(width, height)?;
        if pixels.len() != len {
            return Err(MandelError::precondition(format!(
                "a {}x{} image needs {} pixels, got {}",
                width,
                height,
                len,
                pixels.len()
            )));
        }
        Ok(ImageBuffer {
            width,
            height,
            pixels,
        })
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.height
    }

    /// (height, width), rows first.
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    /// Total number of pixels.
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    /// Never true for a buffer built through the constructors.
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// The value at column `x`, row `y`, if it lies inside the image.
    pub fn get(&self, x: usize, y: usize) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[y * self.width + x])
    }

    /// All pixels, row-major.
    pub fn as_slice(&self) -> &[u8] {
        &self.pixels
    }

    /// All pixels, row-major, writable.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// Disjoint, writable rows, top to bottom.
    pub fn rows_mut(&mut self) -> ChunksMut<u8> {
        self.pixels.chunks_mut(self.width)
    }

    /// Give up the buffer and return its pixels.
    pub fn into_raw(self) -> Vec<u8> {
        self.pixels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffers_start_zeroed() {
        let buf = ImageBuffer::new(3, 2).unwrap();
        assert_eq!(buf.shape(), (2, 3));
        assert_eq!(buf.len(), 6);
        assert!(buf.as_slice().iter().all(|p| *p == 0));
    }

    #[test]
    fn empty_buffers_are_refused() {
        assert!(ImageBuffer::new(0, 10).unwrap_err().is_precondition());
        assert!(ImageBuffer::new(10, 0).is_err());
    }

    #[test]
    fn raw_buffers_must_match_their_shape() {
        assert!(ImageBuffer::from_raw(2, 2, vec![0; 3]).is_err());
        let buf = ImageBuffer::from_raw(2, 2, vec![1, 2, 3, 4]).unwrap();
        assert_eq!(buf.get(1, 0), Some(2));
        assert_eq!(buf.get(0, 1), Some(3));
        assert_eq!(buf.get(2, 0), None);
    }

    #[test]
    fn rows_are_row_major() {
        let mut buf = ImageBuffer::new(4, 3).unwrap();
        for (y, row) in buf.rows_mut().enumerate() {
            assert_eq!(row.len(), 4);
            for p in row.iter_mut() {
                *p = y as u8;
            }
        }
        assert_eq!(buf.get(3, 2), Some(2));
        assert_eq!(buf.into_raw(), vec![0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2]);
    }
}
