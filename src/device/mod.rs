// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The device path.  A device has memory of its own, separate from
//! the host: the image is allocated there, a kernel is launched over
//! a fixed 2D grid of 2D thread blocks to fill it, and the result is
//! downloaded back into the caller's buffer.
//!
//! The escape-time kernel uses a grid-stride loop, so the launch
//! geometry need not match the image size.  A launch with fewer
//! threads than pixels simply gives each thread several pixels; a
//! launch with more leaves some threads idle.  Either way every pixel
//! is written exactly once.

mod emulated;
mod kernel;
mod launch;

pub use self::emulated::{EmulatedDevice, DEFAULT_CAPACITY, MAX_THREADS_PER_BLOCK};
pub use self::kernel::{DeviceMemory, Kernel, MandelKernel};
pub use self::launch::{Dim2, GridStride, LaunchConfig, ThreadContext};

use buffer::ImageBuffer;
use errors::{MandelError, Result};
use escape::IterationCap;
use planes::Viewport;
use renderer::Renderer;

/// An opaque handle to an image-shaped allocation on a device.  It is
/// only meaningful to the device that issued it, and is consumed when
/// released.  Dropping a handle does not free anything: its storage
/// stays allocated, and counted against the device's memory, until it
/// is passed to `Device::release`.
#[derive(Debug, PartialEq, Eq)]
pub struct DeviceBuffer {
    device: usize,
    id: u64,
    width: usize,
    height: usize,
}

impl DeviceBuffer {
    /// Number of columns of the allocation.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of rows of the allocation.
    pub fn height(&self) -> usize {
        self.height
    }

    /// (height, width), matching `ImageBuffer::shape`.
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }
}

/// An accelerator with its own memory.
pub trait Device: Send + Sync {
    /// A name for logs and error messages.
    fn name(&self) -> &str;

    /// The largest block, in threads, this device can launch.
    fn max_threads_per_block(&self) -> usize;

    /// Allocate device storage shaped like `host` and copy `host`
    /// into it.
    fn allocate_and_upload(&self, host: &ImageBuffer) -> Result<DeviceBuffer>;

    /// Run `kernel` once per thread of `config` against `buffer`,
    /// returning once every thread has finished.
    fn launch(&self, config: &LaunchConfig, kernel: &dyn Kernel, buffer: &DeviceBuffer) -> Result<()>;

    /// Copy `buffer` into `host`, which must have the same shape.
    fn download_into(&self, buffer: &DeviceBuffer, host: &mut ImageBuffer) -> Result<()>;

    /// Copy `buffer` into a freshly allocated host buffer.
    fn download(&self, buffer: &DeviceBuffer) -> Result<ImageBuffer> {
        let mut host = ImageBuffer::new(buffer.width(), buffer.height())?;
        self.download_into(buffer, &mut host)?;
        Ok(host)
    }

    /// Free `buffer`'s storage.
    fn release(&self, buffer: DeviceBuffer) -> Result<()>;
}

/// Find a device backend by name.  Only the emulated device ships
/// with this crate; asking for anything else reports it unavailable.
pub fn open(name: &str) -> Result<Box<dyn Device>> {
    match name {
        "emulated" => Ok(Box::new(EmulatedDevice::new())),
        other => Err(MandelError::resource(format!(
            "no '{}' device backend is available (available: emulated)",
            other
        ))),
    }
}

/// Renders on a device: allocate, launch the escape-time kernel,
/// download, release.
pub struct DeviceRenderer {
    device: Box<dyn Device>,
    config: LaunchConfig,
}

impl DeviceRenderer {
    /// Render on `device` with the launch geometry `config`.
    pub fn new(device: Box<dyn Device>, config: LaunchConfig) -> DeviceRenderer {
        DeviceRenderer { device, config }
    }

    /// The device this renderer launches on.
    pub fn device(&self) -> &dyn Device {
        &*self.device
    }

    /// The launch geometry.
    pub fn config(&self) -> LaunchConfig {
        self.config
    }
}

impl Renderer for DeviceRenderer {
    fn name(&self) -> &str {
        "device"
    }

    fn render(&self, viewport: &Viewport, image: &mut ImageBuffer, cap: IterationCap) -> Result<()> {
        let kernel = MandelKernel::new(viewport, image.width(), image.height(), cap)?;
        if self.config.threads_per_block() > self.device.max_threads_per_block() {
            return Err(MandelError::precondition(format!(
                "blocks of {} threads exceed the {} thread limit of {}",
                self.config.threads_per_block(),
                self.device.max_threads_per_block(),
                self.device.name()
            )));
        }
        debug!(
            "device render of {}x{} pixels, cap {}, on {}",
            image.width(),
            image.height(),
            cap.get(),
            self.device.name()
        );

        let buffer = self.device.allocate_and_upload(image)?;
        let outcome = self
            .device
            .launch(&self.config, &kernel, &buffer)
            .and_then(|_| self.device.download_into(&buffer, image));
        let released = self.device.release(buffer);
        outcome.and(released)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use renderer::SequentialRenderer;

    #[test]
    fn unknown_backends_are_unavailable() {
        assert!(open("emulated").is_ok());
        let err = open("cuda").err().unwrap();
        assert!(err.is_resource());
    }

    #[test]
    fn device_renderer_matches_sequential() {
        let viewport = Viewport::new(-2.0, 1.0, -1.0, 1.0).unwrap();
        let cap = IterationCap::new(30).unwrap();
        let mut expected = ImageBuffer::new(45, 30).unwrap();
        SequentialRenderer.render(&viewport, &mut expected, cap).unwrap();

        let config = LaunchConfig::new((2, 3), (4, 2)).unwrap();
        let renderer = DeviceRenderer::new(open("emulated").unwrap(), config);
        assert_eq!(renderer.config(), config);
        assert!(renderer.device().name().starts_with("emulated:"));
        let mut actual = ImageBuffer::new(45, 30).unwrap();
        renderer.render(&viewport, &mut actual, cap).unwrap();
        assert_eq!(actual, expected);
    }

    #[test]
    fn device_renderer_releases_its_memory() {
        let viewport = Viewport::new(-2.0, 1.0, -1.0, 1.0).unwrap();
        let cap = IterationCap::new(5).unwrap();
        let config = LaunchConfig::new((1, 1), (8, 8)).unwrap();
        let renderer = DeviceRenderer::new(Box::new(EmulatedDevice::with_capacity(64)), config);
        let mut image = ImageBuffer::new(8, 8).unwrap();
        renderer.render(&viewport, &mut image, cap).unwrap();
        renderer.render(&viewport, &mut image, cap).unwrap();
        let mut too_big = ImageBuffer::new(9, 8).unwrap();
        assert!(renderer.render(&viewport, &mut too_big, cap).unwrap_err().is_resource());
    }

    #[test]
    fn device_renderer_refuses_oversized_blocks() {
        let viewport = Viewport::new(-2.0, 1.0, -1.0, 1.0).unwrap();
        let cap = IterationCap::new(5).unwrap();
        let config = LaunchConfig::new((1, 1), (2048, 1)).unwrap();
        let renderer = DeviceRenderer::new(open("emulated").unwrap(), config);
        let mut image = ImageBuffer::new(8, 8).unwrap();
        assert!(renderer.render(&viewport, &mut image, cap).unwrap_err().is_precondition());
    }
}
