// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A software accelerator.  It keeps its own memory pool, separate
//! from any host buffer and addressed only through handles, and it
//! runs a launch the way the geometry describes: blocks are handed out
//! to a pool of worker threads, and each block runs its threads one
//! after another.  The launch returns only when every block is done.

extern crate crossbeam;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use buffer::ImageBuffer;
use errors::{MandelError, Result};

use super::kernel::{DeviceMemory, Kernel};
use super::launch::LaunchConfig;
use super::{Device, DeviceBuffer};

/// Device memory available to a default emulated device, in bytes.
pub const DEFAULT_CAPACITY: usize = 256 * 1024 * 1024;

/// The largest block an emulated device will run.
pub const MAX_THREADS_PER_BLOCK: usize = 1024;

static NEXT_ORDINAL: AtomicUsize = AtomicUsize::new(1);

struct Allocation {
    width: usize,
    height: usize,
    cells: Arc<Vec<AtomicU8>>,
}

#[derive(Default)]
struct MemoryPool {
    next_handle: u64,
    used: usize,
    allocations: HashMap<u64, Allocation>,
}

/// A device that executes kernels on host threads.
pub struct EmulatedDevice {
    ordinal: usize,
    name: String,
    capacity: usize,
    workers: usize,
    pool: Mutex<MemoryPool>,
}

impl EmulatedDevice {
    /// A device with `DEFAULT_CAPACITY` bytes of memory and one
    /// worker per logical CPU.
    pub fn new() -> EmulatedDevice {
        EmulatedDevice::with_capacity(DEFAULT_CAPACITY)
    }

    /// A device with `capacity` bytes of memory.
    pub fn with_capacity(capacity: usize) -> EmulatedDevice {
        let ordinal = NEXT_ORDINAL.fetch_add(1, Ordering::Relaxed);
        EmulatedDevice {
            ordinal,
            name: format!("emulated:{}", ordinal),
            capacity,
            workers: num_cpus::get().max(1),
            pool: Mutex::new(MemoryPool::default()),
        }
    }

    /// Use `workers` host threads to run blocks.
    pub fn with_workers(mut self, workers: usize) -> EmulatedDevice {
        self.workers = workers.max(1);
        self
    }

    /// Total device memory, in bytes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Device memory currently allocated, in bytes.
    pub fn used(&self) -> Result<usize> {
        Ok(self.pool()?.used)
    }

    fn pool(&self) -> Result<MutexGuard<MemoryPool>> {
        self.pool
            .lock()
            .map_err(|_| MandelError::resource(format!("{} memory pool is poisoned", self.name)))
    }

    fn check_owner(&self, buffer: &DeviceBuffer) -> Result<()> {
        if buffer.device != self.ordinal {
            return Err(MandelError::resource(format!(
                "handle {} belongs to emulated:{}, not {}",
                buffer.id, buffer.device, self.name
            )));
        }
        Ok(())
    }

    /// The storage behind `buffer`, checked against the handle's shape.
    fn cells(&self, buffer: &DeviceBuffer) -> Result<Arc<Vec<AtomicU8>>> {
        self.check_owner(buffer)?;
        let pool = self.pool()?;
        let allocation = pool.allocations.get(&buffer.id).ok_or_else(|| {
            MandelError::resource(format!("handle {} is not allocated on {}", buffer.id, self.name))
        })?;
        if allocation.width != buffer.width || allocation.height != buffer.height {
            return Err(MandelError::resource(format!(
                "handle {} describes a {}x{} buffer, but {}x{} is allocated",
                buffer.id, buffer.width, buffer.height, allocation.width, allocation.height
            )));
        }
        Ok(allocation.cells.clone())
    }
}

impl Default for EmulatedDevice {
    fn default() -> Self {
        EmulatedDevice::new()
    }
}

impl Device for EmulatedDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn max_threads_per_block(&self) -> usize {
        MAX_THREADS_PER_BLOCK
    }

    fn allocate_and_upload(&self, host: &ImageBuffer) -> Result<DeviceBuffer> {
        let bytes = host.len();
        let mut pool = self.pool()?;
        let available = self.capacity - pool.used;
        if bytes > available {
            return Err(MandelError::resource(format!(
                "out of device memory on {}: {} bytes requested, {} of {} free",
                self.name, bytes, available, self.capacity
            )));
        }

        let mut cells: Vec<AtomicU8> = Vec::new();
        cells.try_reserve_exact(bytes).map_err(|e| {
            MandelError::resource(format!("could not allocate {} bytes: {:?}", bytes, e))
        })?;
        cells.extend(host.as_slice().iter().map(|p| AtomicU8::new(*p)));

        let id = pool.next_handle;
        pool.next_handle += 1;
        pool.used += bytes;
        pool.allocations.insert(
            id,
            Allocation {
                width: host.width(),
                height: host.height(),
                cells: Arc::new(cells),
            },
        );
        debug!(
            "{}: allocated handle {} ({}x{}, {} bytes, {} in use)",
            self.name,
            id,
            host.width(),
            host.height(),
            bytes,
            pool.used
        );

        Ok(DeviceBuffer {
            device: self.ordinal,
            id,
            width: host.width(),
            height: host.height(),
        })
    }

    fn launch(&self, config: &LaunchConfig, kernel: &dyn Kernel, buffer: &DeviceBuffer) -> Result<()> {
        if config.threads_per_block() > MAX_THREADS_PER_BLOCK {
            return Err(MandelError::precondition(format!(
                "blocks of {} threads exceed the {} thread limit of {}",
                config.threads_per_block(),
                MAX_THREADS_PER_BLOCK,
                self.name
            )));
        }

        let cells = self.cells(buffer)?;
        let memory = DeviceMemory::new(&cells, buffer.width, buffer.height);
        let workers = self.workers.min(config.block_count());
        debug!(
            "{}: launching {}x{} blocks of {}x{} threads over handle {} on {} workers",
            self.name,
            config.grid().x,
            config.grid().y,
            config.block().x,
            config.block().y,
            buffer.id,
            workers
        );

        let blocks = Mutex::new(config.blocks());
        let blocks = &blocks;
        let memory = &memory;
        crossbeam::scope(|spawner| {
            for worker in 0..workers {
                spawner.spawn(move |_| {
                    let mut done = 0;
                    loop {
                        let next = match blocks.lock() {
                            Ok(mut queue) => queue.next(),
                            Err(_) => break,
                        };
                        match next {
                            Some(block_idx) => {
                                for thread in config.block_threads(block_idx) {
                                    kernel.execute(&thread, memory);
                                }
                                done += 1;
                            }
                            None => break,
                        }
                    }
                    trace!("worker {} ran {} blocks", worker, done);
                });
            }
        })
        .map_err(|_| MandelError::WorkerPanicked)
    }

    fn download_into(&self, buffer: &DeviceBuffer, host: &mut ImageBuffer) -> Result<()> {
        if host.width() != buffer.width || host.height() != buffer.height {
            return Err(MandelError::resource(format!(
                "cannot download a {}x{} device buffer into a {}x{} host buffer",
                buffer.width,
                buffer.height,
                host.width(),
                host.height()
            )));
        }
        let cells = self.cells(buffer)?;
        for (pixel, cell) in host.as_mut_slice().iter_mut().zip(cells.iter()) {
            *pixel = cell.load(Ordering::Relaxed);
        }
        debug!("{}: downloaded handle {}", self.name, buffer.id);
        Ok(())
    }

    fn release(&self, buffer: DeviceBuffer) -> Result<()> {
        self.check_owner(&buffer)?;
        let mut pool = self.pool()?;
        match pool.allocations.remove(&buffer.id) {
            Some(allocation) => {
                pool.used -= allocation.cells.len();
                debug!(
                    "{}: released handle {} ({} bytes in use)",
                    self.name, buffer.id, pool.used
                );
                Ok(())
            }
            None => Err(MandelError::resource(format!(
                "handle {} is not allocated on {}",
                buffer.id, self.name
            ))),
        }
    }
}
