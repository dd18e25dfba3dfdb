use std::panic::Location;
use std::sync::atomic::{AtomicU64, Ordering};

use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::buffer::{DeviceBuffer, Element};
use crate::error::DeviceError;

/// Default number of work items reduced into a single partial result.
pub const DEFAULT_WORK_GROUP_SIZE: usize = 64;

#[derive(Debug, Clone, Copy)]
pub struct DeviceConfig {
    /// Number of compute units. `None` uses every logical core.
    pub threads: Option<usize>,
    pub work_group_size: usize,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            threads: None,
            work_group_size: DEFAULT_WORK_GROUP_SIZE,
        }
    }
}

/// Data-parallel compute device.
///
/// Kernels are launched through [`Device::launch`], which blocks until every
/// work item has finished. Launches issued from one thread therefore execute
/// strictly in program order, like a single in-order queue.
pub struct Device {
    pool: ThreadPool,
    work_group_size: usize,
    launches: AtomicU64,
}

impl Device {
    pub fn new(config: DeviceConfig) -> Result<Self, DeviceError> {
        let threads = config.threads.unwrap_or_else(num_cpus::get).max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("compute-{}", i))
            .build()?;

        Ok(Self {
            pool,
            work_group_size: config.work_group_size.max(1),
            launches: AtomicU64::new(0),
        })
    }

    pub fn compute_units(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn work_group_size(&self) -> usize {
        self.work_group_size
    }

    /// Number of work groups needed to cover `work_items`.
    pub fn work_groups(&self, work_items: usize) -> usize {
        work_items.div_ceil(self.work_group_size)
    }

    /// Total kernels launched on this device.
    pub fn launches(&self) -> u64 {
        self.launches.load(Ordering::Relaxed)
    }

    /// Allocates a zero-filled buffer of `len` elements in device memory.
    #[track_caller]
    pub fn alloc<T: Element>(
        &self,
        label: &'static str,
        len: usize,
    ) -> Result<DeviceBuffer<T>, DeviceError> {
        let location = Location::caller();
        let bytes = len.saturating_mul(std::mem::size_of::<T>());

        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|_| DeviceError::Allocation {
                label,
                bytes,
                location,
            })?;
        data.resize(len, T::default());

        log::debug!("Allocated `{}`: {} elements ({} bytes)", label, len, bytes);

        Ok(DeviceBuffer::new(label, data))
    }

    /// Allocates a buffer and fills it from host memory.
    #[track_caller]
    pub fn upload<T: Element>(
        &self,
        label: &'static str,
        host: &[T],
    ) -> Result<DeviceBuffer<T>, DeviceError> {
        let mut buffer = self.alloc(label, host.len())?;
        buffer.copy_from_host(host)?;
        Ok(buffer)
    }

    /// Runs `body` on the compute pool and waits for it to finish.
    ///
    /// `body` is expected to spread `work_items` independent work items over
    /// the pool with rayon's parallel iterators.
    pub fn launch<F, R>(&self, kernel: &'static str, work_items: usize, body: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        log::trace!("launch `{}` over {} work items", kernel, work_items);
        let result = self.pool.install(body);
        self.launches.fetch_add(1, Ordering::Relaxed);
        result
    }
}
