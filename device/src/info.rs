use crate::device::Device;

/// Capability report for a [`Device`]. Informational only.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub compute_units: usize,
    pub logical_cores: usize,
    pub physical_cores: usize,
    pub work_group_size: usize,
}

impl DeviceInfo {
    pub fn query(device: &Device) -> Self {
        Self {
            compute_units: device.compute_units(),
            logical_cores: num_cpus::get(),
            physical_cores: num_cpus::get_physical(),
            work_group_size: device.work_group_size(),
        }
    }

    pub fn log(&self) {
        log::info!("Device: data-parallel CPU pool");
        log::info!("  Compute units:   {}", self.compute_units);
        log::info!(
            "  Host cores:      {} logical, {} physical",
            self.logical_cores,
            self.physical_cores
        );
        log::info!("  Work group size: {}", self.work_group_size);
    }
}
