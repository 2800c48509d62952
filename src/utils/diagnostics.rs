//! System Diagnostics
//!
//! Startup diagnostics for the environment the daemon runs in.

use std::path::{Path, PathBuf};
use sysinfo::System;
use tracing::{info, warn};

use crate::config::Config;
use crate::device::uinput::UINPUT_PATH;

/// System information for diagnostics
#[derive(Debug, Clone)]
pub struct SystemInfo {
    /// Operating system name (e.g., "Linux", "Debian")
    pub os_name: String,
    /// Operating system version string
    pub os_version: String,

    /// Kernel version string
    pub kernel_version: String,

    /// Number of logical CPU cores
    pub cpu_count: usize,

    /// Total system memory in megabytes
    pub total_memory_mb: u64,

    /// System hostname
    pub hostname: String,
}

impl SystemInfo {
    /// Gather system information
    pub fn gather() -> Self {
        let mut sys = System::new();
        sys.refresh_cpu();
        sys.refresh_memory();

        Self {
            os_name: System::name().unwrap_or_else(|| "Unknown".to_string()),
            os_version: System::os_version().unwrap_or_else(|| "Unknown".to_string()),
            kernel_version: System::kernel_version().unwrap_or_else(|| "Unknown".to_string()),
            cpu_count: sys.cpus().len(),
            total_memory_mb: sys.total_memory() / 1024 / 1024,
            hostname: System::host_name().unwrap_or_else(|| "Unknown".to_string()),
        }
    }

    /// Log system information
    pub fn log(&self) {
        info!("=== System Information ===");
        info!("  OS: {} {}", self.os_name, self.os_version);
        info!("  Kernel: {}", self.kernel_version);
        info!("  Hostname: {}", self.hostname);
        info!("  CPUs: {}", self.cpu_count);
        info!("  Memory: {} MB", self.total_memory_mb);
    }
}

/// I²C character devices present under `dev_dir`, sorted
pub fn detect_i2c_buses(dev_dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dev_dir) else {
        return Vec::new();
    };

    let mut buses: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with("i2c-"))
        })
        .collect();
    buses.sort();
    buses
}

/// Log complete diagnostics on startup
pub fn log_startup_diagnostics(config: &Config) {
    info!("╔════════════════════════════════════════════════════════════╗");
    info!("║          Startup Diagnostics                              ║");
    info!("╚════════════════════════════════════════════════════════════╝");

    SystemInfo::gather().log();

    info!("=== Devices ===");
    let buses = detect_i2c_buses(Path::new("/dev"));
    if buses.is_empty() {
        warn!("  I2C buses: none found (is i2c-dev loaded?)");
    } else {
        let names: Vec<String> = buses.iter().map(|p| p.display().to_string()).collect();
        info!("  I2C buses: {}", names.join(", "));
    }
    if !config.bus.device.exists() {
        warn!("  Configured bus {} does not exist", config.bus.device.display());
    }

    if config.input.dry_run {
        info!("  uinput: not used (dry run)");
    } else if Path::new(UINPUT_PATH).exists() {
        info!("  uinput: {}", UINPUT_PATH);
    } else {
        warn!("  uinput: {} missing (modprobe uinput?)", UINPUT_PATH);
    }

    info!("=== Keyboard ===");
    info!("  Controller: {} @ 0x{:02X}", config.bus.device.display(), config.bus.address);
    info!("  Poll period: {:?}", config.poll_period());
    info!(
        "  Mouse fast-move threshold: {} ms",
        config.mouse.fast_move_threshold_ms
    );
    if config.control.enabled {
        info!("  Control socket: {}", config.control.socket_path.display());
    }
}
