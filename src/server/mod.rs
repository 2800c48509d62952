//! Daemon Orchestration
//!
//! Wires the configured bus, input sink and keyboard device together, runs
//! the poll scheduler and the optional control socket, and tears everything
//! down on shutdown.
//!
//! # Architecture
//!
//! ```text
//! KbdServer
//!   ├─> LinuxI2cBus (/dev/i2c-N, keyboard controller)
//!   ├─> UinputSink (virtual keyboard + relative pointer) or TracingSink
//!   ├─> AttachedDevice (PollScheduler driving KeyboardDevice)
//!   └─> ControlServer (attribute access over a Unix socket)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use picocalc_kbd::config::Config;
//! use picocalc_kbd::server::KbdServer;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml")?;
//!     let server = KbdServer::new(config).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod control;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub use control::{handle_command, ControlServer, StatusReport};

use crate::config::Config;
use crate::device::i2c::LinuxI2cBus;
use crate::device::uinput::{UinputSink, UINPUT_PATH};
use crate::device::{bus, AttachedDevice, BootClock, DeviceAttributes, DeviceContext, KeyboardDevice, SharedBus};
use crate::input::dispatcher::KeyEventDispatcher;
use crate::input::mapper::ScancodeTable;
use crate::input::sink::{InputSink, TracingSink};

/// Running keyboard daemon
#[derive(Debug)]
pub struct KbdServer {
    config: Config,
    device: AttachedDevice,
    control: Option<JoinHandle<()>>,
    shutdown: CancellationToken,
}

impl KbdServer {
    /// Open the hardware described by `config` and start polling
    pub async fn new(config: Config) -> Result<Self> {
        info!("Initializing keyboard daemon");

        let bus = LinuxI2cBus::open(&config.bus.device, config.bus.address).context(format!(
            "Failed to open keyboard controller on {} at 0x{:02X}",
            config.bus.device.display(),
            config.bus.address
        ))?;
        info!(
            "Keyboard controller bus: {} @ 0x{:02X}",
            config.bus.device.display(),
            config.bus.address
        );

        let sink: Box<dyn InputSink> = if config.input.dry_run {
            info!("Dry run: input events are logged, not injected");
            Box::new(TracingSink)
        } else {
            let sink = UinputSink::create(&config.device_identity(), ScancodeTable::picocalc())
                .context(format!("Failed to create uinput device through {}", UINPUT_PATH))?;
            info!("Virtual input device '{}' created", config.input.name);
            Box::new(sink)
        };

        Self::with_parts(config, bus::shared(bus), sink)
    }

    /// Start the daemon over an already opened bus and sink
    ///
    /// Must be called from within a tokio runtime.
    pub fn with_parts(config: Config, bus: SharedBus, sink: Box<dyn InputSink>) -> Result<Self> {
        let dispatcher = KeyEventDispatcher::default();
        let mut context = DeviceContext::new(dispatcher, config.acceleration());
        context.mouse_mut().set_enabled(config.mouse.start_enabled);

        let device = KeyboardDevice::new(bus, sink, Arc::new(BootClock), context);
        let device = device
            .attach(config.poll_period())
            .context("Failed to start polling the keyboard")?;

        let shutdown = CancellationToken::new();
        let control = if config.control.enabled {
            let server = ControlServer::bind(&config.control, device.attributes().clone())?;
            Some(tokio::spawn(server.run(shutdown.clone())))
        } else {
            info!("Control socket disabled in configuration");
            None
        };

        info!("Keyboard daemon initialized");

        Ok(Self {
            config,
            device,
            control,
            shutdown,
        })
    }

    /// Attribute handle for the attached keyboard
    pub fn attributes(&self) -> &DeviceAttributes {
        self.device.attributes()
    }

    /// Token that stops [`run`](Self::run) when cancelled
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Run until SIGINT, SIGTERM or the shutdown token
    pub async fn run(self) -> Result<()> {
        info!("╔════════════════════════════════════════════════════════════╗");
        info!("║          picocalc-kbd is Running                           ║");
        info!("╚════════════════════════════════════════════════════════════╝");
        info!("  Bus: {} @ 0x{:02X}", self.config.bus.device.display(), self.config.bus.address);
        info!("  Poll period: {:?}", self.config.poll_period());
        info!("  Mouse mode at start: {}", self.config.mouse.start_enabled);
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .context("Failed to install SIGTERM handler")?;

        tokio::select! {
            _ = self.shutdown.cancelled() => info!("Shutdown requested"),
            _ = tokio::signal::ctrl_c() => info!("Received SIGINT"),
            _ = sigterm.recv() => info!("Received SIGTERM"),
        }

        self.shutdown().await;
        Ok(())
    }

    /// Stop the control socket, then detach the keyboard
    pub async fn shutdown(self) {
        info!("Initiating graceful shutdown");
        self.shutdown.cancel();

        if let Some(control) = self.control {
            if let Err(e) = control.await {
                warn!("Control socket task ended abnormally: {}", e);
            }
        }

        match self.device.detach().await {
            Some(device) => {
                let stats = device.stats().snapshot();
                info!(
                    "Processed {} cycles, {} entries, {} bus errors",
                    stats.cycles, stats.entries, stats.bus_errors
                );
                debug!("Releasing uinput device");
            }
            None => warn!("Poll task did not return the device"),
        }

        info!("Keyboard daemon shutdown complete");
    }
}
