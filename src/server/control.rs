//! Control Socket
//!
//! Line-oriented Unix socket exposing the device attributes.
//!
//! ```text
//! get battery_percent          → ok 87
//! get last_keypress            → ok 1532
//! set keyboard_backlight 128   → ok
//! set screen_backlight 300     → err Invalid parameter: expected 0-255, got "300"
//! list                         → ok battery_percent:444 screen_backlight:220 ...
//! status                       → ok {"attached":true,"stats":{...}}
//! ```

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use nix::unistd::{chown, Gid};
use serde::Serialize;
use tokio::net::{UnixListener, UnixStream};
use tokio_util::codec::{Framed, LinesCodec};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::ControlConfig;
use crate::device::{Attribute, DeviceAttributes, StatsSnapshot};

/// Longest accepted request line
const MAX_LINE_LENGTH: usize = 256;

/// Socket file permissions
const SOCKET_MODE: u32 = 0o660;

/// Body of a `status` reply
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    /// Device still attached
    pub attached: bool,
    /// Idle time in milliseconds
    pub last_keypress_ms: i64,
    /// Poll counters
    pub stats: StatsSnapshot,
}

/// Execute one request line and render the reply
pub fn handle_command(attrs: &DeviceAttributes, line: &str) -> String {
    let mut parts = line.split_whitespace();
    let reply = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some("get"), Some(name), None, None) => name
            .parse::<Attribute>()
            .and_then(|attr| attrs.read(attr))
            .map(|value| format!("ok {}", value)),
        (Some("set"), Some(name), Some(value), None) => name
            .parse::<Attribute>()
            .and_then(|attr| attrs.write(attr, value))
            .map(|_| "ok".to_string()),
        (Some("list"), None, None, None) => {
            let listing: Vec<String> = Attribute::ALL
                .iter()
                .map(|attr| format!("{}:{:o}", attr, attr.mode()))
                .collect();
            Ok(format!("ok {}", listing.join(" ")))
        }
        (Some("status"), None, None, None) => {
            let report = StatusReport {
                attached: attrs.is_attached(),
                last_keypress_ms: attrs.last_keypress_ms(),
                stats: attrs.stats(),
            };
            return match serde_json::to_string(&report) {
                Ok(json) => format!("ok {}", json),
                Err(e) => format!("err {}", e),
            };
        }
        _ => return format!("err unknown command: {}", line.trim()),
    };

    reply.unwrap_or_else(|e| format!("err {}", e))
}

/// Bound control socket
#[derive(Debug)]
pub struct ControlServer {
    listener: UnixListener,
    path: PathBuf,
    attrs: DeviceAttributes,
}

impl ControlServer {
    /// Bind the socket, replacing a stale one, and apply ownership
    pub fn bind(config: &ControlConfig, attrs: DeviceAttributes) -> Result<Self> {
        let path = config.socket_path.clone();

        if path.exists() {
            std::fs::remove_file(&path)
                .context(format!("Failed to remove stale socket {}", path.display()))?;
        }

        let listener = UnixListener::bind(&path)
            .context(format!("Failed to bind control socket {}", path.display()))?;

        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(SOCKET_MODE))
            .context("Failed to set control socket permissions")?;

        if config.gid != 0 {
            chown(&path, None, Some(Gid::from_raw(config.gid)))
                .context(format!("Failed to set control socket group {}", config.gid))?;
        }

        info!("Control socket listening on {}", path.display());

        Ok(Self {
            listener,
            path,
            attrs,
        })
    }

    /// Socket path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Accept clients until `cancel` fires, then remove the socket file
    pub async fn run(self, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, _)) => {
                        let attrs = self.attrs.clone();
                        let cancel = cancel.clone();
                        tokio::spawn(async move {
                            if let Err(e) = serve_client(stream, attrs, cancel).await {
                                debug!("Control client closed: {:#}", e);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Control socket accept failed: {}", e);
                    }
                },
            }
        }

        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!("Failed to remove control socket {}: {}", self.path.display(), e);
        }
        info!("Control socket closed");
    }
}

async fn serve_client(stream: UnixStream, attrs: DeviceAttributes, cancel: CancellationToken) -> Result<()> {
    let mut framed = Framed::new(stream, LinesCodec::new_with_max_length(MAX_LINE_LENGTH));

    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            next = framed.next() => match next {
                Some(line) => line.context("Failed to read request")?,
                None => return Ok(()),
            },
        };

        if line.trim().is_empty() {
            continue;
        }
        debug!("Control request: {}", line);

        // attribute access takes the bus lock; keep it off the async workers
        let attrs = attrs.clone();
        let reply = tokio::task::spawn_blocking(move || handle_command(&attrs, &line))
            .await
            .context("Control request task failed")?;

        framed.send(reply).await.context("Failed to send reply")?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::bus::{shared, RegisterBus, SimulatedBus, REG_BATTERY, REG_SCREEN_BACKLIGHT};
    use crate::device::{DeviceContext, KeyboardDevice, ManualClock};
    use crate::input::sink::RecordingSink;
    use std::sync::Arc;

    fn attrs_with(bus: SimulatedBus) -> (DeviceAttributes, crate::device::SharedBus) {
        let bus = shared(bus);
        let device = KeyboardDevice::new(
            Arc::clone(&bus),
            Box::new(RecordingSink::new()),
            Arc::new(ManualClock::new(0)),
            DeviceContext::default(),
        );
        (device.attributes(), bus)
    }

    #[test]
    fn test_commands_on_detached_device() {
        let (attrs, _) = attrs_with(SimulatedBus::new());

        assert_eq!(handle_command(&attrs, "get last_keypress"), "ok -1");
        assert!(handle_command(&attrs, "get battery_percent").starts_with("err Device not attached"));
        assert!(handle_command(&attrs, "status").starts_with("ok {\"attached\":false"));
    }

    #[test]
    fn test_unknown_and_malformed() {
        let (attrs, _) = attrs_with(SimulatedBus::new());

        assert_eq!(handle_command(&attrs, "reboot"), "err unknown command: reboot");
        assert_eq!(handle_command(&attrs, "get"), "err unknown command: get");
        assert!(handle_command(&attrs, "get volume").starts_with("err Unknown attribute"));
        assert!(handle_command(&attrs, "set battery_percent 5").contains("not writable"));
        assert!(handle_command(&attrs, "get screen_backlight").contains("not readable"));
    }

    #[test]
    fn test_list() {
        let (attrs, _) = attrs_with(SimulatedBus::new());
        assert_eq!(
            handle_command(&attrs, "list"),
            "ok battery_percent:444 screen_backlight:220 last_keypress:444 keyboard_backlight:220"
        );
    }

    #[tokio::test]
    async fn test_socket_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let config = ControlConfig {
            enabled: true,
            socket_path: dir.path().join("kbd.sock"),
            gid: 0,
        };

        let mut bus = SimulatedBus::new();
        bus.set_register(REG_BATTERY, 64);
        let bus = shared(bus);
        let device = KeyboardDevice::new(
            Arc::clone(&bus),
            Box::new(RecordingSink::new()),
            Arc::new(ManualClock::new(0)),
            DeviceContext::default(),
        );
        let attached = device.attach(crate::device::DEFAULT_POLL_PERIOD).unwrap();

        let server = ControlServer::bind(&config, attached.attributes().clone()).unwrap();
        let mode = std::fs::metadata(server.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, SOCKET_MODE);

        let cancel = CancellationToken::new();
        let task = tokio::spawn(server.run(cancel.clone()));

        let stream = UnixStream::connect(&config.socket_path).await.unwrap();
        let mut client = Framed::new(stream, LinesCodec::new());

        client.send("get battery_percent").await.unwrap();
        assert_eq!(client.next().await.unwrap().unwrap(), "ok 64");

        client.send("set screen_backlight 40").await.unwrap();
        assert_eq!(client.next().await.unwrap().unwrap(), "ok");
        assert_eq!(bus.lock().read_u8(REG_SCREEN_BACKLIGHT).unwrap(), 40);

        cancel.cancel();
        task.await.unwrap();
        assert!(!config.socket_path.exists());

        attached.detach().await;
    }
}
