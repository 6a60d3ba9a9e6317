//! # Reactor
//!
//! Wires devices, translators and the emitter together on a single-threaded
//! tokio runtime.
//!
//! ```text
//!  reader task (per device)            owner loop
//!  ------------------------            ----------
//!  AsyncFd readable                    select! {
//!    -> read_raw (full drain)            update  -> Translator::apply
//!    -> coalesce                         tick    -> Translator::tick -> Emitter
//!    -> DeviceUpdate::Input  ------>     ctrl_c  -> release all, exit
//!  read error                          }
//!    -> close                ------>
//!    -> DeviceUpdate::Disconnected
//! ```
//!
//! Only the owner loop touches translators and the emitter, so output is
//! serialized without locks.

use std::collections::BTreeMap;
use std::future::Future;

use tokio::io::unix::AsyncFd;
use tokio::io::Interest;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::controller::{coalesce, discover, Coalesced, JoystickDevice};
use crate::error::{BridgeError, Result};
use crate::layout::{Mapping, MappingStore};
use crate::output::uinput::UinputDevice;
use crate::output::x11::XTestPointer;
use crate::output::{Emitter, PointerServer, VirtualInput};
use crate::translator::{Timing, Translator};

/// Message from a reader task to the owner loop.
#[derive(Debug)]
pub enum DeviceUpdate {
    /// Coalesced result of one drain.
    Input { slot: usize, batch: Coalesced },
    /// The device failed and has been closed.
    Disconnected { slot: usize },
}

/// Per-device translators plus the shared emitter.
#[derive(Debug)]
pub struct Bridge<V: VirtualInput = UinputDevice, P: PointerServer = XTestPointer> {
    emitter: Emitter<V, P>,
    translators: BTreeMap<usize, (String, Translator)>,
    release_on_disconnect: bool,
}

impl<V: VirtualInput, P: PointerServer> Bridge<V, P> {
    /// Creates a bridge with no devices attached.
    pub fn new(emitter: Emitter<V, P>, release_on_disconnect: bool) -> Self {
        Self {
            emitter,
            translators: BTreeMap::new(),
            release_on_disconnect,
        }
    }

    /// Registers the translator of a newly opened device.
    pub fn attach(&mut self, slot: usize, name: impl Into<String>, translator: Translator) {
        self.translators.insert(slot, (name.into(), translator));
    }

    /// Number of devices still attached.
    #[must_use]
    pub fn device_count(&self) -> usize {
        self.translators.len()
    }

    /// The shared emitter.
    pub fn emitter(&self) -> &Emitter<V, P> {
        &self.emitter
    }

    /// Creates the synthetic device ahead of the first action.
    ///
    /// # Errors
    ///
    /// Returns `OutputDeviceFatal` if the device cannot be created.
    pub fn init(&mut self) -> Result<()> {
        self.emitter.init()
    }

    /// Applies one message from a reader task.
    ///
    /// # Errors
    ///
    /// Returns `OutputDeviceFatal` if releasing a disconnected device's
    /// outputs fails.
    pub fn handle_update(&mut self, update: DeviceUpdate) -> Result<()> {
        match update {
            DeviceUpdate::Input { slot, batch } => {
                if let Some((name, translator)) = self.translators.get_mut(&slot) {
                    debug!(
                        "{}: {} axis and {} button updates",
                        name,
                        batch.axes.len(),
                        batch.buttons.len()
                    );
                    translator.apply(&batch);
                }
                Ok(())
            }
            DeviceUpdate::Disconnected { slot } => {
                let Some((name, mut translator)) = self.translators.remove(&slot) else {
                    return Ok(());
                };
                warn!("{} disconnected", name);
                if self.release_on_disconnect {
                    for action in translator.release_all() {
                        self.emitter.emit(&action)?;
                    }
                }
                Ok(())
            }
        }
    }

    /// Advances every translator by one tick and emits the result.
    ///
    /// # Errors
    ///
    /// Returns `OutputDeviceFatal` on any output failure.
    pub fn tick(&mut self) -> Result<()> {
        for (_, translator) in self.translators.values_mut() {
            for action in translator.tick() {
                self.emitter.emit(&action)?;
            }
        }
        Ok(())
    }

    /// Releases every held output of every device.
    ///
    /// # Errors
    ///
    /// Returns `OutputDeviceFatal` on any output failure.
    pub fn shutdown(&mut self) -> Result<()> {
        for (_, translator) in self.translators.values_mut() {
            for action in translator.release_all() {
                self.emitter.emit(&action)?;
            }
        }
        Ok(())
    }
}

/// Reader task: drains one device on readiness until it fails.
async fn read_device(slot: usize, device: JoystickDevice, tx: mpsc::UnboundedSender<DeviceUpdate>) {
    let path = device.path().display().to_string();
    let mut fd = match AsyncFd::with_interest(device, Interest::READABLE) {
        Ok(fd) => fd,
        Err(e) => {
            warn!("Cannot watch {}: {}", path, e);
            let _ = tx.send(DeviceUpdate::Disconnected { slot });
            return;
        }
    };

    loop {
        let mut guard = match fd.readable_mut().await {
            Ok(guard) => guard,
            Err(e) => {
                warn!("Readiness error on {}: {}", path, e);
                break;
            }
        };
        match guard.get_inner_mut().read_raw() {
            Ok(events) => {
                guard.clear_ready();
                if events.is_empty() {
                    continue;
                }
                let batch = coalesce(events);
                if tx.send(DeviceUpdate::Input { slot, batch }).is_err() {
                    return;
                }
            }
            Err(e) => {
                debug!("Reader for {} stopping: {}", path, e);
                break;
            }
        }
    }

    // Deregister before the descriptor goes away.
    let mut device = fd.into_inner();
    device.close();
    let _ = tx.send(DeviceUpdate::Disconnected { slot });
}

/// Owner loop: runs until shutdown resolves or every device is gone.
///
/// # Errors
///
/// Returns the first output failure; held outputs are not released then,
/// since the output device is unusable.
pub async fn drive<V, P, S>(
    bridge: &mut Bridge<V, P>,
    mut rx: mpsc::UnboundedReceiver<DeviceUpdate>,
    timing: Timing,
    shutdown: S,
) -> Result<()>
where
    V: VirtualInput,
    P: PointerServer,
    S: Future<Output = ()>,
{
    let mut ticker = interval(timing.tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            Some(update) = rx.recv() => {
                bridge.handle_update(update)?;
                if bridge.device_count() == 0 {
                    info!("All devices disconnected, exiting");
                    break;
                }
            }

            _ = ticker.tick() => bridge.tick()?,

            _ = &mut shutdown => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    bridge.shutdown()
}

/// Opens the configured devices and runs until Ctrl+C or total disconnect.
///
/// # Errors
///
/// Returns `NoDevice` if no device could be opened, or `OutputDeviceFatal`
/// on any output failure.
pub async fn run(config: &Config) -> Result<()> {
    let paths = if config.devices.paths.is_empty() {
        discover(&config.devices.scan_dir, &config.devices.scan_prefix)?
    } else {
        config.devices.paths.clone()
    };

    let store = MappingStore::new(&config.layout.path);
    let timing = config.timing();
    let (tx, rx) = mpsc::unbounded_channel();
    let mut bridge: Bridge = Bridge::new(
        Emitter::new(config.output.device_name.clone()),
        config.output.release_on_disconnect,
    );

    for (slot, path) in paths.iter().enumerate() {
        let device = match JoystickDevice::open(path) {
            Ok(device) => device,
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };
        let ordinal = slot as u32 + 1;
        let mapping = store.load(device.identity(), ordinal).unwrap_or_else(|e| {
            warn!("Ignoring layout {}: {}", store.path().display(), e);
            Mapping::new(ordinal, Some(device.identity().to_string()))
        });
        let translator = Translator::new(&mapping, device.axis_count(), device.button_count(), timing);
        bridge.attach(slot, device.identity(), translator);
        tokio::spawn(read_device(slot, device, tx.clone()));
    }
    drop(tx);

    if bridge.device_count() == 0 {
        return Err(BridgeError::NoDevice(format!(
            "none of {} candidate node(s) could be opened",
            paths.len()
        )));
    }

    bridge.init()?;
    info!(
        "Translating {} device(s) every {:?}, press Ctrl+C to exit",
        bridge.device_count(),
        timing.tick
    );

    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    drive(&mut bridge, rx, timing, ctrl_c).await
}
