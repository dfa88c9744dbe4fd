//! Sysfs GPIO edge detection.
//!
//! Converts a host GPIO line into a stream of edge events by exporting the
//! line, arming its edge trigger, and running a dedicated thread that
//! blocks in `poll(2)` on the line's value file waiting for priority
//! conditions.

use crate::consts;
use crate::error::{Error, Result};
use crate::events::{lock, EdgeEvent, ListenerId, ListenerRegistry};
use crate::sys;
use log::{debug, error, trace, warn};
use std::fs::{self, File};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Which signal edges on the GPIO line raise an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeMode {
    None,
    Rising,
    Falling,
    Both,
}

impl EdgeMode {
    fn as_sysfs(self) -> &'static str {
        match self {
            EdgeMode::None => "none",
            EdgeMode::Rising => "rising",
            EdgeMode::Falling => "falling",
            EdgeMode::Both => "both",
        }
    }
}

/// Delay after exporting a line before the sysfs attribute files are
/// reliably writable.
const EXPORT_SETTLE: Duration = Duration::from_millis(50);

/// Transient poll-loop failures retried before the loop gives up.
const MAX_POLL_RETRIES: u32 = 3;

/// Pause between poll-loop retries after a transient failure.
const POLL_RETRY_DELAY: Duration = Duration::from_millis(10);

/// Options for constructing a [`GpioEdgeDetector`].
#[derive(Debug, Clone)]
pub struct EdgeDetectorOptions {
    /// Sysfs GPIO control directory. Overridable for tests and alternate
    /// mounts.
    pub gpio_root: PathBuf,
    /// Poll timeout; `None` blocks indefinitely in the kernel. A loop
    /// blocked without a timeout cannot be interrupted by `stop`/drop.
    pub poll_timeout: Option<Duration>,
}

impl Default for EdgeDetectorOptions {
    fn default() -> Self {
        Self {
            gpio_root: PathBuf::from(consts::DEFAULT_GPIO_ROOT),
            poll_timeout: None,
        }
    }
}

impl EdgeDetectorOptions {
    /// Sets the sysfs GPIO control directory.
    pub fn with_gpio_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.gpio_root = root.into();
        self
    }

    /// Sets a finite poll timeout, making teardown able to wait for the
    /// poll loop to exit.
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = Some(timeout);
        self
    }
}

/// Watches one interrupt-capable GPIO line and raises an [`EdgeEvent`]
/// whenever the kernel reports a priority-edge condition on it.
///
/// Constructing with [`EdgeMode::None`] unexports the line (best effort)
/// and starts no polling. Dropping an armed detector stops the poll loop
/// (waiting for it only when the poll timeout is finite) and unexports the
/// line again.
pub struct GpioEdgeDetector {
    pin: u8,
    armed: bool,
    gpio_root: PathBuf,
    poll_timeout: Option<Duration>,
    stop: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
    listeners: Arc<ListenerRegistry<EdgeEvent>>,
    // The poll thread holds its own clone so the descriptor outlives us
    // when an infinite-timeout loop cannot be joined.
    value_file: Option<Arc<File>>,
}

impl GpioEdgeDetector {
    /// Opens a detector on the given host GPIO line with default options.
    pub fn open(pin: u8, edge: EdgeMode) -> Result<Self> {
        Self::open_with(pin, edge, EdgeDetectorOptions::default())
    }

    /// Opens a detector on the given host GPIO line.
    pub fn open_with(pin: u8, edge: EdgeMode, options: EdgeDetectorOptions) -> Result<Self> {
        let root = options.gpio_root.clone();
        if edge == EdgeMode::None {
            // Line may already be unexported; nothing to detect either way.
            if let Err(e) = fs::write(root.join("unexport"), pin.to_string()) {
                debug!("unexport of gpio{} failed (ignored): {}", pin, e);
            }
            return Ok(Self {
                pin,
                armed: false,
                gpio_root: root,
                poll_timeout: options.poll_timeout,
                stop: Arc::new(AtomicBool::new(false)),
                worker: Mutex::new(None),
                listeners: Arc::new(ListenerRegistry::new()),
                value_file: None,
            });
        }

        let line_dir = root.join(format!("gpio{}", pin));
        if let Err(e) = fs::write(root.join("export"), pin.to_string()) {
            if !line_dir.exists() {
                return Err(Error::OpenFailed {
                    path: root.join("export").display().to_string(),
                    source: e,
                });
            }
            debug!("gpio{} already exported: {}", pin, e);
        }
        thread::sleep(EXPORT_SETTLE);

        write_attr(&line_dir, "direction", "in")?;
        write_attr(&line_dir, "edge", edge.as_sysfs())?;

        let value_path = line_dir.join("value");
        let file = File::open(&value_path).map_err(|source| Error::OpenFailed {
            path: value_path.display().to_string(),
            source,
        })?;
        // Discard anything pending so no stale edge is reported.
        sys::drain(&file)?;
        let file = Arc::new(file);

        debug!("armed gpio{} for {} edges", pin, edge.as_sysfs());

        let stop = Arc::new(AtomicBool::new(false));
        let listeners = Arc::new(ListenerRegistry::new());
        let timeout_ms = options
            .poll_timeout
            .map_or(-1, |t| t.as_millis().min(i32::MAX as u128) as i32);
        let worker = {
            let stop = Arc::clone(&stop);
            let file = Arc::clone(&file);
            let listeners = Arc::clone(&listeners);
            thread::Builder::new()
                .name(format!("gpio{}-edge", pin))
                .spawn(move || poll_loop(pin, &file, timeout_ms, &stop, &listeners))
                .map_err(Error::Io)?
        };

        Ok(Self {
            pin,
            armed: true,
            gpio_root: root,
            poll_timeout: options.poll_timeout,
            stop,
            worker: Mutex::new(Some(worker)),
            listeners,
            value_file: Some(file),
        })
    }

    /// The host GPIO line this detector watches.
    pub fn pin(&self) -> u8 {
        self.pin
    }

    /// Whether a poll loop is running for this detector.
    pub fn is_polling(&self) -> bool {
        lock(&self.worker)
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Registers a callback fired once per detected edge, on the poll
    /// loop's thread.
    pub fn watch_edges(&self, callback: Box<dyn Fn(&EdgeEvent) + Send>) -> ListenerId {
        self.listeners.add(callback)
    }

    /// Removes a previously registered edge callback.
    pub fn unwatch_edges(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }
}

impl Drop for GpioEdgeDetector {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = lock(&self.worker).take() {
            if self.poll_timeout.is_some() {
                // The loop wakes at the next timeout and observes the flag.
                let _ = handle.join();
            }
            // Infinite timeout: the loop may be parked in the syscall and
            // cannot be interrupted; leave the thread to exit on the next
            // edge. It owns a clone of the value file, so the descriptor
            // stays valid until then.
        }
        self.value_file = None;
        if self.armed {
            if let Err(e) = fs::write(self.gpio_root.join("unexport"), self.pin.to_string()) {
                warn!("failed to unexport gpio{}: {}", self.pin, e);
            }
        }
    }
}

fn write_attr(line_dir: &Path, attr: &str, value: &str) -> Result<()> {
    let path = line_dir.join(attr);
    fs::write(&path, value).map_err(|source| Error::OpenFailed {
        path: path.display().to_string(),
        source,
    })
}

fn poll_loop(
    pin: u8,
    file: &File,
    timeout_ms: i32,
    stop: &AtomicBool,
    listeners: &ListenerRegistry<EdgeEvent>,
) {
    let fd = file.as_raw_fd();
    let mut failures = 0u32;
    while !stop.load(Ordering::SeqCst) {
        let pending = match sys::poll_priority(fd, timeout_ms) {
            Ok(pending) => pending,
            Err(e) => {
                failures += 1;
                if failures > MAX_POLL_RETRIES {
                    error!("gpio{} poll loop giving up after {} failures: {}", pin, failures, e);
                    return;
                }
                warn!("gpio{} poll failed (attempt {}): {}", pin, failures, e);
                thread::sleep(POLL_RETRY_DELAY);
                continue;
            }
        };
        if !pending {
            failures = 0;
            continue;
        }
        // Reading to EOF clears the kernel-side condition; the value
        // itself is not interesting here.
        if let Err(e) = sys::drain(file) {
            failures += 1;
            if failures > MAX_POLL_RETRIES {
                error!("gpio{} drain giving up after {} failures: {}", pin, failures, e);
                return;
            }
            warn!("gpio{} drain failed (attempt {}): {}", pin, failures, e);
            thread::sleep(POLL_RETRY_DELAY);
            continue;
        }
        failures = 0;
        trace!("gpio{} edge", pin);
        listeners.emit(&EdgeEvent { pin });
    }
}
