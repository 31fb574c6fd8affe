//! Sysfs GPIO glue for the edge-triggered wind and rain sensors
//!
//! Arms a falling-edge interrupt on a pin and invokes a callback once per
//! edge. The callback runs on a dedicated watcher thread, so it must only
//! touch interrupt-safe state (in practice: `TickCounter::increment`).

use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use log::warn;

const GPIO_BASE: &str = "/sys/class/gpio";
/// Pause before retrying after an I/O error, so a wedged pin cannot spin
/// the watcher thread.
const ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// A single exported input pin with falling-edge detection.
pub struct EdgePin {
    pin: u8,
    value_path: PathBuf,
}

impl EdgePin {
    /// Export the pin and configure it as a falling-edge input.
    pub fn open(pin: u8) -> io::Result<Self> {
        Self::open_at(Path::new(GPIO_BASE), pin)
    }

    /// A pin left exported by a previous run is reused as-is; only the
    /// direction and edge settings are rewritten.
    fn open_at(base: &Path, pin: u8) -> io::Result<Self> {
        let pin_dir = base.join(format!("gpio{}", pin));

        if !pin_dir.exists() {
            fs::write(base.join("export"), pin.to_string())?;
            // The kernel creates the pin directory asynchronously; give udev
            // a moment to apply permissions before configuring.
            thread::sleep(Duration::from_millis(100));
        }

        fs::write(pin_dir.join("direction"), "in")?;
        fs::write(pin_dir.join("edge"), "falling")?;

        Ok(Self {
            pin,
            value_path: pin_dir.join("value"),
        })
    }

    /// Start watching for falling edges, invoking `callback` once per edge.
    ///
    /// The watcher thread runs for the remaining process lifetime; pins are
    /// never disarmed at runtime.
    pub fn watch<F>(self, callback: F) -> io::Result<()>
    where
        F: Fn() + Send + 'static,
    {
        thread::Builder::new()
            .name(format!("gpio{}-watch", self.pin))
            .spawn(move || self.run(callback))?;
        Ok(())
    }

    fn run<F: Fn()>(self, callback: F) {
        let mut value = match File::open(&self.value_path) {
            Ok(file) => file,
            Err(e) => {
                warn!("gpio{}: cannot open value node: {}", self.pin, e);
                return;
            }
        };

        // The level present at arming time is not an edge; consume it so
        // the first wait blocks until a real interrupt.
        if let Err(e) = acknowledge(&mut value) {
            warn!("gpio{}: failed to read initial level: {}", self.pin, e);
        }

        loop {
            match wait_for_interrupt(value.as_raw_fd()).and_then(|()| acknowledge(&mut value)) {
                Ok(()) => callback(),
                Err(e) => {
                    warn!("gpio{}: edge wait failed: {}", self.pin, e);
                    thread::sleep(ERROR_BACKOFF);
                }
            }
        }
    }
}

/// Block until the kernel signals the armed edge on `fd`. The sysfs GPIO
/// interface reports edge interrupts as POLLPRI on the value node.
fn wait_for_interrupt(fd: RawFd) -> io::Result<()> {
    let mut pollfd = libc::pollfd {
        fd,
        events: libc::POLLPRI | libc::POLLERR,
        revents: 0,
    };
    loop {
        let rc = unsafe { libc::poll(&mut pollfd, 1, -1) };
        if rc > 0 {
            return Ok(());
        }
        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(err);
            }
        }
        // EINTR (and the impossible zero-timeout return) retry the wait.
    }
}

/// Re-read the value node from the start so the pending interrupt is
/// acknowledged and the next edge can be delivered.
fn acknowledge(value: &mut File) -> io::Result<()> {
    let mut buf = [0u8; 8];
    value.seek(SeekFrom::Start(0))?;
    value.read(&mut buf)?;
    Ok(())
}
