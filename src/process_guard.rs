//! Lifecycle management for spawned children
//!
//! The engine and the package manager both run for minutes. If the wrapper is
//! interrupted or killed, they must not keep running unattended.
//!
//! - Children get `PR_SET_PDEATHSIG = SIGTERM`, so the kernel stops them if
//!   the wrapper dies without cleanup.
//! - Live children are tracked in a global registry.
//! - SIGINT, SIGTERM and SIGHUP send SIGTERM to every tracked child, escalate
//!   to SIGKILL after a grace period, then exit with `128 + signal`.
//!
//! Children stay in the wrapper's process group so the engine can still read
//! from the terminal when asked to prompt for a password.

use nix::libc;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};

static CHILD_REGISTRY: OnceLock<Arc<Mutex<ChildRegistry>>> = OnceLock::new();

/// Grace period between SIGTERM and SIGKILL on signal-driven shutdown.
/// Only the first signal is handled; later ones are dropped when we exit.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(3);

/// PIDs of children that are currently running
#[derive(Debug, Default)]
pub struct ChildRegistry {
    pids: HashSet<u32>,
    /// Set once termination starts so a second signal does not repeat it
    cleanup_initiated: bool,
}

impl ChildRegistry {
    pub fn global() -> Arc<Mutex<ChildRegistry>> {
        CHILD_REGISTRY
            .get_or_init(|| Arc::new(Mutex::new(ChildRegistry::default())))
            .clone()
    }

    pub fn register(&mut self, pid: u32) {
        self.pids.insert(pid);
        tracing::debug!("Registered child process PID {}", pid);
    }

    pub fn unregister(&mut self, pid: u32) {
        self.pids.remove(&pid);
        tracing::debug!("Unregistered child process PID {}", pid);
    }

    pub fn contains(&self, pid: u32) -> bool {
        self.pids.contains(&pid)
    }

    pub fn count(&self) -> usize {
        self.pids.len()
    }

    /// SIGTERM every tracked child, wait up to `grace_period`, then SIGKILL the rest.
    pub fn terminate_all(&mut self, grace_period: Duration) {
        if self.cleanup_initiated {
            tracing::debug!("Cleanup already initiated, skipping");
            return;
        }
        self.cleanup_initiated = true;

        if self.pids.is_empty() {
            return;
        }

        tracing::info!("Terminating {} child process(es)", self.pids.len());

        let pids: Vec<u32> = self.pids.iter().copied().collect();
        for &pid in &pids {
            if let Err(e) = send_signal(pid, Signal::SIGTERM) {
                tracing::warn!("Failed to send SIGTERM to PID {}: {}", pid, e);
            }
        }

        let start = Instant::now();
        while start.elapsed() < grace_period {
            if !pids.iter().any(|&pid| is_process_alive(pid)) {
                tracing::info!("All child processes terminated gracefully");
                self.pids.clear();
                return;
            }
            std::thread::sleep(Duration::from_millis(100));
        }

        for &pid in &pids {
            if is_process_alive(pid) {
                tracing::warn!("PID {} did not terminate, sending SIGKILL", pid);
                let _ = send_signal(pid, Signal::SIGKILL);
            }
        }
        self.pids.clear();
    }
}

fn send_signal(pid: u32, signal: Signal) -> Result<(), nix::Error> {
    signal::kill(Pid::from_raw(pid as i32), signal)
}

/// Running, sleeping or stopped. Zombies and missing PIDs count as dead.
fn is_process_alive(pid: u32) -> bool {
    if signal::kill(Pid::from_raw(pid as i32), None).is_err() {
        return false;
    }

    // Field 3 of /proc/<pid>/stat is the state letter
    if let Ok(stat) = std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
        if let Some(state) = stat
            .rsplit_once(')')
            .and_then(|(_, rest)| rest.split_whitespace().next())
        {
            return !matches!(state, "Z" | "X");
        }
    }

    true
}

/// Keeps a child in the global registry for as long as it is alive.
pub struct RegisteredChild {
    pid: u32,
}

impl RegisteredChild {
    pub fn register(pid: u32) -> Self {
        if let Ok(mut registry) = ChildRegistry::global().lock() {
            registry.register(pid);
        }
        Self { pid }
    }
}

impl Drop for RegisteredChild {
    fn drop(&mut self) {
        if let Ok(mut registry) = ChildRegistry::global().lock() {
            registry.unregister(self.pid);
        }
    }
}

/// Install handlers for SIGINT, SIGTERM and SIGHUP. Call once at startup.
pub fn init_signal_handlers() -> Result<(), std::io::Error> {
    use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP])?;

    std::thread::spawn(move || {
        if let Some(sig) = signals.forever().next() {
            let name = match sig {
                SIGINT => "SIGINT",
                SIGTERM => "SIGTERM",
                SIGHUP => "SIGHUP",
                _ => "UNKNOWN",
            };
            tracing::warn!("Received {}, stopping child processes", name);

            if let Ok(mut registry) = ChildRegistry::global().lock() {
                registry.terminate_all(SHUTDOWN_GRACE);
            }

            std::process::exit(128 + sig);
        }
    });

    Ok(())
}

/// Extension for `std::process::Command`: tie the child's life to ours.
pub trait CommandDeathSignal {
    /// Deliver SIGTERM to the child when the wrapper exits
    fn with_death_signal(&mut self) -> &mut Self;
}

impl CommandDeathSignal for std::process::Command {
    fn with_death_signal(&mut self) -> &mut Self {
        use std::os::unix::process::CommandExt;
        // SAFETY: prctl is async-signal-safe and touches no parent memory.
        unsafe {
            self.pre_exec(|| {
                if libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM) == -1 {
                    return Err(std::io::Error::last_os_error());
                }
                Ok(())
            });
        }
        self
    }
}
