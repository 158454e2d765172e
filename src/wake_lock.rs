//! Keeps the display awake while a session is active.
//!
//! The platform side is a child process that holds an idle inhibitor
//! (`caffeinate` on macOS, `systemd-inhibit` on Linux) for as long as it
//! runs. [`WakeLock::acquire`] hands back a [`WakeLockGuard`]; dropping the
//! guard releases the lock, which covers every way a session can end.

use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

#[derive(Error, Debug)]
pub enum WakeLockError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to stop {program}: {source}")]
    Stop {
        program: &'static str,
        #[source]
        source: std::io::Error,
    },
}

pub trait WakeLockBackend: Send {
    fn engage(&mut self) -> Result<(), WakeLockError>;
    fn disengage(&mut self) -> Result<(), WakeLockError>;
}

/// Holds an inhibitor process alive while engaged. The child is tied to
/// this process: either it watches our pid, or it blocks on a stdin pipe we
/// own and exits at EOF, so it goes away even if we are killed outright.
pub struct CommandInhibitor {
    program: &'static str,
    args: Vec<String>,
    hold_stdin: bool,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
}

impl CommandInhibitor {
    pub fn new(program: &'static str, args: Vec<String>, hold_stdin: bool) -> Self {
        Self {
            program,
            args,
            hold_stdin,
            child: None,
            stdin: None,
        }
    }

    /// `caffeinate` exits on its own once `pid` is gone.
    pub fn caffeinate(pid: u32) -> Self {
        Self::new(
            "caffeinate",
            vec!["-d".into(), "-i".into(), "-w".into(), pid.to_string()],
            false,
        )
    }

    /// `systemd-inhibit` runs `cat` on a pipe we hold; when our end closes,
    /// `cat` sees EOF and the inhibitor is dropped.
    pub fn systemd_inhibit() -> Self {
        Self::new(
            "systemd-inhibit",
            vec![
                "--what=idle".into(),
                "--who=trance-bell".into(),
                "--why=Meditation session in progress".into(),
                "cat".into(),
            ],
            true,
        )
    }
}

impl WakeLockBackend for CommandInhibitor {
    fn engage(&mut self) -> Result<(), WakeLockError> {
        if self.child.is_some() {
            return Ok(());
        }
        let stdin = if self.hold_stdin {
            Stdio::piped()
        } else {
            Stdio::null()
        };
        let mut child = Command::new(self.program)
            .args(&self.args)
            .stdin(stdin)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| WakeLockError::Spawn {
                program: self.program,
                source,
            })?;
        log_debug!("{} holding wake lock (pid {})", self.program, child.id());
        self.stdin = child.stdin.take();
        self.child = Some(child);
        Ok(())
    }

    fn disengage(&mut self) -> Result<(), WakeLockError> {
        // Closing the pipe alone is enough for a stdin-held inhibitor.
        drop(self.stdin.take());
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        // The inhibitor may already have exited on its own; reaping is enough then.
        if let Ok(Some(_)) = child.try_wait() {
            return Ok(());
        }
        child.kill().map_err(|source| WakeLockError::Stop {
            program: self.program,
            source,
        })?;
        child.wait().map_err(|source| WakeLockError::Stop {
            program: self.program,
            source,
        })?;
        Ok(())
    }
}

impl Drop for CommandInhibitor {
    fn drop(&mut self) {
        let _ = self.disengage();
    }
}

/// Used where no inhibitor is known, or when the user opted out.
pub struct NoopBackend;

impl WakeLockBackend for NoopBackend {
    fn engage(&mut self) -> Result<(), WakeLockError> {
        Ok(())
    }

    fn disengage(&mut self) -> Result<(), WakeLockError> {
        Ok(())
    }
}

pub fn platform_backend() -> Box<dyn WakeLockBackend> {
    #[cfg(target_os = "macos")]
    {
        Box::new(CommandInhibitor::caffeinate(std::process::id()))
    }

    #[cfg(target_os = "linux")]
    {
        Box::new(CommandInhibitor::systemd_inhibit())
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        Box::new(NoopBackend)
    }
}

struct Inner {
    backend: Box<dyn WakeLockBackend>,
    held: bool,
}

#[derive(Clone)]
pub struct WakeLock {
    inner: Arc<Mutex<Inner>>,
}

impl WakeLock {
    pub fn new(backend: Box<dyn WakeLockBackend>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                backend,
                held: false,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Request stay-awake. Does nothing if already held. A backend failure is
    /// logged and the session carries on without the lock.
    pub fn acquire(&self) -> WakeLockGuard {
        let mut inner = self.lock();
        if !inner.held {
            match inner.backend.engage() {
                Ok(()) => {
                    inner.held = true;
                    log_info!("wake lock acquired");
                }
                Err(err) => log_warn!("could not keep the screen awake: {err}"),
            }
        }
        WakeLockGuard { lock: self.clone() }
    }

    /// Release stay-awake. A no-op if never acquired.
    pub fn release(&self) {
        let mut inner = self.lock();
        if !inner.held {
            return;
        }
        inner.held = false;
        match inner.backend.disengage() {
            Ok(()) => log_info!("wake lock released"),
            Err(err) => log_warn!("wake lock release failed: {err}"),
        }
    }

    pub fn is_held(&self) -> bool {
        self.lock().held
    }
}

/// Releases the wake lock when dropped.
#[must_use = "dropping the guard releases the wake lock immediately"]
pub struct WakeLockGuard {
    lock: WakeLock,
}

impl Drop for WakeLockGuard {
    fn drop(&mut self) {
        self.lock.release();
    }
}
