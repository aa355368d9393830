//! # Mode-Switch Controller
//!
//! Process-wide `AUTOMATED` / `INTERACTIVE` flag.
//!
//! A pause signal flips the flag to interactive; the terminate signal
//! requests process exit instead. Only the interactive collaborator can
//! flip the flag back, and only when interactive mode is not locked.
//! Signal listeners do nothing but write the flag and log a line.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::{Result, SiphonError};

#[cfg(any(target_os = "linux", target_os = "android"))]
const SIGTSTP_RAW: i32 = 20;
#[cfg(all(unix, not(any(target_os = "linux", target_os = "android"))))]
const SIGTSTP_RAW: i32 = 18;

/// Process signals that can drive the mode switch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalName {
    Interrupt,
    Quit,
    Terminate,
    Hangup,
    TerminalStop,
    User1,
    User2,
}

impl SignalName {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalName::Interrupt => "SIGINT",
            SignalName::Quit => "SIGQUIT",
            SignalName::Terminate => "SIGTERM",
            SignalName::Hangup => "SIGHUP",
            SignalName::TerminalStop => "SIGTSTP",
            SignalName::User1 => "SIGUSR1",
            SignalName::User2 => "SIGUSR2",
        }
    }

    #[cfg(unix)]
    fn kind(&self) -> tokio::signal::unix::SignalKind {
        use tokio::signal::unix::SignalKind;
        match self {
            SignalName::Interrupt => SignalKind::interrupt(),
            SignalName::Quit => SignalKind::quit(),
            SignalName::Terminate => SignalKind::terminate(),
            SignalName::Hangup => SignalKind::hangup(),
            SignalName::TerminalStop => SignalKind::from_raw(SIGTSTP_RAW),
            SignalName::User1 => SignalKind::user_defined1(),
            SignalName::User2 => SignalKind::user_defined2(),
        }
    }
}

impl fmt::Display for SignalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SignalName {
    type Err = String;

    /// Accepts `SIGQUIT`, `QUIT` or `quit`
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let name = upper.strip_prefix("SIG").unwrap_or(&upper);
        match name {
            "INT" => Ok(SignalName::Interrupt),
            "QUIT" => Ok(SignalName::Quit),
            "TERM" => Ok(SignalName::Terminate),
            "HUP" => Ok(SignalName::Hangup),
            "TSTP" => Ok(SignalName::TerminalStop),
            "USR1" => Ok(SignalName::User1),
            "USR2" => Ok(SignalName::User2),
            _ => Err(format!("unsupported signal '{s}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Automated,
    Interactive,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Automated => write!(f, "AUTOMATED"),
            Mode::Interactive => write!(f, "INTERACTIVE"),
        }
    }
}

/// How an idle wait ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleOutcome {
    Completed,
    /// A pause request arrived; `remaining` idle time was not slept
    Interrupted { remaining: Duration },
}

/// Handles of the spawned signal listener tasks
#[derive(Debug)]
pub struct SignalListeners {
    handles: Vec<JoinHandle<()>>,
}

impl SignalListeners {
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn abort(&self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}

impl Drop for SignalListeners {
    fn drop(&mut self) {
        self.abort();
    }
}

/// Shared mode flag plus the terminate request channel
#[derive(Debug, Clone)]
pub struct ModeController {
    interactive: Arc<AtomicBool>,
    lock_interactive: bool,
    terminate_tx: Arc<watch::Sender<bool>>,
}

impl ModeController {
    pub fn new(lock_interactive: bool) -> Self {
        let (terminate_tx, _) = watch::channel(false);
        Self {
            interactive: Arc::new(AtomicBool::new(false)),
            lock_interactive,
            terminate_tx: Arc::new(terminate_tx),
        }
    }

    pub fn mode(&self) -> Mode {
        if self.is_interactive() {
            Mode::Interactive
        } else {
            Mode::Automated
        }
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive.load(Ordering::Acquire)
    }

    /// Whether "resume automation" is disabled
    pub fn is_locked(&self) -> bool {
        self.lock_interactive
    }

    /// `AUTOMATED → INTERACTIVE`
    pub fn request_interactive(&self) {
        self.interactive.store(true, Ordering::Release);
    }

    /// `INTERACTIVE → AUTOMATED`, refused while interactive mode is locked
    pub fn resume(&self) -> Result<()> {
        if self.lock_interactive {
            return Err(SiphonError::InvalidState(
                "interactive mode is locked; automation cannot be resumed".to_string(),
            ));
        }
        self.interactive.store(false, Ordering::Release);
        info!("💸 Resuming automation");
        Ok(())
    }

    pub fn request_terminate(&self) {
        self.terminate_tx.send_replace(true);
    }

    pub fn is_terminated(&self) -> bool {
        *self.terminate_tx.borrow()
    }

    /// Resolves once termination has been requested
    pub async fn terminated(&self) {
        let mut rx = self.terminate_tx.subscribe();
        // The sender lives as long as `self`, so the wait cannot fail
        let _ = rx.wait_for(|terminated| *terminated).await;
    }

    /// Sleep for `total` in slices of at most `slice`, returning early once
    /// interactive mode has been requested.
    pub async fn idle_sleep(&self, total: Duration, slice: Duration) -> IdleOutcome {
        let slice = if slice.is_zero() { total } else { slice };
        let mut remaining = total;

        while !remaining.is_zero() {
            if self.is_interactive() {
                debug!(
                    remaining_secs = remaining.as_secs_f64(),
                    "Idle wait interrupted by pause request"
                );
                return IdleOutcome::Interrupted { remaining };
            }

            let step = remaining.min(slice);
            info!(
                "Sleeping for {:.0} seconds ({:.0} idle time left)",
                step.as_secs_f64(),
                remaining.as_secs_f64()
            );
            sleep(step).await;
            remaining -= step;
        }

        IdleOutcome::Completed
    }

    /// Spawn one listener task per configured signal
    #[cfg(unix)]
    pub fn install_signal_handlers(
        &self,
        pause: &[SignalName],
        terminate: SignalName,
    ) -> Result<SignalListeners> {
        use tokio::signal::unix::signal;

        let mut handles = Vec::with_capacity(pause.len() + 1);

        for name in pause.iter().copied().filter(|name| *name != terminate) {
            let mut stream = signal(name.kind()).map_err(|e| {
                SiphonError::Validation(format!("cannot listen for {name}: {e}"))
            })?;
            let controller = self.clone();
            handles.push(tokio::spawn(async move {
                while stream.recv().await.is_some() {
                    info!(signal = %name, "Received signal, will switch to interactive mode...");
                    controller.request_interactive();
                }
            }));
        }

        let mut stream = signal(terminate.kind()).map_err(|e| {
            SiphonError::Validation(format!("cannot listen for {terminate}: {e}"))
        })?;
        let controller = self.clone();
        handles.push(tokio::spawn(async move {
            if stream.recv().await.is_some() {
                warn!(signal = %terminate, "Received terminate signal");
                controller.request_terminate();
            }
        }));

        info!(
            pause = ?pause.iter().map(SignalName::as_str).collect::<Vec<_>>(),
            terminate = %terminate,
            "🛡️ Signal listeners installed"
        );

        Ok(SignalListeners { handles })
    }

    /// Only Ctrl-C is available off unix; it acts as the terminate signal
    #[cfg(not(unix))]
    pub fn install_signal_handlers(
        &self,
        pause: &[SignalName],
        terminate: SignalName,
    ) -> Result<SignalListeners> {
        if !pause.is_empty() {
            warn!("Pause signals are not supported on this platform");
        }
        let controller = self.clone();
        let handle = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!(signal = %terminate, "Received terminate signal");
                controller.request_terminate();
            }
        });
        Ok(SignalListeners {
            handles: vec![handle],
        })
    }
}
