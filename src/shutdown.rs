//! Cooperative shutdown.
//!
//! SIGINT and SIGTERM flip a process-wide flag. The streaming loop reads the
//! flag between passes; nothing else observes it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Shared stop request. Starts out running; once stopped it is never reset.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag {
    stopped: Arc<AtomicBool>,
}

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// Install SIGINT/SIGTERM handling that sets `flag`.
///
/// The handlers are registered before this returns, so a failure to install
/// them is reported to the caller. The spawned task does nothing but the
/// atomic store.
#[cfg(unix)]
pub fn install_signal_handlers(flag: ShutdownFlag) -> std::io::Result<JoinHandle<()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    Ok(tokio::spawn(async move {
        tokio::select! {
            _ = sigint.recv() => {}
            _ = sigterm.recv() => {}
        }
        flag.request_stop();
    }))
}

#[cfg(not(unix))]
pub fn install_signal_handlers(flag: ShutdownFlag) -> std::io::Result<JoinHandle<()>> {
    Ok(tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            flag.request_stop();
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_is_shared_and_sticky() {
        let flag = ShutdownFlag::new();
        let observer = flag.clone();
        assert!(!observer.is_stopped());

        flag.request_stop();
        assert!(observer.is_stopped());

        flag.request_stop();
        assert!(observer.is_stopped());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_sigterm_sets_flag() {
        let flag = ShutdownFlag::new();
        let handle = install_signal_handlers(flag.clone()).unwrap();

        // SAFETY: a SIGTERM handler is installed above, so raising it does not
        // terminate the test process.
        unsafe {
            libc::raise(libc::SIGTERM);
        }
        handle.await.unwrap();
        assert!(flag.is_stopped());
    }
}
