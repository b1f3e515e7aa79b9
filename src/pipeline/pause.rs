//! Pause/resume control.
//!
//! The bar host sends the signals advertised in the protocol header when the
//! bar is hidden or shown. A dedicated thread listens for them and flips the
//! shared [`RunState`]; the tick loop only reads it.

use crossbeam_channel::bounded;
use log::{debug, info, warn};
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

/// Signal the host sends to suspend output.
pub const STOP_SIGNAL: i32 = libc::SIGTSTP;
/// Signal the host sends to resume output.
pub const CONT_SIGNAL: i32 = libc::SIGCONT;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlSignal {
    Suspend,
    Resume,
}

/// Whether ticks currently produce frames.
///
/// This is the only mutable state shared between threads: written by the
/// signal listener, read by the tick loop.
#[derive(Clone, Debug)]
pub struct RunState {
    emitting: Arc<AtomicBool>,
}

impl RunState {
    /// A new run state, emitting.
    pub fn new() -> Self {
        Self {
            emitting: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_emitting(&self) -> bool {
        self.emitting.load(Ordering::SeqCst)
    }

    pub fn suspend(&self) {
        if self.emitting.swap(false, Ordering::SeqCst) {
            info!("Output suspended");
        }
    }

    pub fn resume(&self) {
        if !self.emitting.swap(true, Ordering::SeqCst) {
            info!("Output resumed");
        }
    }

    pub fn apply(&self, signal: ControlSignal) {
        debug!("Control signal: {:?}", signal);
        match signal {
            ControlSignal::Suspend => self.suspend(),
            ControlSignal::Resume => self.resume(),
        }
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

/// Listens for the stop/continue signals on its own thread.
pub struct PauseController;

impl PauseController {
    /// Start the listener thread. Returns once both handlers are installed, so
    /// a stop signal arriving right after startup cannot hit the default action.
    pub fn spawn(run_state: RunState) -> io::Result<()> {
        let (ready_tx, ready_rx) = bounded::<io::Result<()>>(1);

        thread::Builder::new()
            .name("pause-controller".to_string())
            .spawn(move || {
                let rt = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                rt.block_on(async move {
                    use tokio::signal::unix::{SignalKind, signal};

                    let handlers = signal(SignalKind::from_raw(STOP_SIGNAL))
                        .and_then(|stop| Ok((stop, signal(SignalKind::from_raw(CONT_SIGNAL))?)));
                    let (mut stop, mut cont) = match handlers {
                        Ok(handlers) => {
                            let _ = ready_tx.send(Ok(()));
                            handlers
                        }
                        Err(e) => {
                            let _ = ready_tx.send(Err(e));
                            return;
                        }
                    };

                    info!(
                        "Listening for pause ({}) and resume ({}) signals...",
                        STOP_SIGNAL, CONT_SIGNAL
                    );
                    loop {
                        tokio::select! {
                            Some(()) = stop.recv() => run_state.apply(ControlSignal::Suspend),
                            Some(()) = cont.recv() => run_state.apply(ControlSignal::Resume),
                            else => break,
                        }
                    }
                    warn!("Signal streams closed, pause control stopped");
                });
            })?;

        ready_rx
            .recv()
            .map_err(|_| io::Error::other("pause controller exited during startup"))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        condition()
    }

    #[test]
    fn test_controller_follows_real_signals() {
        let state = RunState::new();
        PauseController::spawn(state.clone()).unwrap();

        // Both handlers are installed once spawn returns.
        unsafe { libc::raise(STOP_SIGNAL) };
        assert!(wait_for(|| !state.is_emitting()), "stop signal was not observed");

        unsafe { libc::raise(CONT_SIGNAL) };
        assert!(wait_for(|| state.is_emitting()), "continue signal was not observed");
    }

    #[test]
    fn test_starts_emitting() {
        assert!(RunState::new().is_emitting());
    }

    #[test]
    fn test_clones_share_state() {
        let state = RunState::new();
        let listener_side = state.clone();

        listener_side.apply(ControlSignal::Suspend);
        assert!(!state.is_emitting());

        listener_side.apply(ControlSignal::Resume);
        assert!(state.is_emitting());
    }

    #[test]
    fn test_repeated_signals_are_idempotent() {
        let state = RunState::new();
        state.suspend();
        state.suspend();
        assert!(!state.is_emitting());
        state.resume();
        state.resume();
        assert!(state.is_emitting());
    }

    #[test]
    fn test_state_crosses_threads() {
        let state = RunState::new();
        let remote = state.clone();
        thread::spawn(move || remote.apply(ControlSignal::Suspend))
            .join()
            .unwrap();
        assert!(!state.is_emitting());
    }

    #[test]
    fn test_signal_numbers_match_linux_header_values() {
        assert_eq!(STOP_SIGNAL, 20);
        assert_eq!(CONT_SIGNAL, 18);
    }
}
