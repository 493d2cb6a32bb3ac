//! Playback: advance the instantaneous phase on a background thread.
//!
//! The stepping thread only issues [`Engine::advance_phase`] calls, so every
//! step is a regular settle pass serialized with user edits. Stopping is
//! cooperative: the thread sleeps on a [`CancelToken`] and checks it again
//! before each step. [`PlaybackScheduler::stop`] joins the thread, so no
//! step settles after it returns. A step that fails or panics stops the
//! thread and is reported as [`PlaybackEvent::Failed`].

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};
use std::sync::{Arc, Condvar, Mutex, PoisonError, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::config::PlaybackConfig;
use crate::error::{AppError, AppResult};
use crate::propagator::{Engine, Settled, in_settle_pass};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Running,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PlaybackEvent {
    Started,
    Stopped { steps: u64 },
    /// A step failed; the thread stopped itself without stepping again.
    Failed { message: String },
}

/// Cooperative stop signal. Waiters wake as soon as it is cancelled.
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        let (flag, cvar) = &*self.inner;
        *flag.lock().unwrap_or_else(PoisonError::into_inner) = true;
        cvar.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleep for `timeout` unless cancelled first. Returns `true` if cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let (flag, cvar) = &*self.inner;
        let deadline = Instant::now() + timeout;
        let mut cancelled = flag.lock().unwrap_or_else(PoisonError::into_inner);
        while !*cancelled {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            cancelled = cvar
                .wait_timeout(cancelled, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        *cancelled
    }
}

struct Worker {
    token: CancelToken,
    running: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

pub struct PlaybackScheduler {
    engine: Weak<Engine>,
    config: PlaybackConfig,
    worker: Option<Worker>,
    events_tx: Sender<PlaybackEvent>,
    events_rx: Receiver<PlaybackEvent>,
}

impl PlaybackScheduler {
    pub fn new(engine: &Arc<Engine>, config: PlaybackConfig) -> Self {
        let (events_tx, events_rx) = channel();
        Self {
            engine: Arc::downgrade(engine),
            config,
            worker: None,
            events_tx,
            events_rx,
        }
    }

    pub fn config(&self) -> PlaybackConfig {
        self.config
    }

    pub fn state(&self) -> PlaybackState {
        match &self.worker {
            Some(w) if w.running.load(Ordering::SeqCst) => PlaybackState::Running,
            _ => PlaybackState::Stopped,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state() == PlaybackState::Running
    }

    /// Start stepping. Does nothing if already running.
    pub fn start(&mut self) -> AppResult<()> {
        if self.is_running() {
            return Ok(());
        }
        // a worker that stopped itself after a failure still needs joining
        self.join_worker()?;
        if self.engine.strong_count() == 0 {
            return Err(AppError::EngineDropped);
        }

        let token = CancelToken::new();
        let running = Arc::new(AtomicBool::new(true));
        let stepper = Stepper {
            engine: self.engine.clone(),
            token: token.clone(),
            running: running.clone(),
            events: self.events_tx.clone(),
            config: self.config,
        };
        let handle = thread::Builder::new()
            .name("pp-playback".to_string())
            .spawn(move || stepper.run())?;

        self.worker = Some(Worker {
            token,
            running,
            handle,
        });
        info!(
            period_ms = self.config.period_ms,
            step_deg = self.config.step_deg,
            "playback started"
        );
        Ok(())
    }

    /// Stop stepping and wait for the thread to exit.
    ///
    /// Blocks for at most one in-flight step; no step settles after this returns.
    /// From inside a settle callback the thread is only cancelled and
    /// [`AppError::Reentrant`] is returned: the in-flight step may be waiting
    /// on the very pass the callback belongs to. A later `stop`, `start` or
    /// drop joins it.
    pub fn stop(&mut self) -> AppResult<()> {
        if let Some(worker) = &self.worker {
            worker.token.cancel();
        }
        if in_settle_pass() {
            return Err(AppError::Reentrant);
        }
        self.join_worker()
    }

    /// Alias for [`PlaybackScheduler::stop`].
    pub fn cancel(&mut self) -> AppResult<()> {
        self.stop()
    }

    /// Return the instantaneous phase to its zero reference. The scheduler
    /// keeps running if it was.
    pub fn reset(&self) -> AppResult<Settled> {
        let engine = self.engine.upgrade().ok_or(AppError::EngineDropped)?;
        info!("playback phase reset");
        engine.reset_phase()
    }

    /// Run a single step on the calling thread.
    pub fn step_once(&self) -> AppResult<Settled> {
        let engine = self.engine.upgrade().ok_or(AppError::EngineDropped)?;
        engine.advance_phase(self.config.step_deg)
    }

    pub fn try_event(&self) -> Option<PlaybackEvent> {
        match self.events_rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    pub fn recv_event_timeout(&self, timeout: Duration) -> Option<PlaybackEvent> {
        self.events_rx.recv_timeout(timeout).ok()
    }

    fn join_worker(&mut self) -> AppResult<()> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };
        worker
            .handle
            .join()
            .map_err(|_| AppError::Playback("playback thread panicked".to_string()))?;
        info!("playback stopped");
        Ok(())
    }
}

impl Drop for PlaybackScheduler {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// State moved onto the stepping thread.
struct Stepper {
    engine: Weak<Engine>,
    token: CancelToken,
    running: Arc<AtomicBool>,
    events: Sender<PlaybackEvent>,
    config: PlaybackConfig,
}

/// Clears the running flag however the stepping thread exits.
struct ClearOnExit(Arc<AtomicBool>);

impl Drop for ClearOnExit {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("no message");
    format!("playback step panicked: {detail}")
}

impl Stepper {
    fn run(self) {
        let running = ClearOnExit(self.running.clone());
        let _ = self.events.send(PlaybackEvent::Started);
        let mut steps = 0_u64;
        let outcome = loop {
            if self.token.wait_timeout(self.config.period()) {
                break Ok(());
            }
            let Some(engine) = self.engine.upgrade() else {
                break Ok(());
            };
            if self.token.is_cancelled() {
                break Ok(());
            }
            // settle callbacks run inside the step and may panic
            let step = panic::catch_unwind(AssertUnwindSafe(|| {
                engine.advance_phase(self.config.step_deg)
            }));
            match step {
                Ok(Ok(_)) => steps += 1,
                Ok(Err(err)) => break Err(err.to_string()),
                Err(payload) => break Err(panic_message(payload.as_ref())),
            }
        };

        drop(running);
        let event = match outcome {
            Ok(()) => PlaybackEvent::Stopped { steps },
            Err(message) => {
                warn!(error = %message, steps, "playback step failed, stopping");
                PlaybackEvent::Failed { message }
            }
        };
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_wakes_waiter_early() {
        let token = CancelToken::new();
        let waiter = token.clone();
        let handle = thread::spawn(move || {
            let start = Instant::now();
            let cancelled = waiter.wait_timeout(Duration::from_secs(10));
            (cancelled, start.elapsed())
        });
        thread::sleep(Duration::from_millis(20));
        token.cancel();
        let (cancelled, elapsed) = handle.join().unwrap();
        assert!(cancelled);
        assert!(elapsed < Duration::from_secs(5));
    }

    #[test]
    fn wait_times_out_when_not_cancelled() {
        let token = CancelToken::new();
        assert!(!token.wait_timeout(Duration::from_millis(5)));
        assert!(!token.is_cancelled());
    }

    #[test]
    fn panic_message_keeps_payload_text() {
        let payload = panic::catch_unwind(|| -> u8 { panic!("render failed") }).unwrap_err();
        assert_eq!(
            panic_message(payload.as_ref()),
            "playback step panicked: render failed"
        );
        let payload = panic::catch_unwind(|| -> u8 { panic!("step {}", 3) }).unwrap_err();
        assert!(panic_message(payload.as_ref()).ends_with("step 3"));
    }

    #[test]
    fn start_without_engine_fails() {
        let engine = Arc::new(Engine::default());
        let mut scheduler = PlaybackScheduler::new(&engine, PlaybackConfig::default());
        drop(engine);
        assert!(matches!(scheduler.start(), Err(AppError::EngineDropped)));
        assert!(matches!(scheduler.reset(), Err(AppError::EngineDropped)));
        assert_eq!(scheduler.state(), PlaybackState::Stopped);
    }
}
