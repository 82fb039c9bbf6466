//! Challenge monitor: watches for the blocking verification interstitial
//! independently of whatever the driver loop is doing.
//!
//! The monitor runs as its own task and only ever *reads* the page
//! (presence + visibility polling). Coordination happens through a `watch`
//! channel holding the paused flag: the monitor writes, the feed loader and
//! any synchronizing caller read. Challenge resolution itself is
//! manual-in-the-loop — a human solves the slider, then either the
//! interstitial disappears or the operator confirms via [`ChallengeMonitor::mark_resolved`].

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::browser::dom::DomAccess;
use crate::browser::selectors;

/// Fired once per detection episode, to surface the interruption to a human
/// operator or an upstream caller.
pub type ChallengeCallback = Arc<dyn Fn() + Send + Sync>;

/// Monitor lifecycle. Loops `Idle → Detected → AwaitingResolution → Resolved → Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ChallengeState {
    Idle = 0,
    Detected = 1,
    AwaitingResolution = 2,
    Resolved = 3,
}

impl ChallengeState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Detected,
            2 => Self::AwaitingResolution,
            3 => Self::Resolved,
            _ => Self::Idle,
        }
    }
}

struct Shared {
    paused_tx: watch::Sender<bool>,
    state: AtomicU8,
    stop: AtomicBool,
    /// Set by `mark_resolved` to force the awaiting loop out even while the
    /// interstitial is still rendered.
    forced: AtomicBool,
}

/// Tuning knobs; production defaults poll once a second.
#[derive(Debug, Clone, Copy)]
pub struct MonitorOptions {
    /// Interval between detection probes while idle.
    pub poll_interval: Duration,
    /// Interval between disappearance probes while awaiting resolution.
    pub recheck_interval: Duration,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            recheck_interval: Duration::from_secs(1),
        }
    }
}

/// Handle to the background watcher task.
pub struct ChallengeMonitor {
    shared: Arc<Shared>,
    paused_rx: watch::Receiver<bool>,
    task: JoinHandle<()>,
}

impl ChallengeMonitor {
    /// Spawn the watcher against `dom`. The task keeps polling until
    /// [`ChallengeMonitor::stop`]; transient query errors are swallowed by
    /// the facade and read as "not detected this tick".
    pub fn spawn(
        dom: Arc<dyn DomAccess>,
        callback: Option<ChallengeCallback>,
        opts: MonitorOptions,
    ) -> Self {
        let (paused_tx, paused_rx) = watch::channel(false);
        let shared = Arc::new(Shared {
            paused_tx,
            state: AtomicU8::new(ChallengeState::Idle as u8),
            stop: AtomicBool::new(false),
            forced: AtomicBool::new(false),
        });

        let task = tokio::spawn(Self::monitor_loop(dom, shared.clone(), callback, opts));

        Self {
            shared,
            paused_rx,
            task,
        }
    }

    async fn challenge_visible(dom: &dyn DomAccess) -> bool {
        match dom.find_one(None, &selectors::CHALLENGE_CONTAINER).await {
            Some(node) => dom.is_visible(&node).await,
            None => false,
        }
    }

    async fn monitor_loop(
        dom: Arc<dyn DomAccess>,
        shared: Arc<Shared>,
        callback: Option<ChallengeCallback>,
        opts: MonitorOptions,
    ) {
        while !shared.stop.load(Ordering::Relaxed) {
            if Self::challenge_visible(dom.as_ref()).await {
                warn!("Challenge interstitial detected — pausing the harvest");
                shared
                    .state
                    .store(ChallengeState::Detected as u8, Ordering::Relaxed);
                shared.forced.store(false, Ordering::Relaxed);
                let _ = shared.paused_tx.send(true);

                // Exactly once per detection episode.
                if let Some(cb) = &callback {
                    cb();
                }

                shared
                    .state
                    .store(ChallengeState::AwaitingResolution as u8, Ordering::Relaxed);

                loop {
                    if shared.stop.load(Ordering::Relaxed) {
                        return;
                    }
                    if shared.forced.swap(false, Ordering::Relaxed) {
                        info!("Challenge marked resolved by operator");
                        break;
                    }
                    if !Self::challenge_visible(dom.as_ref()).await {
                        info!("Challenge interstitial gone — resuming");
                        break;
                    }
                    tokio::time::sleep(opts.recheck_interval).await;
                }

                shared
                    .state
                    .store(ChallengeState::Resolved as u8, Ordering::Relaxed);
                let _ = shared.paused_tx.send(false);
                shared
                    .state
                    .store(ChallengeState::Idle as u8, Ordering::Relaxed);
            }

            tokio::time::sleep(opts.poll_interval).await;
        }
    }

    /// Current pause flag. True from detection until resolution.
    pub fn paused(&self) -> bool {
        *self.paused_rx.borrow()
    }

    /// Receiver any driver loop can watch instead of polling [`Self::paused`].
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.paused_rx.clone()
    }

    pub fn state(&self) -> ChallengeState {
        ChallengeState::from_u8(self.shared.state.load(Ordering::Relaxed))
    }

    /// Operator signal: the challenge was solved, resume without waiting for
    /// the interstitial to leave the DOM.
    pub fn mark_resolved(&self) {
        self.shared.forced.store(true, Ordering::Relaxed);
        // Unblock waiters immediately; the loop notices `forced` on its next
        // probe and completes the state round-trip.
        let _ = self.shared.paused_tx.send(false);
    }

    /// Block until the pause flag clears, or `timeout` elapses.
    /// Returns whether resolution was observed in time. Callable from any
    /// task, not just the one driving the feed.
    pub async fn wait_for_resolution(&self, timeout: Duration) -> bool {
        let mut rx = self.paused_rx.clone();
        if !*rx.borrow() {
            return true;
        }
        tokio::time::timeout(timeout, rx.wait_for(|paused| !paused))
            .await
            .map(|r| r.is_ok())
            .unwrap_or(false)
    }

    /// Stop the watcher and join it. Must complete before the browser
    /// session is torn down — the task must never query a dead session.
    pub async fn stop(self) {
        self.shared.stop.store(true, Ordering::Relaxed);
        self.task.abort();
        let _ = self.task.await;
    }
}
