use std::{sync::Arc, time::Duration};

use anyhow::{bail, Result};
use chrono::Utc;
use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
    time::{self, Instant},
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    audio::CuePlayer,
    wake_lock::{WakeLock, WakeLockGuard},
};

use super::{
    countdown::CountdownStep, SessionConfig, SessionRecord, SessionStatus, SessionView,
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

const COUNTDOWN_TICK: Duration = Duration::from_secs(1);

/// Everything the session task needs, shared with the controller.
#[derive(Clone)]
struct SessionContext {
    state: Arc<Mutex<SessionRecord>>,
    cue: Arc<dyn CuePlayer>,
    wake_lock: WakeLock,
    view_tx: Arc<watch::Sender<SessionView>>,
}

impl SessionContext {
    fn publish(&self, record: &SessionRecord) {
        self.view_tx.send_replace(SessionView::from(record));
    }

    /// Move the record to Active and take the wake lock. Both happen before
    /// the first cue is armed. Returns the deadline of the first cue.
    async fn enter_active(&self, initial_delay_ms: f64) -> Option<(Instant, WakeLockGuard)> {
        let mut guard = self.state.lock().await;
        let session_id = Uuid::new_v4().to_string();
        let now = Instant::now();
        let first_delay = guard.activate(initial_delay_ms, session_id.clone(), Utc::now(), now)?;
        let wake = self.wake_lock.acquire();
        self.publish(&guard);
        log_info!(
            "session {} active, first cue in {:.2}s",
            session_id,
            first_delay.as_secs_f64()
        );
        Some((now + first_delay, wake))
    }
}

enum Phase {
    Countdown {
        started: Instant,
    },
    Active {
        first_cue: Instant,
        wake: WakeLockGuard,
    },
}

/// Drives one meditation session: countdown, then an endless chain of cues
/// whose gap grows by the growth factor after every ring.
pub struct SessionController {
    ctx: SessionContext,
    config: SessionConfig,
    ticker: Mutex<Option<JoinHandle<()>>>,
    cancel_token: Mutex<Option<CancellationToken>>,
}

impl SessionController {
    pub fn new(config: SessionConfig, cue: Arc<dyn CuePlayer>, wake_lock: WakeLock) -> Self {
        let record = SessionRecord::new(config.growth_factor);
        let (view_tx, _) = watch::channel(SessionView::from(&record));

        Self {
            ctx: SessionContext {
                state: Arc::new(Mutex::new(record)),
                cue,
                wake_lock,
                view_tx: Arc::new(view_tx),
            },
            config,
            ticker: Mutex::new(None),
            cancel_token: Mutex::new(None),
        }
    }

    pub async fn get_state(&self) -> SessionRecord {
        self.ctx.state.lock().await.clone()
    }

    pub async fn snapshot(&self) -> SessionView {
        SessionView::from(&*self.ctx.state.lock().await)
    }

    /// Receives a fresh view on every countdown second and every cue.
    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.ctx.view_tx.subscribe()
    }

    /// The start control: begin the countdown, which activates the session
    /// when it reaches zero.
    pub async fn start(&self) -> Result<()> {
        let started = {
            let mut state = self.ctx.state.lock().await;
            if !state.begin_countdown(self.config.countdown_secs) {
                bail!("session already running");
            }
            self.ctx.publish(&state);
            Instant::now()
        };
        log_info!("countdown started from {}s", self.config.countdown_secs);

        self.spawn_session(Phase::Countdown { started }).await;
        Ok(())
    }

    /// Skip the countdown and start ringing now. The first cue sounds after
    /// `initial_delay_ms`.
    pub async fn activate(&self, initial_delay_ms: f64) -> Result<()> {
        if !(initial_delay_ms.is_finite() && initial_delay_ms > 0.0) {
            bail!("initial delay must be a positive number of milliseconds");
        }
        {
            let state = self.ctx.state.lock().await;
            if state.status == SessionStatus::Active {
                bail!("session already active");
            }
        }
        // A pending countdown would activate a second time.
        self.cancel_ticker().await;

        let Some((first_cue, wake)) = self.ctx.enter_active(initial_delay_ms).await else {
            bail!("session already active");
        };
        self.spawn_session(Phase::Active { first_cue, wake }).await;
        Ok(())
    }

    /// Cancel the pending timer, release the wake lock and freeze the
    /// display. Safe to call at any time.
    pub async fn deactivate(&self) {
        self.cancel_ticker().await;

        let mut state = self.ctx.state.lock().await;
        if state.deactivate() {
            log_info!(
                "session {} stopped after {} cues, {:.2}s",
                state.session_id.as_deref().unwrap_or("-"),
                state.ticks,
                state.elapsed_ms / 1000.0
            );
            self.ctx.publish(&state);
        }
    }

    async fn spawn_session(&self, phase: Phase) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(handle) = ticker_guard.take() {
            handle.abort();
        }

        let token = CancellationToken::new();
        let ctx = self.ctx.clone();
        let initial_delay_ms = self.config.initial_delay_ms;
        let task_token = token.clone();

        let handle = tokio::spawn(async move {
            let (first_cue, wake) = match phase {
                Phase::Active { first_cue, wake } => (first_cue, wake),
                Phase::Countdown { started } => {
                    if !run_countdown(&ctx, &task_token, started).await {
                        return;
                    }
                    match ctx.enter_active(initial_delay_ms).await {
                        Some(active) => active,
                        None => return,
                    }
                }
            };
            run_cues(&ctx, &task_token, first_cue).await;
            // The guard lives exactly as long as the cue loop.
            drop(wake);
        });

        *ticker_guard = Some(handle);
        *self.cancel_token.lock().await = Some(token);
    }

    /// Stops the session task and waits for it to be gone, so the wake lock
    /// it holds has been released when this returns.
    async fn cancel_ticker(&self) {
        if let Some(token) = self.cancel_token.lock().await.take() {
            token.cancel();
        }
        if let Some(handle) = self.ticker.lock().await.take() {
            handle.abort();
            let _ = handle.await;
        }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if let Some(token) = self.cancel_token.get_mut().take() {
            token.cancel();
        }
        if let Some(handle) = self.ticker.get_mut().take() {
            handle.abort();
        }
    }
}

/// Returns `true` once the countdown reached zero, `false` if cancelled.
/// Seconds are counted from `started`, not from when this task first runs.
async fn run_countdown(
    ctx: &SessionContext,
    token: &CancellationToken,
    started: Instant,
) -> bool {
    {
        let state = ctx.state.lock().await;
        if state.countdown.is_some_and(|c| c.is_finished()) {
            return true;
        }
    }

    let mut deadline = started;
    loop {
        deadline += COUNTDOWN_TICK;
        tokio::select! {
            _ = time::sleep_until(deadline) => {}
            _ = token.cancelled() => return false,
        }

        let mut state = ctx.state.lock().await;
        match state.countdown_tick() {
            Some(CountdownStep::Remaining(secs)) => {
                log_debug!("meditation starts in {secs}");
                ctx.publish(&state);
            }
            Some(CountdownStep::Finished) => return true,
            None => return false,
        }
    }
}

/// One timer in flight at a time: the next deadline is only armed after the
/// previous cue has rung and the new gap has been computed.
async fn run_cues(ctx: &SessionContext, token: &CancellationToken, first_cue: Instant) {
    let mut deadline = first_cue;

    loop {
        tokio::select! {
            _ = time::sleep_until(deadline) => {}
            _ = token.cancelled() => break,
        }

        if let Err(err) = ctx.cue.play_from_start() {
            log_warn!("cue did not sound: {err}");
        }

        let now = Instant::now();
        let mut state = ctx.state.lock().await;
        match state.on_tick(now) {
            Some(next) => {
                log_debug!(
                    "cue {} rang at {:.2}s, next gap {:.2}s",
                    state.ticks,
                    state.elapsed_ms / 1000.0,
                    next.as_secs_f64()
                );
                ctx.publish(&state);
                deadline = now.checked_add(next).unwrap_or_else(far_future);
            }
            None => break,
        }
    }
}

/// Roughly 30 years out, what tokio itself uses for "never".
fn far_future() -> Instant {
    Instant::now() + Duration::from_secs(86400 * 365 * 30)
}
