//! Adaptive Poller - one self-rescheduling loop per feed session
//!
//! Idle → Scheduled → InFlight → Scheduled | Stopped
//!
//! - First tick fires immediately; the next one is scheduled only after the
//!   current tick completes, so ticks never overlap.
//! - Success shrinks the interval toward `base_ms`, exhaustion grows it toward
//!   `ceiling_ms` and triggers one degraded aggregated-tier request.
//! - Every result is checked against the shared generation counter before it
//!   touches the window; a stale result is dropped on the floor.
//! - Window writes and consumer callbacks happen behind a per-session emit
//!   gate that retirement also takes, so nothing reaches the consumer once
//!   `stop` or `switch_pair` has returned.
//! - Regaining visibility fires a catch-up tick without moving the deadline.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::Duration;

use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::core::cascade::{CascadeMode, CascadeOutcome, SourceCascade};
use crate::core::normalizer::{normalize_page, retain_trades};
use crate::core::reconcile::TransactionWindow;
use crate::core::resolver::PoolResolver;
use crate::models::config::{FeedConfig, PollConfig};
use crate::models::errors::{AppError, AppResult};
use crate::models::types::{
    FeedEvent, FeedPhase, FeedStatus, NormalizedTransaction, PairContext, SourceTier,
};
use crate::providers::dexscreener::DexScreenerClient;
use crate::providers::swaps::{SwapFeedClient, TierPage};
use crate::utils::cache::HighlightSet;

/// Consumer callback receiving every feed event
pub type UpdateCallback = Arc<dyn Fn(FeedEvent) + Send + Sync>;

// ============================================
// POLL STATE
// ============================================

/// Adaptive interval bounded by `[base_ms, ceiling_ms]`
#[derive(Debug, Clone)]
pub struct PollState {
    interval_ms: u64,
    base_ms: u64,
    ceiling_ms: u64,
    backoff_factor: f64,
    recovery_factor: f64,
    generation: u64,
}

impl PollState {
    pub fn new(config: &PollConfig, generation: u64) -> Self {
        let base_ms = config.base_ms.max(1);
        Self {
            interval_ms: base_ms,
            base_ms,
            ceiling_ms: config.ceiling_ms.max(base_ms),
            backoff_factor: config.backoff_factor,
            recovery_factor: config.recovery_factor,
            generation,
        }
    }

    /// Shrink toward base; strictly decreasing while above it
    pub fn on_success(&mut self) -> u64 {
        let scaled = (self.interval_ms as f64 * self.recovery_factor).floor() as u64;
        self.interval_ms = scaled
            .min(self.interval_ms.saturating_sub(1))
            .max(self.base_ms);
        self.interval_ms
    }

    /// Grow toward ceiling; strictly increasing while below it
    pub fn on_failure(&mut self) -> u64 {
        let scaled = (self.interval_ms as f64 * self.backoff_factor).ceil() as u64;
        self.interval_ms = scaled
            .max(self.interval_ms.saturating_add(1))
            .min(self.ceiling_ms);
        self.interval_ms
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

// ============================================
// SHARED SESSION STATE
// ============================================

/// State shared between a session task and its handle
struct SessionShared {
    context: PairContext,
    window: RwLock<TransactionWindow>,
    status: RwLock<FeedStatus>,
    highlights: HighlightSet,
    visible: AtomicBool,
    stopped: AtomicBool,
    /// Replaced by a newer session; its end is not reported
    superseded: AtomicBool,
    /// Held across window writes + callbacks, and across retirement
    emit_gate: Mutex<()>,
    catch_up: Notify,
    /// Counter shared with whoever can supersede this session
    generation: Arc<AtomicU64>,
    /// Generation this session was started under
    own_generation: u64,
}

impl SessionShared {
    fn is_current(&self) -> bool {
        !self.stopped.load(Ordering::SeqCst)
            && self.generation.load(Ordering::SeqCst) == self.own_generation
    }

    fn gate(&self) -> MutexGuard<'_, ()> {
        self.emit_gate.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Mark stopped and advance the generation if nobody already did. Waits
    /// for an in-progress emit to finish.
    fn retire(&self) -> bool {
        let _gate = self.gate();
        let first = !self.stopped.swap(true, Ordering::SeqCst);
        let _ = self.generation.compare_exchange(
            self.own_generation,
            self.own_generation + 1,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
        first
    }

    fn update_status(&self, f: impl FnOnce(&mut FeedStatus)) {
        let mut status = self.status.write().unwrap_or_else(|e| e.into_inner());
        f(&mut status);
    }

    fn phase(&self) -> FeedPhase {
        self.status.read().unwrap_or_else(|e| e.into_inner()).phase
    }
}

// ============================================
// FEED HANDLE
// ============================================

/// Teardown handle for a running session. Dropping it stops the session.
pub struct FeedHandle {
    shared: Arc<SessionShared>,
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl FeedHandle {
    /// Stop polling; results still in flight are discarded
    pub fn stop(&self) {
        if self.shared.retire() {
            info!("🛑 Feed stopped: {}", self.shared.context.label());
        }
        let _ = self.shutdown.send(true);
    }

    /// Stop because a newer session replaces this one; no `Stopped` event is
    /// delivered for it
    pub(crate) fn supersede(&self) {
        self.shared.superseded.store(true, Ordering::SeqCst);
        self.stop();
    }

    /// Stop and wait for the session task to exit
    pub async fn shutdown(mut self) {
        self.stop();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    /// Report host visibility. Hidden → visible while scheduled fires a
    /// catch-up tick.
    pub fn set_visible(&self, visible: bool) {
        let was_visible = self.shared.visible.swap(visible, Ordering::SeqCst);
        if visible && !was_visible && self.shared.phase() == FeedPhase::Scheduled {
            debug!("👀 Visible again, catch-up tick for {}", self.shared.context.label());
            self.shared.catch_up.notify_one();
        }
    }

    pub fn is_visible(&self) -> bool {
        self.shared.visible.load(Ordering::SeqCst)
    }

    /// Current window, newest first
    pub fn snapshot(&self) -> Vec<NormalizedTransaction> {
        self.shared
            .window
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .entries()
            .to_vec()
    }

    /// Hashes still flagged as new
    pub fn highlighted(&self) -> Vec<String> {
        self.shared.highlights.active()
    }

    pub fn is_highlighted(&self, hash: &str) -> bool {
        self.shared.highlights.is_highlighted(hash)
    }

    pub fn status(&self) -> FeedStatus {
        self.shared
            .status
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn is_active(&self) -> bool {
        self.shared.is_current()
    }

    pub fn context(&self) -> &PairContext {
        &self.shared.context
    }

    pub fn generation(&self) -> u64 {
        self.shared.own_generation
    }
}

impl Drop for FeedHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

// ============================================
// FEED SERVICE
// ============================================

/// Entry point: owns the upstream clients and starts sessions
#[derive(Clone)]
pub struct FeedService {
    config: Arc<FeedConfig>,
    cascade: SourceCascade,
    resolver: PoolResolver,
}

impl FeedService {
    pub fn new(config: FeedConfig) -> AppResult<Self> {
        config.validate()?;
        let swaps = SwapFeedClient::new(&config.endpoints)?;
        let discovery = DexScreenerClient::new(&config.endpoints)?;

        Ok(Self {
            cascade: SourceCascade::new(swaps),
            resolver: PoolResolver::new(discovery),
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    /// Start a feed session for `context`. Must be called inside a tokio
    /// runtime.
    ///
    /// `on_update` runs on the session task and must not stop or drop the
    /// handle of its own session.
    pub fn start_feed<F>(
        &self,
        context: PairContext,
        price_rx: watch::Receiver<f64>,
        on_update: F,
    ) -> FeedHandle
    where
        F: Fn(FeedEvent) + Send + Sync + 'static,
    {
        let generation = Arc::new(AtomicU64::new(0));
        self.spawn_session(context, price_rx, Arc::new(on_update), generation)
    }

    fn spawn_session(
        &self,
        context: PairContext,
        price_rx: watch::Receiver<f64>,
        on_update: UpdateCallback,
        generation: Arc<AtomicU64>,
    ) -> FeedHandle {
        let session = self.build_session(context, price_rx, on_update, generation);
        let shared = session.shared.clone();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(session.run(shutdown_rx));

        FeedHandle {
            shared,
            shutdown: shutdown_tx,
            task: Some(task),
        }
    }

    fn build_session(
        &self,
        context: PairContext,
        price_rx: watch::Receiver<f64>,
        on_update: UpdateCallback,
        generation: Arc<AtomicU64>,
    ) -> FeedSession {
        let own_generation = generation.load(Ordering::SeqCst);
        let state = PollState::new(&self.config.poll, own_generation);

        info!(
            "🚀 Feed started: {} (gen {}, base {}ms)",
            context.label(),
            own_generation,
            state.interval_ms()
        );

        let shared = Arc::new(SessionShared {
            context,
            window: RwLock::new(TransactionWindow::new(self.config.window_capacity)),
            status: RwLock::new(FeedStatus::new(state.interval_ms(), own_generation)),
            highlights: HighlightSet::new(self.config.highlight_ttl),
            visible: AtomicBool::new(true),
            stopped: AtomicBool::new(false),
            superseded: AtomicBool::new(false),
            emit_gate: Mutex::new(()),
            catch_up: Notify::new(),
            generation,
            own_generation,
        });

        FeedSession {
            shared,
            cascade: self.cascade.clone(),
            resolver: self.resolver.clone(),
            poll: self.config.poll.clone(),
            state,
            price_rx,
            on_update,
            resolve_attempted: false,
        }
    }
}

// ============================================
// SESSION LOOP
// ============================================

enum TickResult {
    Success,
    Failure,
    Stale,
}

struct FeedSession {
    shared: Arc<SessionShared>,
    cascade: SourceCascade,
    resolver: PoolResolver,
    poll: PollConfig,
    state: PollState,
    price_rx: watch::Receiver<f64>,
    on_update: UpdateCallback,
    resolve_attempted: bool,
}

impl FeedSession {
    async fn run(mut self, mut shutdown_rx: watch::Receiver<bool>) {
        let mut deadline = Instant::now();

        loop {
            if *shutdown_rx.borrow() || !self.shared.is_current() {
                break;
            }
            self.shared.update_status(|s| s.phase = FeedPhase::Scheduled);

            let sleep = sleep_until(deadline);
            tokio::pin!(sleep);

            let catch_up = tokio::select! {
                _ = &mut sleep => false,
                _ = self.shared.catch_up.notified() => true,
                _ = shutdown_rx.changed() => break,
            };

            if !catch_up && !self.shared.visible.load(Ordering::SeqCst) {
                debug!("🙈 Hidden, skipping tick for {}", self.shared.context.label());
                deadline = Instant::now() + self.state.interval();
                continue;
            }

            let result = tokio::select! {
                result = self.tick(catch_up) => result,
                _ = shutdown_rx.changed() => break,
            };

            match result {
                TickResult::Stale => break,
                TickResult::Success | TickResult::Failure if catch_up => {}
                TickResult::Success | TickResult::Failure => {
                    deadline = Instant::now() + self.state.interval();
                }
            }
        }

        self.shared.update_status(|s| s.phase = FeedPhase::Stopped);
        if self.shared.superseded.load(Ordering::SeqCst) {
            debug!("🔀 Superseded session exited: {}", self.shared.context.label());
        } else {
            (self.on_update)(FeedEvent::Stopped);
            debug!("🏁 Session loop exited: {}", self.shared.context.label());
        }
    }

    /// One tick. Catch-up ticks leave the interval untouched.
    async fn tick(&mut self, catch_up: bool) -> TickResult {
        self.shared.update_status(|s| {
            s.phase = FeedPhase::InFlight;
            s.ticks += 1;
        });
        self.shared.highlights.cleanup_expired();

        let seeded = self
            .shared
            .window
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_seeded();

        if !seeded && !self.resolve_attempted {
            self.resolve_attempted = true;
            let context = &self.shared.context;
            let pool = self
                .resolver
                .resolve(context, context.candidate_pool.as_deref())
                .await;
            if !self.shared.is_current() {
                return TickResult::Stale;
            }
            self.shared.update_status(|s| s.pool_address = pool);
        }

        let (mode, limit) = if seeded {
            (CascadeMode::Poll, self.poll.poll_limit)
        } else {
            (CascadeMode::Initial, self.poll.initial_limit)
        };

        let outcome = self.cascade.run(&self.shared.context, mode, limit).await;
        if !self.shared.is_current() {
            debug!("🗑️ Discarding stale result for {}", self.shared.context.label());
            return TickResult::Stale;
        }

        match outcome {
            CascadeOutcome::Data(page) => {
                if !self.apply(page) {
                    return TickResult::Stale;
                }
                self.record_success(catch_up);
                TickResult::Success
            }
            CascadeOutcome::Quiet { tier } => {
                self.shared.update_status(|s| s.last_tier = Some(tier));
                self.record_success(catch_up);
                TickResult::Success
            }
            CascadeOutcome::Exhausted(err) => {
                if !self.record_failure(&err, catch_up) {
                    return TickResult::Stale;
                }
                self.degraded_fetch(limit).await
            }
        }
    }

    /// Best-effort aggregated request after exhaustion, sized like the tick
    /// that failed; never counts as recovery
    async fn degraded_fetch(&mut self, limit: u32) -> TickResult {
        let result = self
            .cascade
            .fetch_tier(&self.shared.context, SourceTier::Aggregated, limit)
            .await;
        if !self.shared.is_current() {
            return TickResult::Stale;
        }

        match result {
            Ok(page) if !page.transactions.is_empty() => {
                info!(
                    "🩹 Degraded fetch recovered {} records for {}",
                    page.transactions.len(),
                    self.shared.context.label()
                );
                if !self.apply(page) {
                    return TickResult::Stale;
                }
            }
            Ok(_) => debug!("📭 Degraded fetch returned nothing"),
            Err(e) => debug!("⚠️ Degraded fetch failed: {}", e),
        }
        TickResult::Failure
    }

    /// Normalize a page into the window and notify the consumer. Returns
    /// false when the session was retired first; the window is untouched.
    fn apply(&mut self, page: TierPage) -> bool {
        let price = *self.price_rx.borrow();
        let tier = page.tier;
        let trades = retain_trades(normalize_page(&page, &self.shared.context, price));

        let _gate = self.shared.gate();
        if !self.shared.is_current() {
            debug!("🗑️ Discarding stale page for {}", self.shared.context.label());
            return false;
        }

        let (transactions, new_hashes, seeded_now) = {
            let mut window = self.shared.window.write().unwrap_or_else(|e| e.into_inner());
            if window.is_seeded() {
                let outcome = window.merge(trades);
                if outcome.is_empty() {
                    debug!("💤 No new transactions for {}", self.shared.context.label());
                    drop(window);
                    self.shared.update_status(|s| s.last_tier = Some(tier));
                    return true;
                }
                (window.entries().to_vec(), outcome.new_hashes, false)
            } else {
                window.seed(trades);
                (window.entries().to_vec(), Vec::new(), true)
            }
        };

        self.shared.highlights.mark(new_hashes.iter().cloned());
        self.shared.update_status(|s| {
            s.last_tier = Some(tier);
            s.seeded = true;
        });

        if seeded_now {
            info!(
                "📦 Window seeded with {} transactions from {} tier",
                transactions.len(),
                tier.as_str()
            );
        } else {
            info!("✨ {} new transactions for {}", new_hashes.len(), self.shared.context.label());
        }
        if let Some(latest) = transactions.first() {
            debug!("   Latest: {}", latest.summary());
        }

        (self.on_update)(FeedEvent::Snapshot {
            transactions,
            new_hashes,
            tier: Some(tier),
        });
        true
    }

    fn record_success(&mut self, catch_up: bool) {
        let interval = if catch_up {
            self.state.interval_ms()
        } else {
            self.state.on_success()
        };
        self.shared.update_status(|s| {
            s.successes += 1;
            s.interval_ms = interval;
            s.last_error = None;
        });
    }

    /// Returns false when the session was retired before the error could be
    /// reported
    fn record_failure(&mut self, err: &AppError, catch_up: bool) -> bool {
        let interval = if catch_up {
            self.state.interval_ms()
        } else {
            self.state.on_failure()
        };
        warn!(
            "⏳ {} for {}, next tick in {}ms",
            err,
            self.shared.context.label(),
            interval
        );
        self.shared.update_status(|s| {
            s.failures += 1;
            s.interval_ms = interval;
            s.last_error = Some(err.to_string());
        });

        let _gate = self.shared.gate();
        if !self.shared.is_current() {
            return false;
        }
        (self.on_update)(FeedEvent::Error {
            code: err.code,
            message: err.message.clone(),
            retryable: err.is_retryable(),
        });
        true
    }
}

// ============================================
// FEED SUPERVISOR
// ============================================

/// Keeps at most one live session and replaces it on pair change
pub struct FeedSupervisor {
    service: FeedService,
    generation: Arc<AtomicU64>,
    price_rx: watch::Receiver<f64>,
    on_update: UpdateCallback,
    current: Option<FeedHandle>,
}

impl FeedSupervisor {
    pub fn new<F>(service: FeedService, price_rx: watch::Receiver<f64>, on_update: F) -> Self
    where
        F: Fn(FeedEvent) + Send + Sync + 'static,
    {
        Self {
            service,
            generation: Arc::new(AtomicU64::new(0)),
            price_rx,
            on_update: Arc::new(on_update),
            current: None,
        }
    }

    /// Stop the current session and start one for `context` under the next
    /// generation. Once this returns the old session delivers nothing more,
    /// not even `Stopped`.
    pub fn switch_pair(&mut self, context: PairContext) -> &FeedHandle {
        let next = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(previous) = self.current.take() {
            previous.supersede();
        }
        info!("🔀 Switching feed to {} (gen {})", context.label(), next);

        let handle = self.service.spawn_session(
            context,
            self.price_rx.clone(),
            self.on_update.clone(),
            self.generation.clone(),
        );
        self.current.insert(handle)
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.current.take() {
            handle.stop();
        }
    }

    pub fn current(&self) -> Option<&FeedHandle> {
        self.current.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}
