//! Session lifecycle, poll loop and snapshot publication.

use std::{
    sync::{Arc, Weak},
    time::Duration,
};

use shared::protocol::{SessionHandle, SimulationConfig};
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use crate::{
    client::SessionApi,
    error::ClientError,
    metrics::{Metrics, TerminationRule},
    orientation::OrientationMemory,
    snapshot::Snapshot,
};

pub const DEFAULT_BASE_PERIOD: Duration = Duration::from_millis(300);
pub const DEFAULT_SIM_SPEED: f64 = 2.0;
const MIN_POLL_PERIOD: Duration = Duration::from_millis(1);
const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    Idle,
    Configuring,
    Ready,
    Running,
    Stopped,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerSettings {
    /// Poll period at speed 1.
    pub base_period: Duration,
    pub sim_speed: f64,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            base_period: DEFAULT_BASE_PERIOD,
            sim_speed: DEFAULT_SIM_SPEED,
        }
    }
}

pub fn validate_sim_speed(speed: f64) -> Result<(), ClientError> {
    if speed.is_finite() && speed > 0.0 {
        Ok(())
    } else {
        Err(ClientError::InvalidConfig(format!(
            "simulation speed must be a positive number, got {speed}"
        )))
    }
}

pub fn poll_period(base_period: Duration, sim_speed: f64) -> Duration {
    let nanos = (base_period.as_nanos() as f64 / sim_speed).round();
    Duration::from_nanos(nanos as u64).max(MIN_POLL_PERIOD)
}

#[derive(Debug, Clone)]
pub enum ControllerEvent {
    Lifecycle(LifecycleState),
    Snapshot(Arc<Snapshot>),
    Error(ClientError),
}

#[derive(Debug, Clone)]
pub struct ControllerView {
    pub lifecycle: LifecycleState,
    pub snapshot: Option<Arc<Snapshot>>,
    pub metrics: Option<Metrics>,
    pub last_error: Option<ClientError>,
}

type SnapshotListener = Arc<dyn Fn(&Arc<Snapshot>) + Send + Sync>;
type ErrorListener = Arc<dyn Fn(&ClientError) + Send + Sync>;

struct ControllerState {
    lifecycle: LifecycleState,
    /// Bumped whenever polling is cancelled or restarted; stale tick results compare against it.
    generation: u64,
    config: Option<SimulationConfig>,
    handle: Option<SessionHandle>,
    snapshot: Option<Arc<Snapshot>>,
    orientation: OrientationMemory,
    completion_history: Vec<f64>,
    last_error: Option<ClientError>,
    sim_speed: f64,
    poll_task: Option<JoinHandle<()>>,
    snapshot_listeners: Vec<SnapshotListener>,
    error_listeners: Vec<ErrorListener>,
}

impl ControllerState {
    fn new(sim_speed: f64) -> Self {
        Self {
            lifecycle: LifecycleState::Idle,
            generation: 0,
            config: None,
            handle: None,
            snapshot: None,
            orientation: OrientationMemory::new(),
            completion_history: Vec::new(),
            last_error: None,
            sim_speed,
            poll_task: None,
            snapshot_listeners: Vec::new(),
            error_listeners: Vec::new(),
        }
    }

    fn cancel_polling(&mut self) {
        self.generation += 1;
        if let Some(task) = self.poll_task.take() {
            task.abort();
        }
    }

    fn published_iteration(&self) -> Option<u64> {
        self.snapshot.as_ref().map(|snapshot| snapshot.iteration)
    }
}

/// Drives one remote simulation session at a time.
///
/// Listeners registered through [`SessionController::on_snapshot`] and
/// [`SessionController::on_error`] run while the controller state is locked, so
/// they must return quickly and must not block on the controller.
pub struct SessionController {
    client: Arc<dyn SessionApi>,
    base_period: Duration,
    inner: Mutex<ControllerState>,
    events: broadcast::Sender<ControllerEvent>,
}

impl SessionController {
    pub fn new(
        client: Arc<dyn SessionApi>,
        settings: ControllerSettings,
    ) -> Result<Arc<Self>, ClientError> {
        validate_sim_speed(settings.sim_speed)?;
        if settings.base_period.is_zero() {
            return Err(ClientError::InvalidConfig(
                "base poll period must be non-zero".to_string(),
            ));
        }
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Arc::new(Self {
            client,
            base_period: settings.base_period,
            inner: Mutex::new(ControllerState::new(settings.sim_speed)),
            events,
        }))
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    pub async fn on_snapshot<F>(&self, listener: F)
    where
        F: Fn(&Arc<Snapshot>) + Send + Sync + 'static,
    {
        self.inner
            .lock()
            .await
            .snapshot_listeners
            .push(Arc::new(listener));
    }

    pub async fn on_error<F>(&self, listener: F)
    where
        F: Fn(&ClientError) + Send + Sync + 'static,
    {
        self.inner
            .lock()
            .await
            .error_listeners
            .push(Arc::new(listener));
    }

    pub async fn current_state(&self) -> ControllerView {
        let guard = self.inner.lock().await;
        ControllerView {
            lifecycle: guard.lifecycle,
            snapshot: guard.snapshot.clone(),
            metrics: guard.snapshot.as_ref().map(|snapshot| snapshot.metrics),
            last_error: guard.last_error.clone(),
        }
    }

    pub async fn lifecycle(&self) -> LifecycleState {
        self.inner.lock().await.lifecycle
    }

    /// Completion fraction of every snapshot published since the last `start()`.
    pub async fn completion_history(&self) -> Vec<f64> {
        self.inner.lock().await.completion_history.clone()
    }

    pub async fn sim_speed(&self) -> f64 {
        self.inner.lock().await.sim_speed
    }

    pub async fn poll_period(&self) -> Duration {
        poll_period(self.base_period, self.inner.lock().await.sim_speed)
    }

    /// Creates a fresh remote session, discarding whatever run was in progress.
    pub async fn configure(&self, config: SimulationConfig) -> Result<(), ClientError> {
        config.validate()?;

        let generation = {
            let mut guard = self.inner.lock().await;
            guard.cancel_polling();
            guard.handle = None;
            guard.snapshot = None;
            guard.orientation.clear();
            guard.completion_history.clear();
            guard.last_error = None;
            guard.config = Some(config.clone());
            self.set_lifecycle(&mut guard, LifecycleState::Configuring);
            guard.generation
        };

        info!(
            variant = %config.variant,
            width = config.width,
            height = config.height,
            number = config.number,
            "session: configuring simulation"
        );
        let result = self.client.create_session(&config).await;

        let mut guard = self.inner.lock().await;
        if guard.generation != generation {
            debug!("session: discarding superseded configure result");
            return result.map(|_| ());
        }

        match result {
            Ok(created) => {
                // Seed poses are all absolute; polling starts from an empty memory.
                let mut seed_memory = OrientationMemory::new();
                let snapshot =
                    Snapshot::build(0, config.variant, created.state, &mut seed_memory);
                info!(
                    location = %created.handle,
                    entities = snapshot.entity_count(),
                    "session: simulation created"
                );
                guard.handle = Some(created.handle);
                self.publish_snapshot(&mut guard, snapshot);
                self.set_lifecycle(&mut guard, LifecycleState::Ready);
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "session: failed to create simulation");
                guard.handle = None;
                self.set_lifecycle(&mut guard, LifecycleState::Failed);
                self.report_error(&mut guard, err.clone());
                Err(err)
            }
        }
    }

    pub async fn start(self: &Arc<Self>) {
        let mut guard = self.inner.lock().await;
        match guard.lifecycle {
            LifecycleState::Running => {
                debug!("session: start ignored, already running");
                return;
            }
            LifecycleState::Ready | LifecycleState::Stopped => {}
            other => {
                warn!(state = ?other, "session: start ignored, no configured session");
                return;
            }
        }
        if guard.handle.is_none() {
            warn!("session: start ignored, missing session handle");
            return;
        }

        guard.completion_history.clear();
        self.spawn_poll_task(&mut guard);
        self.set_lifecycle(&mut guard, LifecycleState::Running);
    }

    /// Halts polling. Results of a fetch still in flight are dropped.
    pub async fn stop(&self) {
        let mut guard = self.inner.lock().await;
        match guard.lifecycle {
            LifecycleState::Running | LifecycleState::Stopped => {}
            other => {
                debug!(state = ?other, "session: stop ignored");
                return;
            }
        }
        guard.cancel_polling();
        guard.orientation.clear();
        if guard.lifecycle != LifecycleState::Stopped {
            self.set_lifecycle(&mut guard, LifecycleState::Stopped);
        }
    }

    /// Changes the polling cadence; a running loop is restarted at the new period.
    pub async fn set_sim_speed(self: &Arc<Self>, sim_speed: f64) -> Result<(), ClientError> {
        validate_sim_speed(sim_speed)?;
        let mut guard = self.inner.lock().await;
        guard.sim_speed = sim_speed;
        info!(
            sim_speed,
            period_ms = poll_period(self.base_period, sim_speed).as_millis() as u64,
            "session: simulation speed changed"
        );
        if guard.lifecycle == LifecycleState::Running {
            self.spawn_poll_task(&mut guard);
        }
        Ok(())
    }

    fn spawn_poll_task(self: &Arc<Self>, state: &mut ControllerState) {
        state.cancel_polling();
        let generation = state.generation;
        let period = poll_period(self.base_period, state.sim_speed);
        let controller = Arc::downgrade(self);
        debug!(generation, period_ms = period.as_millis() as u64, "session: starting poll loop");
        state.poll_task = Some(tokio::spawn(poll_loop(controller, generation, period)));
    }

    /// One fetch-and-publish cycle. Returns whether the loop should keep going.
    async fn run_tick(&self, generation: u64) -> bool {
        let (handle, variant) = {
            let guard = self.inner.lock().await;
            if guard.generation != generation || guard.lifecycle != LifecycleState::Running {
                return false;
            }
            match (&guard.handle, &guard.config) {
                (Some(handle), Some(config)) => (handle.clone(), config.variant),
                _ => return false,
            }
        };

        let result = self.client.fetch_state(&handle).await;

        let mut guard = self.inner.lock().await;
        if guard.generation != generation || guard.lifecycle != LifecycleState::Running {
            debug!(generation, "session: discarding result of cancelled tick");
            return false;
        }

        let state = match result {
            Ok(state) => state,
            Err(err) => {
                warn!(location = %handle, error = %err, "session: poll failed");
                self.report_error(&mut guard, err);
                return true;
            }
        };

        let finished = TerminationRule::for_variant(variant).is_met(&state);
        let iteration = guard.published_iteration().map_or(0, |current| current + 1);
        let snapshot = Snapshot::build(iteration, variant, state, &mut guard.orientation);
        let completion = snapshot.metrics.completion_fraction();
        if self.publish_snapshot(&mut guard, snapshot).is_some() {
            guard.completion_history.push(completion);
        }

        if finished {
            info!(iteration, location = %handle, "session: simulation finished");
            guard.generation += 1;
            guard.poll_task = None;
            guard.orientation.clear();
            self.set_lifecycle(&mut guard, LifecycleState::Stopped);
            return false;
        }
        true
    }

    /// Swaps in `snapshot` unless a newer one is already published.
    fn publish_snapshot(
        &self,
        state: &mut ControllerState,
        snapshot: Snapshot,
    ) -> Option<Arc<Snapshot>> {
        if let Some(current) = state.published_iteration() {
            if snapshot.iteration < current {
                warn!(
                    stale = snapshot.iteration,
                    current, "session: dropping out-of-order snapshot"
                );
                return None;
            }
        }

        let snapshot = Arc::new(snapshot);
        debug!(
            iteration = snapshot.iteration,
            completion = %snapshot.metrics.completion_label(),
            "session: publishing snapshot"
        );
        state.snapshot = Some(Arc::clone(&snapshot));
        for listener in &state.snapshot_listeners {
            listener(&snapshot);
        }
        let _ = self
            .events
            .send(ControllerEvent::Snapshot(Arc::clone(&snapshot)));
        Some(snapshot)
    }

    fn report_error(&self, state: &mut ControllerState, err: ClientError) {
        for listener in &state.error_listeners {
            listener(&err);
        }
        state.last_error = Some(err.clone());
        let _ = self.events.send(ControllerEvent::Error(err));
    }

    fn set_lifecycle(&self, state: &mut ControllerState, next: LifecycleState) {
        if state.lifecycle == next {
            return;
        }
        info!(from = ?state.lifecycle, to = ?next, "session: lifecycle transition");
        state.lifecycle = next;
        let _ = self.events.send(ControllerEvent::Lifecycle(next));
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.inner.try_lock() {
            guard.cancel_polling();
        }
    }
}

async fn poll_loop(controller: Weak<SessionController>, generation: u64, period: Duration) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately; polling starts one period after `start()`.
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let Some(active) = controller.upgrade() else {
            break;
        };
        if !active.run_tick(generation).await {
            break;
        }
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
