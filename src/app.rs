//! The poll, render and display loop.
//!
//! ```text
//!   Startup ──▶ Polling ──▶ Rendering ──▶ IdleWait ──┐
//!      │           ▲                        │  ▲     │ clear
//!      │           └──── tick / refresh ────┘  └─────┘
//!      │                                    │
//!      └─ init failed ─▶ error       shutdown / signal
//!                                           ▼
//!                                     ShuttingDown ──▶ Stopped
//! ```

use std::mem;
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use crate::data::StatusSnapshot;
use crate::display::{ClearColor, Panel, RefreshMode};
use crate::error::DriverError;
use crate::events::{ActionReceiver, ButtonAction};
use crate::notify::{AlertNotifier, NotificationState};
use crate::source::{local_ip, StatusSource};
use crate::ui::{self, export, Raster, RenderConfig};

/// Pause between panel bring-up attempts.
const STARTUP_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Where the main loop is.
#[derive(Debug)]
pub enum LoopState {
    Startup,
    Polling,
    Rendering(Box<StatusSnapshot>),
    IdleWait,
    ShuttingDown,
    Stopped,
}

impl LoopState {
    pub fn name(&self) -> &'static str {
        match self {
            LoopState::Startup => "startup",
            LoopState::Polling => "polling",
            LoopState::Rendering(_) => "rendering",
            LoopState::IdleWait => "idle-wait",
            LoopState::ShuttingDown => "shutting-down",
            LoopState::Stopped => "stopped",
        }
    }
}

/// Full refresh on the first cycle and every `full_every` cycles after it,
/// partial otherwise. A `full_every` of 0 or 1 makes every refresh full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPolicy {
    full_every: u64,
}

impl RefreshPolicy {
    pub fn new(full_every: u64) -> Self {
        Self { full_every }
    }

    pub fn mode(&self, cycle: u64) -> RefreshMode {
        if self.full_every <= 1 || cycle <= 1 || (cycle - 1) % self.full_every == 0 {
            RefreshMode::Full
        } else {
            RefreshMode::Partial
        }
    }
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self::new(12)
    }
}

enum Wake {
    Tick,
    Action(Option<ButtonAction>),
    Shutdown(bool),
}

/// Owns the panel and drives the state machine.
pub struct Daemon {
    source: Box<dyn StatusSource>,
    notifier: AlertNotifier,
    notified: NotificationState,
    panel: Box<dyn Panel>,
    render: RenderConfig,
    policy: RefreshPolicy,
    interval: Duration,
    startup_attempts: u32,
    debug_image: Option<PathBuf>,
    display_ip: Option<IpAddr>,
    once: bool,

    actions: ActionReceiver,
    buttons_connected: bool,
    shutdown: watch::Receiver<bool>,
    signals_connected: bool,

    state: LoopState,
    cycle: u64,
    next_tick: Instant,
}

impl Daemon {
    pub fn new(
        source: Box<dyn StatusSource>,
        panel: Box<dyn Panel>,
        actions: ActionReceiver,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let (width, height) = panel.size();
        Self {
            source,
            notifier: AlertNotifier::default(),
            notified: NotificationState::new(),
            panel,
            render: RenderConfig {
                width,
                height,
                ..Default::default()
            },
            policy: RefreshPolicy::default(),
            interval: Duration::from_secs(300),
            startup_attempts: 3,
            debug_image: None,
            display_ip: None,
            once: false,
            actions,
            buttons_connected: true,
            shutdown,
            signals_connected: true,
            state: LoopState::Startup,
            cycle: 0,
            next_tick: Instant::now(),
        }
    }

    pub fn with_notifier(mut self, notifier: AlertNotifier) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_render_config(mut self, render: RenderConfig) -> Self {
        self.render = render;
        self
    }

    pub fn with_refresh_policy(mut self, policy: RefreshPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_startup_attempts(mut self, attempts: u32) -> Self {
        self.startup_attempts = attempts.max(1);
        self
    }

    /// Write a PNG of every frame to `path`.
    pub fn with_debug_image(mut self, path: Option<PathBuf>) -> Self {
        self.debug_image = path;
        self
    }

    /// Show this address instead of probing the local interface.
    pub fn with_display_ip(mut self, ip: IpAddr) -> Self {
        self.display_ip = Some(ip);
        self
    }

    /// Stop after the first frame, leaving it on the panel.
    pub fn once(mut self, once: bool) -> Self {
        self.once = once;
        self
    }

    pub fn state(&self) -> &LoopState {
        &self.state
    }

    /// Number of polling cycles started so far.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Run until stopped. Fails only if the panel never comes up.
    pub async fn run(&mut self) -> Result<(), DriverError> {
        tracing::info!(
            source = self.source.description(),
            interval_secs = self.interval.as_secs(),
            "Starting"
        );
        while !matches!(self.state, LoopState::Stopped) {
            self.step().await?;
        }
        tracing::info!(cycles = self.cycle, "Stopped");
        Ok(())
    }

    /// Advance the state machine by one transition.
    pub async fn step(&mut self) -> Result<(), DriverError> {
        let state = mem::replace(&mut self.state, LoopState::Stopped);
        tracing::trace!(state = state.name(), "Step");

        self.state = match state {
            LoopState::Startup => self.startup().await?,
            LoopState::Polling => self.poll().await,
            LoopState::Rendering(snapshot) => self.show(&snapshot),
            LoopState::IdleWait => self.idle().await,
            LoopState::ShuttingDown => self.shut_down(),
            LoopState::Stopped => LoopState::Stopped,
        };
        Ok(())
    }

    async fn startup(&mut self) -> Result<LoopState, DriverError> {
        let mut attempt = 1;
        loop {
            match self.panel.init() {
                Ok(()) => {
                    tracing::info!(attempt, "Panel ready");
                    return Ok(LoopState::Polling);
                }
                Err(e) if attempt < self.startup_attempts => {
                    tracing::warn!(attempt, "Panel initialisation failed: {}", e);
                    tokio::time::sleep(STARTUP_RETRY_DELAY).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!(attempts = attempt, "Giving up on the panel: {}", e);
                    return Err(e);
                }
            }
        }
    }

    async fn poll(&mut self) -> LoopState {
        self.cycle += 1;
        let ip = self.display_ip.unwrap_or_else(local_ip);

        let snapshot = match self.source.fetch().await {
            Ok(report) => StatusSnapshot::from_report(self.cycle, report, Some(ip)),
            Err(e) => {
                tracing::error!(cycle = self.cycle, "Could not fetch receiver status: {}", e);
                StatusSnapshot::unavailable(self.cycle, e.summary(), Some(ip))
            }
        };
        tracing::info!(
            cycle = self.cycle,
            health = snapshot.health.label(),
            "Polled {}",
            self.source.description()
        );

        self.notifier
            .maybe_notify(&snapshot, &mut self.notified)
            .await;

        LoopState::Rendering(Box::new(snapshot))
    }

    fn show(&mut self, snapshot: &StatusSnapshot) -> LoopState {
        let frame = ui::render(snapshot, &self.render);
        let mode = self.policy.mode(snapshot.cycle);

        match self.write_frame(&frame, mode) {
            Ok(()) => tracing::debug!(cycle = snapshot.cycle, ?mode, "Panel updated"),
            Err(e) => tracing::error!(cycle = snapshot.cycle, "Panel update failed: {}", e),
        }
        self.write_debug_image(&frame);

        self.next_tick = Instant::now() + self.interval;
        if self.once {
            LoopState::Stopped
        } else {
            LoopState::IdleWait
        }
    }

    fn write_frame(&mut self, frame: &Raster, mode: RefreshMode) -> Result<(), DriverError> {
        self.panel.init()?;
        let shown = self.panel.display(frame, mode);
        let slept = self.panel.sleep();
        shown.and(slept)
    }

    fn write_debug_image(&self, frame: &Raster) {
        let Some(path) = &self.debug_image else {
            return;
        };
        if let Err(e) = export::write_png(frame, path) {
            tracing::warn!(path = %path.display(), "Could not write debug image: {}", e);
        }
    }

    async fn idle(&mut self) -> LoopState {
        if *self.shutdown.borrow() {
            return LoopState::ShuttingDown;
        }
        if let Some(action) = self.actions.try_take() {
            return self.on_action(action);
        }

        let wake = tokio::select! {
            _ = tokio::time::sleep_until(self.next_tick) => Wake::Tick,
            action = self.actions.recv(), if self.buttons_connected => Wake::Action(action),
            changed = self.shutdown.changed(), if self.signals_connected => {
                Wake::Shutdown(changed.is_ok())
            }
        };

        match wake {
            Wake::Tick => LoopState::Polling,
            Wake::Action(Some(action)) => self.on_action(action),
            Wake::Action(None) => {
                tracing::debug!("Button watcher gone");
                self.buttons_connected = false;
                LoopState::IdleWait
            }
            Wake::Shutdown(true) if *self.shutdown.borrow() => LoopState::ShuttingDown,
            Wake::Shutdown(true) => LoopState::IdleWait,
            Wake::Shutdown(false) => {
                self.signals_connected = false;
                LoopState::IdleWait
            }
        }
    }

    fn on_action(&mut self, action: ButtonAction) -> LoopState {
        match action {
            ButtonAction::None => LoopState::IdleWait,
            ButtonAction::Refresh => {
                tracing::info!("Refresh requested");
                LoopState::Polling
            }
            ButtonAction::Clear(color) => {
                tracing::info!(%color, "Clearing panel");
                if let Err(e) = self.clear(color) {
                    tracing::error!("Panel clear failed: {}", e);
                }
                LoopState::IdleWait
            }
            ButtonAction::Shutdown => {
                tracing::info!("Shutdown requested");
                LoopState::ShuttingDown
            }
        }
    }

    fn clear(&mut self, color: ClearColor) -> Result<(), DriverError> {
        self.panel.init()?;
        let cleared = self.panel.clear(color);
        let slept = self.panel.sleep();
        cleared.and(slept)
    }

    fn shut_down(&mut self) -> LoopState {
        tracing::info!("Shutting down");
        if let Err(e) = self.clear(ClearColor::White) {
            tracing::error!("Could not clear panel on shutdown: {}", e);
        }
        LoopState::Stopped
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::net::Ipv4Addr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use piaware_types::{Component, EmergencySquawk, PiAwareStatus};

    use super::*;
    use crate::data::{AircraftSummary, Emergency, FeedHealth, StatusReport};
    use crate::display::{PanelCall, SimulatedPanel};
    use crate::error::SourceError;
    use crate::events::{action_channel, ActionSender};
    use crate::notify::tests::RecordingNotifier;

    #[derive(Debug, Default)]
    struct FakeSource {
        replies: VecDeque<Result<StatusReport, SourceError>>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl StatusSource for FakeSource {
        async fn fetch(&mut self) -> Result<StatusReport, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.replies.pop_front().unwrap_or_else(|| Ok(report()))
        }

        fn description(&self) -> &str {
            "fake"
        }
    }

    fn report() -> StatusReport {
        StatusReport {
            status: PiAwareStatus {
                time: Some(1_700_000_000_000.0),
                system_uptime: Some(3600.0),
                piaware: Some(Component::new("green", "PiAware is running")),
                gps: Some(Component::new("green", "GPS fix")),
                radio: Some(Component::new("green", "Radio OK")),
                ..Default::default()
            },
            aircraft: Some(AircraftSummary::default()),
            ..Default::default()
        }
    }

    fn emergency_report() -> StatusReport {
        let mut report = report();
        report.aircraft = Some(AircraftSummary {
            total: 1,
            emergencies: vec![Emergency {
                hex: "3c6444".to_string(),
                callsign: Some("DLH4AB".to_string()),
                squawk: EmergencySquawk::GeneralEmergency,
                distance_km: Some(10.0),
            }],
            ..Default::default()
        });
        report
    }

    struct Harness {
        daemon: Daemon,
        panel: SimulatedPanel,
        buttons: ActionSender,
        shutdown: watch::Sender<bool>,
        fetches: Arc<AtomicUsize>,
    }

    fn harness(replies: Vec<Result<StatusReport, SourceError>>) -> Harness {
        let panel = SimulatedPanel::new(264, 176);
        let (buttons, actions) = action_channel();
        let (shutdown, shutdown_rx) = watch::channel(false);
        let source = FakeSource {
            replies: replies.into(),
            ..Default::default()
        };
        let fetches = source.calls.clone();
        let daemon = Daemon::new(Box::new(source), Box::new(panel.clone()), actions, shutdown_rx)
            .with_display_ip(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20)))
            .with_refresh_policy(RefreshPolicy::new(3));
        Harness {
            daemon,
            panel,
            buttons,
            shutdown,
            fetches,
        }
    }

    impl Harness {
        /// Step until the daemon sits in `IdleWait` again.
        async fn run_cycle(&mut self) {
            loop {
                self.daemon.step().await.unwrap();
                if matches!(self.daemon.state(), LoopState::IdleWait) {
                    break;
                }
            }
        }

        fn frame_calls(&self) -> Vec<PanelCall> {
            self.panel
                .calls()
                .into_iter()
                .filter(|c| {
                    matches!(c, PanelCall::DisplayFull { .. } | PanelCall::DisplayPartial { .. })
                })
                .collect()
        }
    }

    #[test]
    fn test_refresh_policy() {
        let policy = RefreshPolicy::new(3);
        let modes: Vec<_> = (1..=7).map(|c| policy.mode(c)).collect();
        assert_eq!(
            modes,
            vec![
                RefreshMode::Full,
                RefreshMode::Partial,
                RefreshMode::Partial,
                RefreshMode::Full,
                RefreshMode::Partial,
                RefreshMode::Partial,
                RefreshMode::Full,
            ]
        );
        assert_eq!(RefreshPolicy::new(1).mode(2), RefreshMode::Full);
        assert_eq!(RefreshPolicy::new(0).mode(5), RefreshMode::Full);
    }

    #[tokio::test(start_paused = true)]
    async fn test_once_draws_a_single_full_frame() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("epaper.png");
        let mut h = harness(vec![]);
        h.daemon = h.daemon.once(true).with_debug_image(Some(image.clone()));

        h.daemon.run().await.unwrap();

        assert_eq!(h.daemon.cycle(), 1);
        assert_eq!(h.fetches.load(Ordering::SeqCst), 1);
        let calls = h.panel.calls();
        assert_eq!(calls[0], PanelCall::Init);
        assert!(matches!(calls[2], PanelCall::DisplayFull { black_ink, .. } if black_ink > 0));
        assert_eq!(calls.last(), Some(&PanelCall::Sleep));
        // The frame stays on the panel.
        assert!(!calls.contains(&PanelCall::Clear(ClearColor::White)));
        assert!(image.exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_startup_exhaustion_is_fatal() {
        let mut h = harness(vec![]);
        h.panel.fail_init(5);
        h.daemon = h.daemon.with_startup_attempts(3);

        let err = h.daemon.run().await.unwrap_err();

        assert!(matches!(err, DriverError::Init(_)));
        assert_eq!(h.panel.calls(), vec![PanelCall::Init; 3]);
        assert_eq!(h.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_startup_retries_then_polls() {
        let mut h = harness(vec![]);
        h.panel.fail_init(2);
        h.daemon = h.daemon.with_startup_attempts(3);

        h.daemon.step().await.unwrap();

        assert!(matches!(h.daemon.state(), LoopState::Polling));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_polls_again_and_uses_partial_refresh() {
        let mut h = harness(vec![]);
        h.run_cycle().await;

        let start = Instant::now();
        h.run_cycle().await;
        assert!(start.elapsed() >= Duration::from_secs(300));

        h.run_cycle().await;
        h.run_cycle().await;

        assert_eq!(h.fetches.load(Ordering::SeqCst), 4);
        let frames = h.frame_calls();
        assert!(matches!(frames[0], PanelCall::DisplayFull { .. }));
        assert!(matches!(frames[1], PanelCall::DisplayPartial { .. }));
        assert!(matches!(frames[2], PanelCall::DisplayPartial { .. }));
        assert!(matches!(frames[3], PanelCall::DisplayFull { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_button_skips_the_wait() {
        let mut h = harness(vec![]);
        h.run_cycle().await;

        h.buttons.press(ButtonAction::Refresh);
        let start = Instant::now();
        h.daemon.step().await.unwrap();

        assert!(matches!(h.daemon.state(), LoopState::Polling));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_stays_idle() {
        let mut h = harness(vec![]);
        h.run_cycle().await;

        let frames_before = h.frame_calls().len();
        h.buttons.press(ButtonAction::Clear(ClearColor::Black));
        h.daemon.step().await.unwrap();

        assert!(matches!(h.daemon.state(), LoopState::IdleWait));
        let clears = h
            .panel
            .calls()
            .into_iter()
            .filter(|c| matches!(c, PanelCall::Clear(_)))
            .collect::<Vec<_>>();
        assert_eq!(clears, vec![PanelCall::Clear(ClearColor::Black)]);
        assert_eq!(h.frame_calls().len(), frames_before);
        assert_eq!(h.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(h.daemon.cycle(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_press_while_waiting() {
        let mut h = harness(vec![]);
        h.run_cycle().await;

        let buttons = h.buttons;
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(10)).await;
            buttons.press(ButtonAction::Refresh);
        });
        let start = Instant::now();
        h.daemon.step().await.unwrap();

        assert!(matches!(h.daemon.state(), LoopState::Polling));
        assert!(start.elapsed() < Duration::from_secs(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_button_clears_and_stops() {
        let mut h = harness(vec![]);
        h.run_cycle().await;

        h.buttons.press(ButtonAction::Shutdown);
        h.daemon.run().await.unwrap();

        assert!(matches!(h.daemon.state(), LoopState::Stopped));
        let calls = h.panel.calls();
        let tail = &calls[calls.len() - 3..];
        assert_eq!(
            tail,
            &[
                PanelCall::Init,
                PanelCall::Clear(ClearColor::White),
                PanelCall::Sleep
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_signal_beats_pending_button() {
        let mut h = harness(vec![]);
        h.run_cycle().await;

        h.buttons.press(ButtonAction::Refresh);
        h.shutdown.send(true).unwrap();
        h.daemon.step().await.unwrap();

        assert!(matches!(h.daemon.state(), LoopState::ShuttingDown));
    }

    #[tokio::test(start_paused = true)]
    async fn test_signal_while_waiting() {
        let mut h = harness(vec![]);
        h.run_cycle().await;

        let shutdown = h.shutdown;
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            shutdown.send(true).unwrap();
        });
        h.daemon.run().await.unwrap();

        assert_eq!(h.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(h.panel.calls().last(), Some(&PanelCall::Sleep));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_failure_renders_unreachable() {
        let failure = SourceError::Fetch {
            url: "http://127.0.0.1:8080/status.json".to_string(),
            attempts: 11,
            reason: "connection refused".to_string(),
        };
        let mut h = harness(vec![Err(failure)]);

        h.daemon.step().await.unwrap();
        h.daemon.step().await.unwrap();
        match h.daemon.state() {
            LoopState::Rendering(snapshot) => {
                assert_eq!(snapshot.health, FeedHealth::Unreachable);
                assert_eq!(snapshot.fetch_error.as_deref(), Some("Failed API Call"));
            }
            other => panic!("unexpected state {:?}", other),
        }

        h.daemon.step().await.unwrap();
        assert!(matches!(h.daemon.state(), LoopState::IdleWait));
        assert_eq!(h.frame_calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panel_errors_do_not_stop_the_loop() {
        let mut h = harness(vec![]);
        h.daemon.step().await.unwrap();
        h.panel.fail_frames(true);

        h.run_cycle().await;
        h.run_cycle().await;

        assert_eq!(h.daemon.cycle(), 2);
        assert!(h.frame_calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_emergency_is_notified_once() {
        let notifier = RecordingNotifier::default();
        let sent = notifier.sent.clone();
        let mut h = harness(vec![Ok(emergency_report()), Ok(emergency_report())]);
        h.daemon = h
            .daemon
            .with_notifier(AlertNotifier::new(Some(Box::new(notifier))));

        h.run_cycle().await;
        h.run_cycle().await;

        assert_eq!(h.fetches.load(Ordering::SeqCst), 2);
        assert_eq!(sent.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_button_watcher_falls_back_to_ticks() {
        let mut h = harness(vec![]);
        h.run_cycle().await;

        drop(h.buttons);
        h.daemon.step().await.unwrap();
        assert!(matches!(h.daemon.state(), LoopState::IdleWait));

        h.daemon.step().await.unwrap();
        assert!(matches!(h.daemon.state(), LoopState::Polling));
    }
}
