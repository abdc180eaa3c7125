//! Link manager: discovery, connection lifecycle and the frame write loop.
//!
//! All driver state is mutated from one task. The run loop multiplexes
//! radio events, the write loop, driver timers, client polling and the
//! rescan delay with `tokio::select!`. A connection attempt is bounded by a
//! timeout and runs alongside driver timers and client polling.

use crate::clients::Client;
use crate::config::LinkConfig;
use crate::driver::{DisplayDriver, Driver, Profile};
use std::future::Future;
use std::time::Duration;
use tmbtled_hw::frame::FRAME_SIZE;
use tmbtled_hw::{
    ButtonReport, ButtonTracker, ConnectionParameters, DeviceId, DeviceMetadata, Error, LinkEvent,
    PairingStore, Radio,
};
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Connection state of the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Scanning,
    Connecting,
    Connected,
}

impl std::fmt::Display for LinkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkState::Disconnected => write!(f, "disconnected"),
            LinkState::Scanning => write!(f, "scanning"),
            LinkState::Connecting => write!(f, "connecting"),
            LinkState::Connected => write!(f, "connected"),
        }
    }
}

/// State of one connection, dropped on disconnect.
#[derive(Debug)]
struct Session {
    device: DeviceId,
    metadata: DeviceMetadata,
    buttons: ButtonTracker,
    last_sent: Option<[u8; FRAME_SIZE]>,
    /// Set once the radio has refused a parameter update.
    paced_locally: bool,
}

/// Converts a millisecond interval into a timer period.
fn period(interval_ms: f64) -> Duration {
    Duration::from_secs_f64(interval_ms.max(1.0) / 1000.0)
}

fn write_interval(interval_ms: f64) -> Interval {
    let period = period(interval_ms);
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Drives one cluster over a [`Radio`].
pub struct LinkManager<R: Radio> {
    radio: R,
    store: PairingStore,
    state: LinkState,
    session: Option<Session>,
    refresh_interval_ms: f64,
    performance_interval_ms: f64,
    rescan_delay: Duration,
    rescan_at: Option<Instant>,
    connect_timeout: Duration,
    pending: Option<(DeviceId, DeviceMetadata)>,
    profile: Option<Profile>,
    write_timer: Interval,
    writes: u64,
}

impl<R: Radio> LinkManager<R> {
    pub fn new(radio: R, store: PairingStore, config: &LinkConfig) -> Self {
        Self {
            radio,
            store,
            state: LinkState::Disconnected,
            session: None,
            refresh_interval_ms: config.refresh_interval_ms,
            performance_interval_ms: config.performance_interval_ms,
            rescan_delay: Duration::from_millis(config.rescan_delay_ms),
            rescan_at: None,
            connect_timeout: Duration::from_millis(config.connect_timeout_ms),
            pending: None,
            profile: None,
            write_timer: write_interval(config.refresh_interval_ms),
            writes: 0,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Current write loop period in milliseconds.
    pub fn refresh_interval_ms(&self) -> f64 {
        self.refresh_interval_ms
    }

    /// Number of frames handed to the radio.
    pub fn writes(&self) -> u64 {
        self.writes
    }

    #[cfg(test)]
    pub fn radio(&self) -> &R {
        &self.radio
    }

    fn set_state(&mut self, state: LinkState) {
        if self.state != state {
            debug!("Link {} -> {}", self.state, state);
            self.state = state;
        }
    }

    /// Starts scanning, retrying after the rescan delay on failure.
    pub async fn start_scan(&mut self) {
        self.rescan_at = None;
        match self.radio.start_scan().await {
            Ok(()) => {
                info!("Scanning for paired devices...");
                self.set_state(LinkState::Scanning);
            }
            Err(e) => {
                warn!("Failed to start scan: {}", e);
                self.schedule_rescan();
            }
        }
    }

    fn schedule_rescan(&mut self) {
        self.set_state(LinkState::Disconnected);
        self.rescan_at = Some(Instant::now() + self.rescan_delay);
    }

    /// Handles one inbound radio event.
    pub async fn handle_event(
        &mut self,
        event: LinkEvent,
        driver: &mut Driver,
        client: &mut dyn Client,
    ) {
        match event {
            LinkEvent::Discovered(device) => self.on_discovered(device).await,
            LinkEvent::Disconnected(device) => self.on_disconnected(device).await,
            LinkEvent::Report(data) => self.on_report(&data, driver, client),
            LinkEvent::ConnectionParametersRequested {
                min_interval_ms,
                max_interval_ms,
            } => {
                debug!(
                    "Peer requested connection interval {}-{} ms",
                    min_interval_ms, max_interval_ms
                );
                self.set_refresh_interval(max_interval_ms);
            }
            LinkEvent::ConnectionUpdated { interval_ms } => {
                self.set_refresh_interval(interval_ms);
            }
        }
    }

    async fn on_discovered(&mut self, device: DeviceId) {
        if self.state != LinkState::Scanning {
            return;
        }
        if !self.store.contains(&device) {
            debug!("Ignoring unpaired device {}", device);
            return;
        }

        info!("Found device config {}", device);
        let metadata = match self.store.load(&device) {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!("Failed to load pairing metadata for {}: {}", device, e);
                return;
            }
        };

        self.set_state(LinkState::Connecting);
        if let Err(e) = self.radio.stop_scan().await {
            debug!("Failed to stop scan: {}", e);
        }
        self.pending = Some((device, metadata));
    }

    /// Runs the connection attempt queued by discovery, if any.
    pub async fn connect_pending(&mut self) {
        if let Some((device, metadata)) = self.pending.take() {
            self.connect(device, metadata).await;
        }
    }

    async fn connect(&mut self, device: DeviceId, metadata: DeviceMetadata) {
        let attempt =
            tokio::time::timeout(self.connect_timeout, self.radio.connect(&device, &metadata)).await;
        let result = match attempt {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "Connecting to {} timed out after {:?}",
                    device, self.connect_timeout
                );
                if let Err(e) = self.radio.disconnect().await {
                    debug!("Cleanup after timed out connect: {}", e);
                }
                self.schedule_rescan();
                return;
            }
        };

        match result {
            Ok(bindings) => {
                if !bindings.events {
                    warn!("Button reports unavailable, mode buttons disabled");
                }
                info!("Connected to {}", device);
                self.session = Some(Session {
                    device,
                    metadata,
                    buttons: ButtonTracker::new(),
                    last_sent: None,
                    paced_locally: false,
                });
                self.set_state(LinkState::Connected);
                self.write_timer = write_interval(self.refresh_interval_ms);

                if let Some(profile) = self.profile {
                    self.request_profile(profile).await;
                }
            }
            Err(e) => {
                warn!("Failed to connect to {}: {}", device, e);
                if let Err(e) = self.radio.disconnect().await {
                    debug!("Cleanup after failed connect: {}", e);
                }
                self.schedule_rescan();
            }
        }
    }

    async fn on_disconnected(&mut self, device: DeviceId) {
        let ours = self
            .session
            .as_ref()
            .is_some_and(|session| session.device == device);
        if !ours {
            return;
        }

        if let Some(session) = self.session.take() {
            info!("Disconnected from {} ({})", session.metadata.name, device);
        }
        if let Err(e) = self.radio.disconnect().await {
            debug!("Cleanup after disconnect: {}", e);
        }
        self.schedule_rescan();
    }

    fn on_report(&mut self, data: &[u8], driver: &mut Driver, client: &mut dyn Client) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let report = match ButtonReport::parse(data) {
            Ok(report) => report,
            Err(e) => {
                debug!("Ignoring button report: {}", e);
                return;
            }
        };

        for edge in session.buttons.update(report) {
            debug!("{} button: {:?}", edge.side, edge.direction);
            if let Some(index) = driver.cycle_mode(edge.side, edge.direction) {
                client.on_mode_changed(driver, edge.side, edge.direction, index);
            }
        }
    }

    /// Changes the write loop period, restarting its timer.
    pub fn set_refresh_interval(&mut self, interval_ms: f64) {
        if !interval_ms.is_finite() || interval_ms <= 0.0 {
            warn!("Ignoring invalid refresh interval {}", interval_ms);
            return;
        }
        info!("Refresh interval set to {} ms", interval_ms);
        self.refresh_interval_ms = interval_ms;
        self.write_timer = write_interval(interval_ms);
    }

    fn parameters(&self, profile: Profile) -> ConnectionParameters {
        match profile {
            Profile::Performance => ConnectionParameters::performance(self.performance_interval_ms),
            Profile::PowerSave => ConnectionParameters::power_save(),
        }
    }

    /// Remembers a profile and requests it if connected.
    pub async fn request_profile(&mut self, profile: Profile) {
        self.profile = Some(profile);
        if self.state != LinkState::Connected {
            return;
        }

        let params = self.parameters(profile);
        match self.radio.update_connection(params).await {
            Ok(()) => debug!("Requested {:?} connection parameters", profile),
            Err(Error::Unsupported(what)) => {
                match self.session.as_mut() {
                    Some(session) if !session.paced_locally => {
                        warn!(
                            "{} unsupported by the radio, pacing writes locally",
                            what
                        );
                        session.paced_locally = true;
                    }
                    _ => debug!("{} unsupported, pacing writes locally", what),
                }
                self.set_refresh_interval(params.max_interval_ms);
            }
            Err(e) => {
                warn!("Connection parameter update failed: {}", e);
                self.set_refresh_interval(params.max_interval_ms);
            }
        }
    }

    /// Sends the frame if it changed since the last write.
    pub async fn write_tick(&mut self, driver: &Driver) {
        if self.state != LinkState::Connected {
            return;
        }
        let Some(session) = self.session.as_mut() else {
            return;
        };

        let frame = driver.pack();
        if session.last_sent == Some(frame) {
            return;
        }

        match self.radio.write_frame(&frame).await {
            Ok(()) => {
                session.last_sent = Some(frame);
                self.writes += 1;
            }
            Err(e) => warn!("Frame write failed: {}", e),
        }
    }

    fn poll_client(client: &mut dyn Client, driver: &mut Driver) {
        if let Err(e) = client.update(driver) {
            warn!("Client {} update failed: {}", client.name(), e);
        }
    }

    /// Runs until `shutdown` completes or the radio event channel closes.
    pub async fn run<F>(
        &mut self,
        events: &mut mpsc::Receiver<LinkEvent>,
        driver: &mut Driver,
        client: &mut dyn Client,
        shutdown: F,
    ) where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        info!("Starting client: {}", client.name());
        if let Err(e) = client.start(driver) {
            warn!("Client {} failed to start: {}", client.name(), e);
        }
        self.start_scan().await;

        let mut poll = tokio::time::interval(client.poll_interval());
        poll.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            if let Some(profile) = driver.take_profile_request() {
                self.request_profile(profile).await;
            }

            if self.pending.is_some() {
                let stopped = {
                    let connect = self.connect_pending();
                    tokio::pin!(connect);
                    loop {
                        let timer_deadline = driver.next_deadline();
                        tokio::select! {
                            _ = &mut connect => break false,
                            _ = &mut shutdown => break true,
                            _ = sleep_until(timer_deadline) => driver.fire_due_timers(Instant::now()),
                            _ = poll.tick() => Self::poll_client(client, driver),
                        }
                    }
                };
                if stopped {
                    info!("Shutting down link while connecting");
                    break;
                }
                continue;
            }

            let timer_deadline = driver.next_deadline();
            let rescan_at = self.rescan_at;

            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutting down link ({})", self.state);
                    break;
                }
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event, driver, client).await,
                    None => {
                        warn!("Radio event channel closed");
                        break;
                    }
                },
                _ = self.write_timer.tick() => self.write_tick(driver).await,
                _ = sleep_until(timer_deadline) => driver.fire_due_timers(Instant::now()),
                _ = poll.tick() => Self::poll_client(client, driver),
                _ = sleep_until(rescan_at) => self.start_scan().await,
            }
        }

        let timers = driver.timers();
        debug!(
            "{} timers active, {} created, {} cancelled",
            timers.len(),
            timers.created(),
            timers.cancelled()
        );

        client.stop(driver);
        driver.reset();
        self.write_tick(driver).await;
        if let Err(e) = self.radio.disconnect().await {
            debug!("Disconnect on shutdown failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UnitSystem;
    use tmbtled_hw::{Bindings, Direction, Side};

    #[derive(Default)]
    struct MockRadio {
        scans: usize,
        connects: usize,
        disconnects: usize,
        writes: Vec<Vec<u8>>,
        updates: Vec<ConnectionParameters>,
        missing_state: bool,
        no_events: bool,
        support_updates: bool,
        connect_delay: Option<Duration>,
    }

    impl Radio for MockRadio {
        async fn start_scan(&mut self) -> tmbtled_hw::Result<()> {
            self.scans += 1;
            Ok(())
        }

        async fn stop_scan(&mut self) -> tmbtled_hw::Result<()> {
            Ok(())
        }

        async fn connect(
            &mut self,
            _device: &DeviceId,
            _metadata: &DeviceMetadata,
        ) -> tmbtled_hw::Result<Bindings> {
            self.connects += 1;
            if let Some(delay) = self.connect_delay {
                tokio::time::sleep(delay).await;
            }
            if self.missing_state {
                return Err(Error::StateCharacteristicMissing);
            }
            Ok(Bindings {
                events: !self.no_events,
            })
        }

        async fn disconnect(&mut self) -> tmbtled_hw::Result<()> {
            self.disconnects += 1;
            Ok(())
        }

        async fn write_frame(&mut self, frame: &[u8]) -> tmbtled_hw::Result<()> {
            self.writes.push(frame.to_vec());
            Ok(())
        }

        async fn update_connection(
            &mut self,
            params: ConnectionParameters,
        ) -> tmbtled_hw::Result<()> {
            self.updates.push(params);
            if self.support_updates {
                Ok(())
            } else {
                Err(Error::Unsupported("connection parameter update"))
            }
        }
    }

    #[derive(Default)]
    struct RecordingClient {
        changes: Vec<(Side, Direction, usize)>,
        updates: usize,
    }

    impl Client for RecordingClient {
        fn name(&self) -> &str {
            "recording"
        }

        fn start(&mut self, _driver: &mut dyn DisplayDriver) -> anyhow::Result<()> {
            Ok(())
        }

        fn update(&mut self, _driver: &mut dyn DisplayDriver) -> anyhow::Result<()> {
            self.updates += 1;
            Ok(())
        }

        fn on_mode_changed(
            &mut self,
            _driver: &mut dyn DisplayDriver,
            side: Side,
            direction: Direction,
            index: usize,
        ) {
            self.changes.push((side, direction, index));
        }
    }

    const ADDRESS: &str = "AA:BB:CC:00:11:22";

    struct Harness {
        link: LinkManager<MockRadio>,
        driver: Driver,
        client: RecordingClient,
        dir: std::path::PathBuf,
    }

    impl Drop for Harness {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.dir);
        }
    }

    fn harness(name: &str, radio: MockRadio) -> Harness {
        let dir = std::env::temp_dir().join(format!("tmbtled-link-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("aabbcc001122.json"),
            r#"{ "uuid": "aabbcc001122", "address": "aa:bb:cc:00:11:22", "name": "TM BT LED" }"#,
        )
        .unwrap();

        Harness {
            link: LinkManager::new(radio, PairingStore::new(&dir), &LinkConfig::default()),
            driver: Driver::new(UnitSystem::Metric, Duration::from_millis(3000)),
            client: RecordingClient::default(),
            dir,
        }
    }

    impl Harness {
        async fn event(&mut self, event: LinkEvent) {
            self.link
                .handle_event(event, &mut self.driver, &mut self.client)
                .await;
            self.link.connect_pending().await;
        }

        async fn connect(&mut self) {
            self.link.start_scan().await;
            self.event(LinkEvent::Discovered(DeviceId::new(ADDRESS))).await;
        }

        async fn report(&mut self, left: u8, right: u8) {
            self.event(LinkEvent::Report(vec![0, left, right])).await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_connects_only_to_paired_devices() {
        let mut h = harness("paired", MockRadio::default());
        h.link.start_scan().await;
        assert_eq!(h.link.state(), LinkState::Scanning);

        h.event(LinkEvent::Discovered(DeviceId::new("01:02:03:04:05:06")))
            .await;
        assert_eq!(h.link.radio().connects, 0);
        assert_eq!(h.link.state(), LinkState::Scanning);

        h.event(LinkEvent::Discovered(DeviceId::new(ADDRESS))).await;
        assert_eq!(h.link.radio().connects, 1);
        assert_eq!(h.link.state(), LinkState::Connected);

        // Further discoveries are ignored once connected
        h.event(LinkEvent::Discovered(DeviceId::new(ADDRESS))).await;
        assert_eq!(h.link.radio().connects, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_times_out() {
        let radio = MockRadio {
            connect_delay: Some(Duration::from_secs(30)),
            ..Default::default()
        };
        let mut h = harness("connect-timeout", radio);

        let start = Instant::now();
        h.connect().await;
        assert_eq!(start.elapsed(), Duration::from_millis(10_000));
        assert_eq!(h.link.state(), LinkState::Disconnected);
        assert_eq!(h.link.radio().disconnects, 1);
        assert!(h.link.rescan_at.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_connect_keeps_timers_and_shutdown_running() {
        let radio = MockRadio {
            connect_delay: Some(Duration::from_secs(30)),
            ..Default::default()
        };
        let mut h = harness("slow-connect", radio);
        h.driver
            .show_temporary_on(Side::Left, "PIT", Duration::from_millis(300));

        let (tx, mut rx) = mpsc::channel(8);
        tx.send(LinkEvent::Discovered(DeviceId::new(ADDRESS)))
            .await
            .unwrap();

        let start = Instant::now();
        let Harness {
            link,
            driver,
            client,
            ..
        } = &mut h;
        link.run(
            &mut rx,
            driver,
            client,
            tokio::time::sleep(Duration::from_secs(1)),
        )
        .await;

        assert!(start.elapsed() < Duration::from_secs(5));
        assert_eq!(link.radio().connects, 1);
        // The expiry timer fired and the client kept polling while connecting
        assert!(!driver.overlays().is_occupied(Side::Left));
        assert!(client.updates > 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_identical_frames_are_sent_once() {
        let mut h = harness("suppress", MockRadio::default());
        h.connect().await;

        h.driver.set_rpm(5000.0, Side::Left);
        h.link.write_tick(&h.driver).await;
        h.driver.set_rpm(5000.0, Side::Left);
        h.link.write_tick(&h.driver).await;
        assert_eq!(h.link.radio().writes.len(), 1);
        assert_eq!(h.link.writes(), 1);

        h.driver.set_rpm(5100.0, Side::Left);
        h.link.write_tick(&h.driver).await;
        assert_eq!(h.link.radio().writes.len(), 2);
        assert_eq!(h.link.radio().writes[1], h.driver.pack().to_vec());
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_writes_while_disconnected() {
        let mut h = harness("offline", MockRadio::default());
        h.link.write_tick(&h.driver).await;
        assert!(h.link.radio().writes.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_buttons_cycle_modes() {
        let mut h = harness("buttons", MockRadio::default());
        h.driver.set_modes(
            Side::Left,
            vec!["SPD".to_string(), "RPM".to_string(), "GEAR".to_string()],
        );
        h.connect().await;

        for left in [10, 11, 12] {
            h.report(left, 0).await;
        }
        assert_eq!(
            h.client.changes,
            vec![
                (Side::Left, Direction::Next, 1),
                (Side::Left, Direction::Next, 2),
            ]
        );
        assert_eq!(h.driver.current_mode(Side::Left), 2);

        h.report(11, 0).await;
        assert_eq!(
            h.client.changes.last(),
            Some(&(Side::Left, Direction::Previous, 1))
        );

        // Short reports are ignored
        h.event(LinkEvent::Report(vec![0, 40])).await;
        assert_eq!(h.client.changes.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_rescans() {
        let mut h = harness("rescan", MockRadio::default());
        h.connect().await;
        h.report(5, 5).await;

        h.event(LinkEvent::Disconnected(DeviceId::new("01:02:03:04:05:06")))
            .await;
        assert_eq!(h.link.state(), LinkState::Connected);

        h.event(LinkEvent::Disconnected(DeviceId::new(ADDRESS))).await;
        assert_eq!(h.link.state(), LinkState::Disconnected);
        assert_eq!(h.link.radio().disconnects, 1);
        assert!(h.link.rescan_at.is_some());

        h.link.start_scan().await;
        assert_eq!(h.link.state(), LinkState::Scanning);
        assert_eq!(h.link.radio().scans, 2);

        // A fresh session starts with fresh button counters
        h.event(LinkEvent::Discovered(DeviceId::new(ADDRESS))).await;
        h.report(9, 9).await;
        assert!(h.client.changes.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_state_characteristic_aborts_session() {
        let radio = MockRadio {
            missing_state: true,
            ..Default::default()
        };
        let mut h = harness("missing-state", radio);
        h.connect().await;

        assert_eq!(h.link.state(), LinkState::Disconnected);
        assert!(h.link.rescan_at.is_some());
        h.link.write_tick(&h.driver).await;
        assert!(h.link.radio().writes.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_events_is_not_fatal() {
        let radio = MockRadio {
            no_events: true,
            ..Default::default()
        };
        let mut h = harness("no-events", radio);
        h.connect().await;
        assert_eq!(h.link.state(), LinkState::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_renegotiation_updates_interval() {
        let mut h = harness("renegotiate", MockRadio::default());
        h.connect().await;
        assert_eq!(h.link.refresh_interval_ms(), 250.0);

        h.event(LinkEvent::ConnectionUpdated { interval_ms: 30.0 })
            .await;
        assert_eq!(h.link.refresh_interval_ms(), 30.0);

        h.event(LinkEvent::ConnectionParametersRequested {
            min_interval_ms: 15.0,
            max_interval_ms: 45.0,
        })
        .await;
        assert_eq!(h.link.refresh_interval_ms(), 45.0);

        h.link.set_refresh_interval(f64::NAN);
        assert_eq!(h.link.refresh_interval_ms(), 45.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_timer_follows_interval() {
        let mut h = harness("write-timer", MockRadio::default());
        h.link.set_refresh_interval(20.0);

        let start = Instant::now();
        h.link.write_timer.tick().await;
        assert_eq!(start.elapsed(), Duration::from_millis(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_profile_is_reapplied_on_reconnect() {
        let mut h = harness("profile", MockRadio::default());

        // Requested before any connection: remembered only
        h.link.request_profile(Profile::Performance).await;
        assert!(h.link.radio().updates.is_empty());

        h.connect().await;
        assert_eq!(
            h.link.radio().updates,
            vec![ConnectionParameters::performance(17.5)]
        );
        // Unsupported by the radio: writes are paced locally
        assert_eq!(h.link.refresh_interval_ms(), 17.5);

        h.event(LinkEvent::Disconnected(DeviceId::new(ADDRESS))).await;
        h.connect().await;
        assert_eq!(h.link.radio().updates.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_local_pacing_flagged_once_per_session() {
        let mut h = harness("local-pacing", MockRadio::default());
        h.connect().await;
        assert!(!h.link.session.as_ref().unwrap().paced_locally);

        h.link.request_profile(Profile::PowerSave).await;
        assert!(h.link.session.as_ref().unwrap().paced_locally);
        assert_eq!(h.link.refresh_interval_ms(), 250.0);

        h.link.request_profile(Profile::Performance).await;
        assert!(h.link.session.as_ref().unwrap().paced_locally);
        assert_eq!(h.link.refresh_interval_ms(), 17.5);

        // A new session starts unflagged
        h.event(LinkEvent::Disconnected(DeviceId::new(ADDRESS))).await;
        h.link.profile = None;
        h.connect().await;
        assert!(!h.link.session.as_ref().unwrap().paced_locally);
    }

    #[tokio::test(start_paused = true)]
    async fn test_supported_update_waits_for_peer() {
        let radio = MockRadio {
            support_updates: true,
            ..Default::default()
        };
        let mut h = harness("supported", radio);
        h.connect().await;

        h.link.request_profile(Profile::PowerSave).await;
        assert_eq!(
            h.link.radio().updates,
            vec![ConnectionParameters::power_save()]
        );
        assert_eq!(h.link.refresh_interval_ms(), 250.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_shutdown() {
        let mut h = harness("run", MockRadio::default());
        let (tx, mut rx) = mpsc::channel(8);
        tx.send(LinkEvent::Discovered(DeviceId::new(ADDRESS)))
            .await
            .unwrap();

        let Harness {
            link,
            driver,
            client,
            ..
        } = &mut h;
        link.run(
            &mut rx,
            driver,
            client,
            tokio::time::sleep(Duration::from_millis(1000)),
        )
        .await;

        assert_eq!(link.radio().connects, 1);
        assert!(!link.radio().writes.is_empty());
        // Shutdown leaves the cluster on the default frame
        assert_eq!(
            link.radio().writes.last(),
            Some(&tmbtled_hw::frame::DEFAULT_FRAME.to_vec())
        );
    }
}
