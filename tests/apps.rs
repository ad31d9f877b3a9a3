#![cfg(feature = "host")]
#![allow(missing_docs)]
//! Host-level tests for the app supervisor and the shipped producers.

use std::cell::{Cell, RefCell};

use embassy_time::{Duration, Instant};
use matrix_envoy::app_manager::{App, AppManager, AppState};
use matrix_envoy::apps::{ClockApp, StatusApp, UpdateProgressApp};
use matrix_envoy::apps::status_indicator::DIM_GREEN;
use matrix_envoy::config::DisplayConfig;
use matrix_envoy::led_strip::colors;
use matrix_envoy::status::{
    NetworkPhase, NetworkStatus, UpdateProgress, UpdateStatus, WallClock,
};
use matrix_envoy::{Error, MatrixCompositor, MatrixCompositorStatic, Result};
use test_log::test;
use time::OffsetDateTime;

struct Recorder<'a> {
    name: &'static str,
    period: Duration,
    fail_init: bool,
    log: &'a RefCell<Vec<&'static str>>,
    torn_down: &'a Cell<u32>,
}

impl<'a> Recorder<'a> {
    fn new(
        name: &'static str,
        period_ms: u64,
        log: &'a RefCell<Vec<&'static str>>,
        torn_down: &'a Cell<u32>,
    ) -> Self {
        Self {
            name,
            period: Duration::from_millis(period_ms),
            fail_init: false,
            log,
            torn_down,
        }
    }
}

impl App for Recorder<'_> {
    fn name(&self) -> &str {
        self.name
    }

    fn init(&mut self) -> Result<()> {
        if self.fail_init {
            Err(Error::ResourceExhausted)
        } else {
            Ok(())
        }
    }

    fn tick(&mut self) -> Duration {
        self.log.borrow_mut().push(self.name);
        self.period
    }

    fn teardown(&mut self) {
        self.torn_down.set(self.torn_down.get() + 1);
    }
}

fn at(ms: u64) -> Instant {
    Instant::from_millis(ms)
}

#[test]
fn lifecycle_runs_through_start_and_stop() {
    let log = RefCell::new(Vec::new());
    let torn_down = Cell::new(0);
    let mut recorder = Recorder::new("recorder", 100, &log, &torn_down);
    let mut manager: AppManager<'_> = AppManager::new();
    manager.register(&mut recorder, 1).unwrap();
    assert_eq!(manager.state("recorder").unwrap(), AppState::Stopped);

    manager.start("recorder").unwrap();
    assert!(manager.is_running("recorder"));
    // starting twice is a no-op
    manager.start("recorder").unwrap();

    manager.stop("recorder").unwrap();
    assert_eq!(manager.state("recorder").unwrap(), AppState::Stopped);
    assert_eq!(torn_down.get(), 1);
    assert!(matches!(
        manager.stop("recorder"),
        Err(Error::InvalidStateTransition {
            from: AppState::Stopped,
            to: AppState::Stopping
        })
    ));

    manager.restart("recorder").unwrap();
    assert!(manager.is_running("recorder"));
    manager.restart("recorder").unwrap();
    assert_eq!(torn_down.get(), 2);

    manager.unregister("recorder").unwrap();
    assert_eq!(torn_down.get(), 3);
    assert!(manager.is_empty());
    assert!(matches!(manager.state("recorder"), Err(Error::AppNotFound)));
}

#[test]
fn failed_init_leaves_app_in_error_and_restartable() {
    let log = RefCell::new(Vec::new());
    let torn_down = Cell::new(0);
    let mut recorder = Recorder::new("flaky", 100, &log, &torn_down);
    recorder.fail_init = true;
    let mut manager: AppManager<'_> = AppManager::new();
    manager.register(&mut recorder, 1).unwrap();

    assert!(matches!(manager.start("flaky"), Err(Error::AppInitFailed)));
    assert_eq!(manager.state("flaky").unwrap(), AppState::Error);
    assert_eq!(manager.poll(at(0)), None);
    assert!(log.borrow().is_empty());
    assert!(matches!(manager.start_all(), Err(Error::AppInitFailed)));
}

#[test]
fn start_all_handles_long_names() {
    const LONG_NAME: &str = "firmware-update-progress-bar-on-the-right-edge";
    let log = RefCell::new(Vec::new());
    let torn_down = Cell::new(0);
    let mut long = Recorder::new(LONG_NAME, 100, &log, &torn_down);
    let mut short = Recorder::new("clock", 100, &log, &torn_down);
    let mut manager: AppManager<'_> = AppManager::new();
    manager.register(&mut long, 2).unwrap();
    manager.register(&mut short, 1).unwrap();

    manager.start_all().unwrap();
    assert!(LONG_NAME.len() > 32);
    assert!(manager.is_running(LONG_NAME));
    assert!(manager.is_running("clock"));
    manager.poll(at(0));
    assert_eq!(*log.borrow(), vec![LONG_NAME, "clock"]);
}

#[test]
fn registration_rejects_duplicates_and_overflow() {
    let log = RefCell::new(Vec::new());
    let torn_down = Cell::new(0);
    let mut first = Recorder::new("a", 100, &log, &torn_down);
    let mut twin = Recorder::new("a", 100, &log, &torn_down);
    let mut second = Recorder::new("b", 100, &log, &torn_down);
    let mut third = Recorder::new("c", 100, &log, &torn_down);
    let mut manager: AppManager<'_, 2> = AppManager::new();

    manager.register(&mut first, 1).unwrap();
    assert!(matches!(manager.register(&mut twin, 1), Err(Error::DuplicateApp)));
    manager.register(&mut second, 1).unwrap();
    assert!(matches!(
        manager.register(&mut third, 1),
        Err(Error::ResourceExhausted)
    ));
    assert_eq!(manager.len(), 2);
    assert!(matches!(manager.start("c"), Err(Error::AppNotFound)));
}

#[test]
fn each_app_keeps_its_own_period() {
    let log = RefCell::new(Vec::new());
    let torn_down = Cell::new(0);
    let mut fast = Recorder::new("fast", 100, &log, &torn_down);
    let mut slow = Recorder::new("slow", 1000, &log, &torn_down);
    let mut manager: AppManager<'_> = AppManager::new();
    manager.register(&mut slow, 1).unwrap();
    manager.register(&mut fast, 5).unwrap();
    manager.start_all().unwrap();

    // first poll ticks everything, highest priority first
    assert_eq!(manager.poll(at(0)), Some(at(100)));
    assert_eq!(*log.borrow(), ["fast", "slow"]);

    assert_eq!(manager.poll(at(50)), Some(at(100)));
    assert_eq!(log.borrow().len(), 2);

    for step in 1..10 {
        manager.poll(at(step * 100));
    }
    assert_eq!(manager.poll(at(1000)), Some(at(1100)));
    let ticks = log.borrow();
    assert_eq!(ticks.iter().filter(|name| **name == "fast").count(), 11);
    assert_eq!(ticks.iter().filter(|name| **name == "slow").count(), 2);
}

#[test]
fn stopped_apps_are_not_ticked() {
    let log = RefCell::new(Vec::new());
    let torn_down = Cell::new(0);
    let mut recorder = Recorder::new("recorder", 100, &log, &torn_down);
    let mut manager: AppManager<'_> = AppManager::new();
    manager.register(&mut recorder, 1).unwrap();
    assert_eq!(manager.poll(at(0)), None);
    manager.start("recorder").unwrap();
    manager.stop("recorder").unwrap();
    assert_eq!(manager.poll(at(0)), None);
    assert!(log.borrow().is_empty());
}

// ----------------------------------------------------------------------------
// Producers
// ----------------------------------------------------------------------------

struct FixedClock(Option<OffsetDateTime>);

impl WallClock for FixedClock {
    fn local_time(&self) -> Option<OffsetDateTime> {
        self.0
    }
}

fn compositor(resources: &'static MatrixCompositorStatic) -> MatrixCompositor {
    MatrixCompositor::new(resources, &DisplayConfig::default()).unwrap()
}

#[test]
fn clock_app_draws_the_time_and_releases_its_buffer() {
    static RESOURCES: MatrixCompositorStatic = MatrixCompositor::new_static();
    let compositor = compositor(&RESOURCES);
    // 21:47 UTC -> 9:47 PM
    let clock = FixedClock(OffsetDateTime::from_unix_timestamp(21 * 3600 + 47 * 60).ok());
    let mut app = ClockApp::new(&compositor, &clock);
    let mut manager: AppManager<'_> = AppManager::new();
    manager.register(&mut app, 1).unwrap();
    manager.start("clock").unwrap();
    assert_eq!(compositor.buffer_count(), 1);

    assert_eq!(manager.poll(at(0)), Some(at(1000)));
    compositor.composite();
    let frame = compositor.frame();
    // blank tens digit at display x 9..12
    for x in 9..12 {
        assert_eq!(frame[(x, 1)], Some(colors::BLACK));
    }
    // '9' top row is solid
    for x in 12..15 {
        assert_eq!(frame[(x, 1)], Some(colors::WHITE));
    }
    assert_eq!(frame[(15, 2)], Some(colors::WHITE));

    manager.stop("clock").unwrap();
    assert_eq!(compositor.buffer_count(), 0);
    compositor.composite();
    assert!(compositor.frame().iter().flatten().all(Option::is_none));
}

#[test]
fn unsynchronized_clock_shows_dashes() {
    static RESOURCES: MatrixCompositorStatic = MatrixCompositor::new_static();
    let compositor = compositor(&RESOURCES);
    let clock = FixedClock(None);
    let mut app = ClockApp::new(&compositor, &clock);
    app.init().unwrap();
    assert!(app.has_buffer());
    app.tick();
    compositor.composite();
    let frame = compositor.frame();
    for x in [9, 12, 16, 19] {
        assert_eq!(frame[(x, 3)], Some(colors::WHITE), "dash at {x}");
        assert_eq!(frame[(x, 2)], Some(colors::BLACK));
    }
    app.teardown();
    assert!(!app.has_buffer());
}

#[test]
fn progress_bar_follows_the_update() {
    static RESOURCES: MatrixCompositorStatic = MatrixCompositor::new_static();
    let compositor = compositor(&RESOURCES);
    let progress = UpdateProgress::new();
    let mut app = UpdateProgressApp::new(&compositor, &progress);
    app.init().unwrap();

    assert_eq!(app.tick(), Duration::from_millis(2500));
    compositor.composite();
    assert!((1..8).all(|y| compositor.frame()[(31, y)].is_none()));

    progress.set_status(UpdateStatus::InProgress);
    progress.set_percent(50);
    assert_eq!(app.tick(), Duration::from_millis(100));
    compositor.composite();
    let frame = compositor.frame();
    // 50 * 7 / 100 = 3 cells from the top
    for y in 1..4 {
        assert_eq!(frame[(31, y)], Some(colors::YELLOW));
    }
    for y in 4..8 {
        assert_eq!(frame[(31, y)], Some(colors::BLACK));
    }
    assert_eq!(frame[(31, 0)], None);

    progress.set_status(UpdateStatus::Failed);
    app.tick();
    compositor.composite();
    assert!((1..8).all(|y| compositor.frame()[(31, y)] == Some(colors::RED)));

    progress.set_status(UpdateStatus::Success);
    app.tick();
    compositor.composite();
    assert!((1..8).all(|y| compositor.frame()[(31, y)] == Some(colors::GREEN)));
}

#[test]
fn progress_bar_covers_lower_layers() {
    static RESOURCES: MatrixCompositorStatic = MatrixCompositor::new_static();
    let compositor = compositor(&RESOURCES);
    let wallpaper = compositor
        .create_buffer("wallpaper", 32, 8, 0, 0, matrix_envoy::layer::Layer::Popup)
        .unwrap();
    compositor
        .with_buffer(&wallpaper, |buffer| buffer.fill(colors::BLUE))
        .unwrap();
    let progress = UpdateProgress::new();
    progress.set_status(UpdateStatus::Success);
    let mut app = UpdateProgressApp::new(&compositor, &progress);
    app.init().unwrap();
    app.tick();
    compositor.composite();
    let frame = compositor.frame();
    assert_eq!(frame[(31, 1)], Some(colors::GREEN));
    assert_eq!(frame[(31, 0)], Some(colors::BLUE));
    assert_eq!(frame[(30, 1)], Some(colors::BLUE));
}

#[test]
fn status_pixel_tracks_the_network() {
    static RESOURCES: MatrixCompositorStatic = MatrixCompositor::new_static();
    let compositor = compositor(&RESOURCES);
    let network = NetworkStatus::new();
    let mut app = StatusApp::new(&compositor, &network);
    app.init().unwrap();

    let pixel_after_tick = |app: &mut StatusApp<'_>| {
        assert_eq!(app.tick(), Duration::from_millis(500));
        compositor.composite();
        compositor.frame()[(0, 0)]
    };

    assert_eq!(pixel_after_tick(&mut app), Some(colors::RED));
    network.set_phase(NetworkPhase::Connecting);
    let first = pixel_after_tick(&mut app);
    let second = pixel_after_tick(&mut app);
    assert_ne!(first, second);
    assert!([first, second].contains(&Some(colors::YELLOW)));
    network.set_phase(NetworkPhase::Connected);
    assert_eq!(pixel_after_tick(&mut app), Some(DIM_GREEN));
}
