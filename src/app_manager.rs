//! Cooperative supervisor for display producers.
//!
//! Each [`App`] draws into its own layer buffer on its own schedule: [`App::tick`] draws
//! once and says how long to wait before the next tick. The [`AppManager`] owns the
//! lifecycle ([`AppState`]) and wakes each running app when its deadline comes up, so a
//! 100 ms progress bar and a 1 s clock share one task without sharing a period.
//!
//! The periods are independent but the execution is not: every app ticks on the
//! supervisor's task, so a slow `tick` delays the other producers' deadlines by as long as
//! it runs. Compositing and transmission run in their own loops and are not held up.
//! Keep `tick` to a single short draw; an app that needs to wait should return the wait
//! as its next delay.

use derive_more::Display;
use embassy_time::{Duration, Instant, Timer};
use heapless::Vec;

use crate::{Error, Result};

/// Apps the default [`AppManager`] can hold.
pub const MAX_APPS: usize = 16;

/// How long [`AppManager::run`] sleeps when no app is running.
pub const IDLE_PERIOD: Duration = Duration::from_millis(250);

/// Lifecycle of a registered app.
///
/// ```text
/// Stopped -> Starting -> Running -> Stopping -> Stopped
///    any  -> Error -> Starting
/// ```
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AppState {
    /// Registered, not running.
    #[default]
    Stopped,
    /// `init` in progress.
    Starting,
    /// Ticking.
    Running,
    /// `teardown` in progress.
    Stopping,
    /// `init` failed; a restart is allowed.
    Error,
}

impl AppState {
    /// Move to `to` if the lifecycle allows it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidStateTransition`] for any edge not in the lifecycle.
    pub const fn transition(self, to: Self) -> Result<Self> {
        match (self, to) {
            (Self::Stopped | Self::Error, Self::Starting)
            | (Self::Starting, Self::Running)
            | (Self::Running, Self::Stopping)
            | (Self::Stopping, Self::Stopped)
            | (_, Self::Error) => Ok(to),
            _ => Err(Error::InvalidStateTransition { from: self, to }),
        }
    }
}

/// A display producer.
pub trait App {
    /// Unique name, used to address the app in the [`AppManager`].
    fn name(&self) -> &str;

    /// Acquire resources (typically a layer buffer).
    ///
    /// # Errors
    ///
    /// Any error keeps the app out of the running set; the manager reports
    /// [`Error::AppInitFailed`].
    fn init(&mut self) -> Result<()>;

    /// Draw once and return the delay until the next tick.
    fn tick(&mut self) -> Duration;

    /// Release what `init` acquired.
    fn teardown(&mut self) {}
}

struct Entry<'a> {
    app: &'a mut dyn App,
    state: AppState,
    priority: u8,
    next_tick: Instant,
}

impl Entry<'_> {
    fn set_state(&mut self, to: AppState) -> Result<()> {
        self.state = self.state.transition(to).inspect_err(|err| {
            warn!("{}: {}", self.app.name(), err);
        })?;
        Ok(())
    }
}

/// Registry and scheduler of up to `CAP` apps.
///
/// Apps with a higher priority are ticked first when several are due together.
pub struct AppManager<'a, const CAP: usize = MAX_APPS> {
    entries: Vec<Entry<'a>, CAP>,
}

impl<'a, const CAP: usize> AppManager<'a, CAP> {
    /// An empty manager.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Number of registered apps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if no app is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry_mut(&mut self, name: &str) -> Result<&mut Entry<'a>> {
        self.entries
            .iter_mut()
            .find(|entry| entry.app.name() == name)
            .ok_or(Error::AppNotFound)
    }

    /// Register a stopped app.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateApp`] if the name is taken and [`Error::ResourceExhausted`]
    /// if `CAP` apps are already registered.
    pub fn register(&mut self, app: &'a mut dyn App, priority: u8) -> Result<()> {
        if self.entries.iter().any(|entry| entry.app.name() == app.name()) {
            warn!("{}: already registered", app.name());
            return Err(Error::DuplicateApp);
        }
        let position = self
            .entries
            .iter()
            .position(|entry| entry.priority < priority)
            .unwrap_or(self.entries.len());
        let entry = Entry {
            app,
            state: AppState::Stopped,
            priority,
            next_tick: Instant::MIN,
        };
        if let Err(entry) = self.entries.insert(position, entry) {
            warn!("{}: no room for another app", entry.app.name());
            return Err(Error::ResourceExhausted);
        }
        Ok(())
    }

    /// Stop (if needed) and remove an app.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AppNotFound`] for an unknown name.
    pub fn unregister(&mut self, name: &str) -> Result<()> {
        if self.is_running(name) {
            self.stop(name)?;
        }
        let position = self.position(name)?;
        self.entries.remove(position);
        info!("{}: unregistered", name);
        Ok(())
    }

    /// Run `init` and, on success, schedule the app for an immediate first tick.
    ///
    /// Starting a running app does nothing.
    ///
    /// # Errors
    ///
    /// - [`Error::AppNotFound`] for an unknown name.
    /// - [`Error::InvalidStateTransition`] while the app is stopping.
    /// - [`Error::AppInitFailed`] if `init` failed; the app is left in [`AppState::Error`].
    pub fn start(&mut self, name: &str) -> Result<()> {
        let index = self.position(name)?;
        self.start_at(index)
    }

    fn position(&self, name: &str) -> Result<usize> {
        self.entries
            .iter()
            .position(|entry| entry.app.name() == name)
            .ok_or(Error::AppNotFound)
    }

    fn start_at(&mut self, index: usize) -> Result<()> {
        let entry = self.entries.get_mut(index).ok_or(Error::AppNotFound)?;
        if entry.state == AppState::Running {
            debug!("{}: already running", entry.app.name());
            return Ok(());
        }
        entry.set_state(AppState::Starting)?;
        if let Err(err) = entry.app.init() {
            error!("{}: init failed: {}", entry.app.name(), err);
            entry.set_state(AppState::Error)?;
            return Err(Error::AppInitFailed);
        }
        entry.set_state(AppState::Running)?;
        entry.next_tick = Instant::MIN;
        info!("{}: running", entry.app.name());
        Ok(())
    }

    /// Run `teardown` and stop ticking the app.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AppNotFound`] for an unknown name and
    /// [`Error::InvalidStateTransition`] if the app is not running.
    pub fn stop(&mut self, name: &str) -> Result<()> {
        let entry = self.entry_mut(name)?;
        entry.set_state(AppState::Stopping)?;
        entry.app.teardown();
        entry.set_state(AppState::Stopped)?;
        info!("{}: stopped", name);
        Ok(())
    }

    /// Stop the app if it is running, then start it.
    ///
    /// # Errors
    ///
    /// As for [`Self::stop`] and [`Self::start`].
    pub fn restart(&mut self, name: &str) -> Result<()> {
        if self.is_running(name) {
            self.stop(name)?;
        }
        self.start(name)
    }

    /// Start every stopped (or failed) app. Returns the first error after trying them all.
    ///
    /// # Errors
    ///
    /// The first error reported by [`Self::start`].
    pub fn start_all(&mut self) -> Result<()> {
        let mut first_error = None;
        for index in 0..self.entries.len() {
            let startable = self
                .entries
                .get(index)
                .is_some_and(|entry| matches!(entry.state, AppState::Stopped | AppState::Error));
            if startable && let Err(err) = self.start_at(index) {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Lifecycle state of an app.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AppNotFound`] for an unknown name.
    pub fn state(&self, name: &str) -> Result<AppState> {
        self.entries
            .iter()
            .find(|entry| entry.app.name() == name)
            .map(|entry| entry.state)
            .ok_or(Error::AppNotFound)
    }

    /// `true` if the app exists and is running.
    #[must_use]
    pub fn is_running(&self, name: &str) -> bool {
        matches!(self.state(name), Ok(AppState::Running))
    }

    /// Tick every running app whose deadline is at or before `now`.
    ///
    /// Returns the earliest upcoming deadline, or `None` if nothing is running.
    pub fn poll(&mut self, now: Instant) -> Option<Instant> {
        let mut next_deadline: Option<Instant> = None;
        for entry in self
            .entries
            .iter_mut()
            .filter(|entry| entry.state == AppState::Running)
        {
            if entry.next_tick <= now {
                let delay = entry.app.tick();
                entry.next_tick = now.checked_add(delay).unwrap_or(Instant::MAX);
                trace!("{}: next tick in {} ms", entry.app.name(), delay.as_millis());
            }
            next_deadline = Some(match next_deadline {
                Some(deadline) => deadline.min(entry.next_tick),
                None => entry.next_tick,
            });
        }
        next_deadline
    }

    /// Supervise forever: tick due apps, then sleep until the next deadline.
    pub async fn run(&mut self) -> ! {
        info!("app supervisor running {} apps", self.entries.len());
        loop {
            match self.poll(Instant::now()) {
                Some(deadline) => Timer::at(deadline).await,
                None => Timer::after(IDLE_PERIOD).await,
            }
        }
    }
}

impl<const CAP: usize> Default for AppManager<'_, CAP> {
    fn default() -> Self {
        Self::new()
    }
}
