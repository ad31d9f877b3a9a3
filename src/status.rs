//! Read-only state the producers poll every tick.
//!
//! The network stack, the firmware updater, and the time source live outside this crate.
//! They publish what they know into these cells; producers read them without ever blocking
//! the compositor or the transmit path.

use core::cell::Cell;

use derive_more::Display;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::{Duration, Instant};
use portable_atomic::{AtomicU8, Ordering};
use time::{OffsetDateTime, UtcOffset};

/// Duration representing one second.
pub const ONE_SECOND: Duration = Duration::from_secs(1);

// ============================================================================
// Network
// ============================================================================

/// Connectivity phase reported by the network stack.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum NetworkPhase {
    /// No link.
    #[default]
    Disconnected = 0,
    /// Joining or waiting for an address.
    Connecting = 1,
    /// Online.
    Connected = 2,
}

impl NetworkPhase {
    const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Connecting,
            2 => Self::Connected,
            _ => Self::Disconnected,
        }
    }
}

/// Latest [`NetworkPhase`], shared between the network stack and producers.
pub struct NetworkStatus {
    phase: AtomicU8,
}

impl NetworkStatus {
    /// Start out disconnected.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            phase: AtomicU8::new(NetworkPhase::Disconnected as u8),
        }
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> NetworkPhase {
        NetworkPhase::from_u8(self.phase.load(Ordering::Relaxed))
    }

    /// Publish a new phase.
    pub fn set_phase(&self, phase: NetworkPhase) {
        let previous = self.phase.swap(phase as u8, Ordering::Relaxed);
        if previous != phase as u8 {
            info!("network: {}", phase);
        }
    }
}

impl Default for NetworkStatus {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Firmware update
// ============================================================================

/// Phase of a firmware update.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum UpdateStatus {
    /// No update running.
    #[default]
    Idle = 0,
    /// An update was requested and is being prepared.
    Starting = 1,
    /// Image download and flashing under way.
    InProgress = 2,
    /// The last update finished and was verified.
    Success = 3,
    /// The last update was aborted.
    Failed = 4,
}

impl UpdateStatus {
    const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Starting,
            2 => Self::InProgress,
            3 => Self::Success,
            4 => Self::Failed,
            _ => Self::Idle,
        }
    }
}

/// Latest update status and completion percentage (0–100).
pub struct UpdateProgress {
    status: AtomicU8,
    percent: AtomicU8,
}

impl UpdateProgress {
    /// Start out idle at 0%.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            status: AtomicU8::new(UpdateStatus::Idle as u8),
            percent: AtomicU8::new(0),
        }
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> UpdateStatus {
        UpdateStatus::from_u8(self.status.load(Ordering::Relaxed))
    }

    /// Current completion percentage.
    #[must_use]
    pub fn percent(&self) -> u8 {
        self.percent.load(Ordering::Relaxed)
    }

    /// Publish a new status.
    pub fn set_status(&self, status: UpdateStatus) {
        let previous = self.status.swap(status as u8, Ordering::Relaxed);
        if previous != status as u8 {
            info!("update: {}", status);
        }
    }

    /// Publish a completion percentage; values above 100 are clamped.
    pub fn set_percent(&self, percent: u8) {
        self.percent.store(percent.min(100), Ordering::Relaxed);
    }
}

impl Default for UpdateProgress {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Wall clock
// ============================================================================

/// Source of local wall-clock time.
pub trait WallClock {
    /// Local time now, or `None` until the clock has been set.
    fn local_time(&self) -> Option<OffsetDateTime>;
}

#[derive(Clone, Copy)]
struct Anchor {
    unix_seconds: i64,
    set_at: Instant,
}

/// Wall clock kept by the tick counter between syncs.
///
/// The time source calls [`SoftClock::set_utc_time`] whenever it learns the time; reads
/// extrapolate from that anchor with the embassy tick counter.
pub struct SoftClock {
    anchor: Mutex<CriticalSectionRawMutex, Cell<Option<Anchor>>>,
    offset_minutes: Mutex<CriticalSectionRawMutex, Cell<i32>>,
}

impl SoftClock {
    /// An unset clock with the given UTC offset in minutes.
    #[must_use]
    pub const fn new(offset_minutes: i32) -> Self {
        Self {
            anchor: Mutex::new(Cell::new(None)),
            offset_minutes: Mutex::new(Cell::new(offset_minutes)),
        }
    }

    /// Anchor the clock: it is `unix_seconds` UTC now.
    pub fn set_utc_time(&self, unix_seconds: i64) {
        self.set_utc_time_at(unix_seconds, Instant::now());
    }

    /// Anchor the clock: it was `unix_seconds` UTC at `instant`.
    pub fn set_utc_time_at(&self, unix_seconds: i64, instant: Instant) {
        self.anchor.lock(|anchor| {
            anchor.set(Some(Anchor {
                unix_seconds,
                set_at: instant,
            }));
        });
        info!("clock set to {} UTC", unix_seconds);
    }

    /// Change the UTC offset.
    pub fn set_offset_minutes(&self, offset_minutes: i32) {
        self.offset_minutes.lock(|offset| offset.set(offset_minutes));
    }

    /// UTC offset in minutes.
    #[must_use]
    pub fn offset_minutes(&self) -> i32 {
        self.offset_minutes.lock(Cell::get)
    }

    /// `true` once the clock has been set.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.anchor.lock(Cell::get).is_some()
    }

    /// Local time at `now`, or `None` if unset (or out of the representable range).
    #[must_use]
    pub fn local_time_at(&self, now: Instant) -> Option<OffsetDateTime> {
        let anchor = self.anchor.lock(Cell::get)?;
        let elapsed = now
            .checked_duration_since(anchor.set_at)
            .unwrap_or(Duration::MIN);
        let elapsed_seconds = i64::try_from(elapsed.as_secs()).ok()?;
        let utc = OffsetDateTime::from_unix_timestamp(
            anchor.unix_seconds.checked_add(elapsed_seconds)?,
        )
        .ok()?;
        let offset = UtcOffset::from_whole_seconds(self.offset_minutes().checked_mul(60)?).ok()?;
        utc.checked_to_offset(offset)
    }
}

impl WallClock for SoftClock {
    fn local_time(&self) -> Option<OffsetDateTime> {
        self.local_time_at(Instant::now())
    }
}

/// Extract hour (12-hour format), minute, second from `OffsetDateTime`.
#[must_use]
pub fn h12_m_s(dt: &OffsetDateTime) -> (u8, u8, u8) {
    let hour_24 = dt.hour();
    let hour_12 = match hour_24 {
        0 => 12,
        1..=12 => hour_24,
        _ => hour_24 - 12,
    };
    (hour_12, dt.minute(), dt.second())
}
