//! Compile-time display configuration.

use embassy_time::Duration;

use crate::led2d::layout::Rotation;
use crate::led_strip::{Current, GAMMA_DEFAULT, Gamma, MAX_BRIGHTNESS, PixelSink};

/// Default interval between composite-and-push cycles (about 30 Hz).
pub const COMPOSITE_PERIOD_DEFAULT: Duration = Duration::from_millis(33);

/// Default interval between brightness-input polls.
pub const BRIGHTNESS_POLL_PERIOD_DEFAULT: Duration = Duration::from_millis(100);

/// Default minimum interval between two transmissions to the strip.
pub const REFRESH_PERIOD_DEFAULT: Duration = Duration::from_millis(10);

/// Settings shared by the compositor, the pixel sink, and the periodic tasks.
///
/// Usable in `const` and `static` initializers:
///
/// ```rust
/// use matrix_envoy::config::DisplayConfig;
/// use matrix_envoy::led_strip::Current;
/// use matrix_envoy::{MATRIX_LEN, MatrixPixelSink};
///
/// const CONFIG: DisplayConfig =
///     DisplayConfig::DEFAULT.with_current_budget(Current::Milliamps(3000), MATRIX_LEN);
/// static PIXEL_SINK: MatrixPixelSink = CONFIG.pixel_sink();
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DisplayConfig {
    /// Mounting orientation of the panel.
    pub rotation: Rotation,
    /// Gamma curve applied before brightness.
    pub gamma: Gamma,
    /// Brightness cap on the 256 scale.
    pub max_brightness: u16,
    /// Brightness at power-on, in `[0.0, 1.0]`.
    pub initial_brightness: f32,
    /// Interval between composite-and-push cycles.
    pub composite_period: Duration,
    /// Interval between brightness-input polls.
    pub brightness_poll_period: Duration,
    /// Minimum interval between two transmissions to the strip.
    pub refresh_period: Duration,
}

impl DisplayConfig {
    /// The appliance defaults: rotated 270°, linear gamma, cap 200/256, full brightness.
    pub const DEFAULT: Self = Self {
        rotation: Rotation::Rotate270,
        gamma: GAMMA_DEFAULT,
        max_brightness: MAX_BRIGHTNESS,
        initial_brightness: 1.0,
        composite_period: COMPOSITE_PERIOD_DEFAULT,
        brightness_poll_period: BRIGHTNESS_POLL_PERIOD_DEFAULT,
        refresh_period: REFRESH_PERIOD_DEFAULT,
    };

    /// Lower the brightness cap, if needed, so `led_count` LEDs stay within `current`.
    #[must_use]
    pub const fn with_current_budget(self, current: Current, led_count: usize) -> Self {
        let budget_cap = current.max_brightness(led_count);
        let max_brightness = if budget_cap < self.max_brightness {
            budget_cap
        } else {
            self.max_brightness
        };
        Self {
            max_brightness,
            ..self
        }
    }

    /// Pixel sink configured with this gamma, cap, and initial brightness.
    #[must_use]
    pub const fn pixel_sink<const N: usize>(&self) -> PixelSink<N> {
        PixelSink::new(self.gamma, self.max_brightness, self.initial_brightness)
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
