//! The physical side of the display: strip-ordered frames, brightness, and transmission.
//!
//! [`PixelSink`] owns the strip-ordered pixel array. The compositor writes whole frames
//! into it; a separate task ([`pixel_sink_loop`]) takes a snapshot at the strip's own
//! refresh rate, applies gamma and the global brightness, and shifts it out through a
//! [`LedDriver`].
//!
//! Brightness is a scalar in `[0.0, 1.0]`. On the wire it becomes a factor on a
//! [`BRIGHTNESS_SCALE`] of 256, clamped to the sink's `max_brightness` (default
//! [`MAX_BRIGHTNESS`] = 200) to keep the panel inside its power budget:
//!
//! ```text
//! scale = min(brightness * 256, max_brightness)
//! out   = gamma[channel] * scale / 256
//! ```

/// Predefined RGB color constants from the `smart_leds` crate.
///
/// Common colors include `RED`, `GREEN`, `BLUE`, `YELLOW`, `WHITE`, `BLACK`, `CYAN`, `MAGENTA`, `ORANGE`, `PURPLE`.
#[doc(inline)]
pub use smart_leds::colors;

use core::cell::RefCell;
use core::ops::{Deref, DerefMut};

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::{Duration, Timer};
use portable_atomic::{AtomicF32, Ordering};
use smart_leds::RGB8;

use crate::{Error, Result};

/// RGB color representation re-exported from the `smart_leds` crate.
pub type Rgb = RGB8;

// ============================================================================
// Gamma Correction
// ============================================================================

/// Gamma correction applied to each channel before brightness scaling.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Gamma {
    /// Linear gamma (no correction). Gamma = 1.0
    #[default]
    Linear,
    /// Standard gamma 2.2 correction for perceived brightness.
    Gamma2_2,
}

/// Default gamma curve of the display (`Gamma::Linear`), so output stays proportional to input.
pub const GAMMA_DEFAULT: Gamma = Gamma::Linear;

/// Fixed-point denominator of the brightness factor.
pub const BRIGHTNESS_SCALE: u16 = 256;

/// Default brightness cap on the [`BRIGHTNESS_SCALE`] (200 of 256, about 78%).
pub const MAX_BRIGHTNESS: u16 = 200;

/// Gamma 2.2 lookup table for 8-bit values.
/// Pre-computed to avoid floating point math: corrected = (value/255)^2.2 * 255
const GAMMA_2_2_TABLE: [u8; 256] = [
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 2, 2, 2, 2, 2, 2, 2,
    3, 3, 3, 3, 3, 4, 4, 4, 4, 5, 5, 5, 5, 6, 6, 6, 6, 7, 7, 7, 8, 8, 8, 9, 9, 9, 10, 10, 11, 11,
    11, 12, 12, 13, 13, 13, 14, 14, 15, 15, 16, 16, 17, 17, 18, 18, 19, 19, 20, 20, 21, 22, 22, 23,
    23, 24, 25, 25, 26, 26, 27, 28, 28, 29, 30, 30, 31, 32, 33, 33, 34, 35, 35, 36, 37, 38, 39, 39,
    40, 41, 42, 43, 43, 44, 45, 46, 47, 48, 49, 49, 50, 51, 52, 53, 54, 55, 56, 57, 58, 59, 60, 61,
    62, 63, 64, 65, 66, 67, 68, 69, 70, 71, 73, 74, 75, 76, 77, 78, 79, 81, 82, 83, 84, 85, 87, 88,
    89, 90, 91, 93, 94, 95, 97, 98, 99, 100, 102, 103, 105, 106, 107, 109, 110, 111, 113, 114, 116,
    117, 119, 120, 121, 123, 124, 126, 127, 129, 130, 132, 133, 135, 137, 138, 140, 141, 143, 145,
    146, 148, 149, 151, 153, 154, 156, 158, 159, 161, 163, 165, 166, 168, 170, 172, 173, 175, 177,
    179, 181, 182, 184, 186, 188, 190, 192, 194, 196, 197, 199, 201, 203, 205, 207, 209, 211, 213,
    215, 217, 219, 221, 223, 225, 227, 229, 231, 234, 236, 238, 240, 242, 244, 246, 248, 251, 253,
    255,
];

impl Gamma {
    /// Apply this curve to one 8-bit channel value.
    #[must_use]
    pub const fn correct(self, value: u8) -> u8 {
        match self {
            Self::Linear => value,
            Self::Gamma2_2 => GAMMA_2_2_TABLE[value as usize],
        }
    }
}

/// Generate a combined gamma correction and brightness scaling lookup table.
///
/// `combo_table[input]` is `gamma(input) * scale / BRIGHTNESS_SCALE`, so one table lookup per
/// channel does both steps. `scale` above [`BRIGHTNESS_SCALE`] is treated as full scale.
#[must_use]
pub const fn generate_combo_table(gamma: Gamma, scale: u16) -> [u8; 256] {
    let scale = if scale > BRIGHTNESS_SCALE {
        BRIGHTNESS_SCALE
    } else {
        scale
    };

    let mut result = [0u8; 256];
    let mut index = 0;
    while index < 256 {
        let gamma_corrected = gamma.correct(index as u8) as u32;
        result[index] = (gamma_corrected * scale as u32 / BRIGHTNESS_SCALE as u32) as u8;
        index += 1;
    }
    result
}

fn apply_correction<const N: usize>(frame: &mut Frame1d<N>, combo_table: &[u8; 256]) {
    for color in frame.iter_mut() {
        *color = Rgb::new(
            combo_table[usize::from(color.r)],
            combo_table[usize::from(color.g)],
            combo_table[usize::from(color.b)],
        );
    }
}

/// Power budget for the panel, used to derive a brightness cap.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Current {
    /// Limit brightness so that every LED at full white stays within this many milliamps.
    ///
    /// Each WS2812 draws about 60 mA at full white, so a 256-LED panel needs 15.36 A
    /// uncapped; a 3 A supply caps brightness at about 20%.
    Milliamps(u32),
    /// No current limit.
    Unlimited,
}

impl Current {
    /// Worst-case draw of a single LED at full white.
    pub const MILLIAMPS_PER_LED: u32 = 60;

    /// Brightness cap on the [`BRIGHTNESS_SCALE`] that keeps `led_count` LEDs within budget.
    #[must_use]
    pub const fn max_brightness(self, led_count: usize) -> u16 {
        let worst_case_ma = led_count as u32 * Self::MILLIAMPS_PER_LED;
        match self {
            Self::Milliamps(ma) if worst_case_ma > 0 => {
                let scale = ma as u64 * BRIGHTNESS_SCALE as u64 / worst_case_ma as u64;
                if scale > BRIGHTNESS_SCALE as u64 {
                    BRIGHTNESS_SCALE
                } else {
                    scale as u16
                }
            }
            Self::Milliamps(_) | Self::Unlimited => BRIGHTNESS_SCALE,
        }
    }
}

// ============================================================================
// Frame1d
// ============================================================================

/// [`Rgb`] pixel data in strip order.
///
/// Frames deref to `[Rgb; N]`, so pixels can be mutated directly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Frame1d<const N: usize>(pub [Rgb; N]);

impl<const N: usize> Frame1d<N> {
    /// Number of LEDs in this frame.
    pub const LEN: usize = N;

    /// Create a new blank (all black) frame.
    #[must_use]
    pub const fn new() -> Self {
        Self([Rgb::new(0, 0, 0); N])
    }

    /// Create a frame filled with a single color.
    #[must_use]
    pub const fn filled(color: Rgb) -> Self {
        Self([color; N])
    }
}

impl<const N: usize> Deref for Frame1d<N> {
    type Target = [Rgb; N];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<const N: usize> DerefMut for Frame1d<N> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<const N: usize> From<[Rgb; N]> for Frame1d<N> {
    fn from(array: [Rgb; N]) -> Self {
        Self(array)
    }
}

impl<const N: usize> From<Frame1d<N>> for [Rgb; N] {
    fn from(frame: Frame1d<N>) -> Self {
        frame.0
    }
}

impl<const N: usize> Default for Frame1d<N> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// LED driver
// ============================================================================

/// Hardware that can shift a strip-ordered frame out to the LEDs.
pub trait LedDriver<const N: usize> {
    /// Transmit one already-corrected frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HardwareTransmitFailure`] if the frame did not reach the LEDs.
    async fn write(&mut self, frame: &Frame1d<N>) -> Result<()>;
}

#[cfg(not(feature = "host"))]
impl<PIO, const SM: usize, const N: usize, ORDER> LedDriver<N>
    for embassy_rp::pio_programs::ws2812::PioWs2812<'_, PIO, SM, N, ORDER>
where
    PIO: embassy_rp::pio::Instance,
    ORDER: embassy_rp::pio_programs::ws2812::RgbColorOrder,
{
    async fn write(&mut self, frame: &Frame1d<N>) -> Result<()> {
        // The PIO program blocks on DMA completion; it has no failure path.
        embassy_rp::pio_programs::ws2812::PioWs2812::write(self, &frame.0).await;
        Ok(())
    }
}

// ============================================================================
// Pixel sink
// ============================================================================

/// Owner of the strip-ordered pixel array and the global brightness.
///
/// All frame access goes through one critical-section mutex, so a transmit snapshot never
/// sees a half-written frame. Brightness is an atomic and can be changed from any task.
pub struct PixelSink<const N: usize> {
    frame: Mutex<CriticalSectionRawMutex, RefCell<Frame1d<N>>>,
    brightness: AtomicF32,
    max_brightness: u16,
    gamma: Gamma,
}

impl<const N: usize> PixelSink<N> {
    /// Create a sink with all pixels black.
    ///
    /// `max_brightness` is on the [`BRIGHTNESS_SCALE`]; `initial_brightness` is clamped into
    /// `[0.0, 1.0]` (NaN becomes 0).
    #[must_use]
    pub const fn new(gamma: Gamma, max_brightness: u16, initial_brightness: f32) -> Self {
        let initial_brightness = if initial_brightness >= 0.0 {
            if initial_brightness > 1.0 {
                1.0
            } else {
                initial_brightness
            }
        } else {
            0.0
        };
        Self {
            frame: Mutex::new(RefCell::new(Frame1d::new())),
            brightness: AtomicF32::new(initial_brightness),
            max_brightness,
            gamma,
        }
    }

    /// Number of pixels in the strip.
    #[must_use]
    pub const fn len(&self) -> usize {
        N
    }

    /// `true` only for a zero-length strip.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        N == 0
    }

    /// Set one pixel by strip index. Out-of-range indices are logged and ignored.
    pub fn set_pixel(&self, index: usize, color: Rgb) {
        let written = self.frame.lock(|frame| {
            let mut frame = frame.borrow_mut();
            frame.get_mut(index).map(|pixel| *pixel = color).is_some()
        });
        if !written {
            warn!("pixel index {} out of range (len {})", index, N);
        }
    }

    /// Set every pixel to `color`.
    pub fn fill(&self, color: Rgb) {
        self.frame.lock(|frame| *frame.borrow_mut() = Frame1d::filled(color));
    }

    /// Set every pixel to black.
    pub fn clear(&self) {
        self.fill(colors::BLACK);
    }

    /// Replace the whole frame under a single lock.
    pub fn write_frame(&self, frame: &Frame1d<N>) {
        self.frame.lock(|current| *current.borrow_mut() = *frame);
    }

    /// Snapshot of the uncorrected frame.
    #[must_use]
    pub fn frame(&self) -> Frame1d<N> {
        self.frame.lock(|frame| *frame.borrow())
    }

    /// Set global brightness in `[0.0, 1.0]`.
    ///
    /// NaN or values outside the range are logged and ignored; brightness stays unchanged.
    pub fn set_brightness(&self, brightness: f32) {
        if !(0.0..=1.0).contains(&brightness) {
            warn!("ignored brightness {}", brightness);
            return;
        }
        self.brightness.store(brightness, Ordering::Relaxed);
    }

    /// Current global brightness in `[0.0, 1.0]`.
    #[must_use]
    pub fn brightness(&self) -> f32 {
        self.brightness.load(Ordering::Relaxed)
    }

    /// Brightness cap on the [`BRIGHTNESS_SCALE`].
    #[must_use]
    pub const fn max_brightness(&self) -> u16 {
        self.max_brightness
    }

    /// Effective brightness factor on the [`BRIGHTNESS_SCALE`]: `min(brightness * 256, cap)`.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "brightness is kept in [0, 1], so the product is in [0, 256]"
    )]
    pub fn brightness_scale(&self) -> u16 {
        let scaled = (self.brightness() * f32::from(BRIGHTNESS_SCALE)) as u16;
        scaled.min(self.max_brightness)
    }

    /// Snapshot of the frame with gamma and brightness applied, as it goes on the wire.
    #[must_use]
    pub fn corrected_frame(&self) -> Frame1d<N> {
        let mut frame = self.frame();
        let combo_table = generate_combo_table(self.gamma, self.brightness_scale());
        apply_correction(&mut frame, &combo_table);
        frame
    }

    /// Perform one refresh: snapshot, correct, and hand the frame to `driver`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HardwareTransmitFailure`] if the driver rejected the frame.
    pub async fn transmit<D: LedDriver<N>>(&self, driver: &mut D) -> Result<()> {
        let frame = self.corrected_frame();
        driver.write(&frame).await.map_err(|err| {
            error!("dropping frame: {}", err);
            Error::HardwareTransmitFailure
        })
    }
}

/// Transmit the sink's frame forever, once per `refresh_period`.
///
/// A failed transmission drops that frame; the next refresh tries again.
pub async fn pixel_sink_loop<const N: usize, D: LedDriver<N>>(
    sink: &'static PixelSink<N>,
    mut driver: D,
    refresh_period: Duration,
) -> ! {
    info!("pixel sink started: {} LEDs", N);
    loop {
        if sink.transmit(&mut driver).await.is_err() {
            trace!("refresh skipped");
        }
        Timer::after(refresh_period).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combo_table_scales_linear_values() {
        let table = generate_combo_table(Gamma::Linear, 128);
        assert_eq!(table[0], 0);
        assert_eq!(table[200], 100);
        assert_eq!(table[255], 127);
    }

    #[test]
    fn combo_table_clamps_scale() {
        assert_eq!(
            generate_combo_table(Gamma::Linear, 1000),
            generate_combo_table(Gamma::Linear, BRIGHTNESS_SCALE)
        );
        assert_eq!(generate_combo_table(Gamma::Linear, BRIGHTNESS_SCALE)[255], 255);
    }

    #[test]
    fn current_budget_caps_brightness() {
        assert_eq!(Current::Unlimited.max_brightness(256), BRIGHTNESS_SCALE);
        // 256 LEDs * 60 mA = 15360 mA worst case; 3840 mA is a quarter of that.
        assert_eq!(Current::Milliamps(3840).max_brightness(256), 64);
        assert_eq!(Current::Milliamps(100_000).max_brightness(256), BRIGHTNESS_SCALE);
    }

    #[test]
    fn initial_brightness_is_clamped() {
        let sink = PixelSink::<4>::new(Gamma::Linear, MAX_BRIGHTNESS, 3.0);
        assert!((sink.brightness() - 1.0).abs() < f32::EPSILON);
        let sink = PixelSink::<4>::new(Gamma::Linear, MAX_BRIGHTNESS, f32::NAN);
        assert!(sink.brightness().abs() < f32::EPSILON);
    }
}
