//! Brightness input: a smoothed potentiometer reading polled into the pixel sink.

use embassy_time::{Duration, Timer};
use portable_atomic::{AtomicF32, Ordering};

use crate::led_strip::PixelSink;

/// Smoothing factor of the potentiometer filter.
pub const EMA_ALPHA: f32 = 0.2;

/// Brightness changes smaller than this (on the 0.0–1.0 scale) are applied silently.
pub const LOG_THRESHOLD: f32 = 0.02;

/// Anything that can report a brightness level in `[0.0, 1.0]`.
pub trait BrightnessSource {
    /// Current level after smoothing.
    fn smoothed_value(&mut self) -> f32;
}

/// Exponential moving average: `value = alpha * sample + (1 - alpha) * value`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EmaSmoother {
    alpha: f32,
    value: Option<f32>,
}

impl EmaSmoother {
    /// A filter with the given smoothing factor, clamped into `(0.0, 1.0]`.
    #[must_use]
    pub const fn new(alpha: f32) -> Self {
        let alpha = if alpha > 0.0 && alpha <= 1.0 { alpha } else { 1.0 };
        Self { alpha, value: None }
    }

    /// Feed one sample and return the new average. The first sample seeds the average.
    pub fn update(&mut self, sample: f32) -> f32 {
        let value = match self.value {
            Some(value) => value + self.alpha * (sample - value),
            None => sample,
        };
        self.value = Some(value);
        value
    }

    /// Last average, if any sample has been seen.
    #[must_use]
    pub const fn value(&self) -> Option<f32> {
        self.value
    }
}

impl Default for EmaSmoother {
    fn default() -> Self {
        Self::new(EMA_ALPHA)
    }
}

/// Latest raw potentiometer position in `[0.0, 1.0]`, published by the ADC task.
pub struct PotentiometerLevel {
    raw: AtomicF32,
}

impl PotentiometerLevel {
    /// Start at full scale so the panel is visible before the first sample.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            raw: AtomicF32::new(1.0),
        }
    }

    /// Publish a position; NaN is ignored and other values are clamped into `[0.0, 1.0]`.
    pub fn set(&self, fraction: f32) {
        if fraction.is_nan() {
            return;
        }
        self.raw.store(fraction.clamp(0.0, 1.0), Ordering::Relaxed);
    }

    /// Publish an ADC conversion result out of `full_scale`.
    pub fn set_adc_sample(&self, sample: u16, full_scale: u16) {
        if full_scale == 0 {
            return;
        }
        self.set(f32::from(sample) / f32::from(full_scale));
    }

    /// Latest unsmoothed position.
    #[must_use]
    pub fn raw(&self) -> f32 {
        self.raw.load(Ordering::Relaxed)
    }

    /// A [`BrightnessSource`] reading this level through an [`EmaSmoother`].
    #[must_use]
    pub const fn smoothed(&self) -> SmoothedLevel<'_> {
        SmoothedLevel {
            level: self,
            smoother: EmaSmoother::new(EMA_ALPHA),
        }
    }
}

impl Default for PotentiometerLevel {
    fn default() -> Self {
        Self::new()
    }
}

/// [`PotentiometerLevel`] seen through an [`EmaSmoother`].
pub struct SmoothedLevel<'a> {
    level: &'a PotentiometerLevel,
    smoother: EmaSmoother,
}

impl BrightnessSource for SmoothedLevel<'_> {
    fn smoothed_value(&mut self) -> f32 {
        self.smoother.update(self.level.raw())
    }
}

/// One brightness poll: read `source`, apply it to `sink`, and return the level last logged.
///
/// Changes of more than [`LOG_THRESHOLD`] from `last_logged` are logged and become the new
/// reference; smaller ones are applied without logging.
pub fn poll_brightness<const N: usize>(
    sink: &PixelSink<N>,
    source: &mut impl BrightnessSource,
    last_logged: f32,
) -> f32 {
    let value = source.smoothed_value();
    sink.set_brightness(value);
    if !(0.0..=1.0).contains(&value) {
        return last_logged;
    }
    if (value - last_logged).abs() > LOG_THRESHOLD {
        info!("brightness {}%", value * 100.0);
        value
    } else {
        last_logged
    }
}

/// Poll `source` into `sink` once per `period`, forever.
pub async fn brightness_loop<const N: usize>(
    sink: &'static PixelSink<N>,
    mut source: impl BrightnessSource,
    period: Duration,
) -> ! {
    let mut last_logged = sink.brightness();
    loop {
        last_logged = poll_brightness(sink, &mut source, last_logged);
        Timer::after(period).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::led_strip::{Gamma, MAX_BRIGHTNESS};

    struct Fixed(f32);

    impl BrightnessSource for Fixed {
        fn smoothed_value(&mut self) -> f32 {
            self.0
        }
    }

    #[test]
    fn ema_moves_a_fifth_of_the_way() {
        let mut smoother = EmaSmoother::default();
        assert!((smoother.update(1.0) - 1.0).abs() < 1e-6);
        assert!((smoother.update(0.0) - 0.8).abs() < 1e-6);
        assert!((smoother.update(0.0) - 0.64).abs() < 1e-6);
    }

    #[test]
    fn potentiometer_level_clamps() {
        let level = PotentiometerLevel::new();
        level.set(1.7);
        assert!((level.raw() - 1.0).abs() < f32::EPSILON);
        level.set_adc_sample(1024, 4096);
        assert!((level.raw() - 0.25).abs() < f32::EPSILON);
        level.set(f32::NAN);
        assert!((level.raw() - 0.25).abs() < f32::EPSILON);
    }

    #[test]
    fn small_changes_keep_the_logged_reference() {
        let sink = PixelSink::<4>::new(Gamma::Linear, MAX_BRIGHTNESS, 0.5);
        let last = poll_brightness(&sink, &mut Fixed(0.51), 0.5);
        assert!((last - 0.5).abs() < f32::EPSILON);
        assert!((sink.brightness() - 0.51).abs() < f32::EPSILON);

        let last = poll_brightness(&sink, &mut Fixed(0.8), last);
        assert!((last - 0.8).abs() < f32::EPSILON);
    }

    #[test]
    fn out_of_range_source_is_rejected() {
        let sink = PixelSink::<4>::new(Gamma::Linear, MAX_BRIGHTNESS, 0.5);
        let last = poll_brightness(&sink, &mut Fixed(1.5), 0.5);
        assert!((last - 0.5).abs() < f32::EPSILON);
        assert!((sink.brightness() - 0.5).abs() < f32::EPSILON);
    }
}
