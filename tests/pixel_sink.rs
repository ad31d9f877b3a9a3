#![cfg(feature = "host")]
#![allow(missing_docs)]
//! Host-level tests for brightness handling and transmission.

use embassy_futures::block_on;
use matrix_envoy::config::DisplayConfig;
use matrix_envoy::led_strip::{
    Current, Frame1d, Gamma, LedDriver, MAX_BRIGHTNESS, PixelSink, Rgb, colors,
};
use matrix_envoy::{Error, MATRIX_LEN, Result};
use test_log::test;

/// Records every frame it is handed, or fails every write.
struct RecordingDriver<const N: usize> {
    frames: Vec<Frame1d<N>>,
    fail: bool,
}

impl<const N: usize> RecordingDriver<N> {
    fn new(fail: bool) -> Self {
        Self {
            frames: Vec::new(),
            fail,
        }
    }
}

impl<const N: usize> LedDriver<N> for RecordingDriver<N> {
    async fn write(&mut self, frame: &Frame1d<N>) -> Result<()> {
        if self.fail {
            return Err(Error::HardwareTransmitFailure);
        }
        self.frames.push(*frame);
        Ok(())
    }
}

#[test]
fn out_of_range_brightness_is_ignored() {
    let sink = PixelSink::<4>::new(Gamma::Linear, MAX_BRIGHTNESS, 0.25);
    for bad in [1.5, -0.1, f32::NAN] {
        sink.set_brightness(bad);
    }
    assert!((sink.brightness() - 0.25).abs() < f32::EPSILON);
}

#[test]
fn brightness_scales_channels_proportionally() {
    let sink = PixelSink::<2>::new(Gamma::Linear, MAX_BRIGHTNESS, 1.0);
    sink.set_brightness(0.5);
    sink.set_pixel(0, Rgb::new(200, 100, 50));
    let corrected = sink.corrected_frame();
    assert_eq!(corrected[0], Rgb::new(100, 50, 25));
    assert_eq!(corrected[1], colors::BLACK);
    // the stored frame is untouched
    assert_eq!(sink.frame()[0], Rgb::new(200, 100, 50));
}

#[test]
fn full_brightness_is_capped() {
    let sink = PixelSink::<1>::new(Gamma::Linear, MAX_BRIGHTNESS, 1.0);
    sink.fill(colors::WHITE);
    assert_eq!(sink.brightness_scale(), MAX_BRIGHTNESS);
    let pixel = sink.corrected_frame()[0];
    assert!(pixel.r <= 199 && pixel.g <= 199 && pixel.b <= 199, "{pixel:?}");
}

#[test]
fn gamma_darkens_mid_tones() {
    let sink = PixelSink::<1>::new(Gamma::Gamma2_2, 256, 1.0);
    sink.fill(Rgb::new(128, 255, 0));
    let pixel = sink.corrected_frame()[0];
    assert!(pixel.r < 128);
    assert_eq!(pixel.g, 255);
    assert_eq!(pixel.b, 0);
}

#[test]
fn current_budget_lowers_the_cap() {
    let config = DisplayConfig::default().with_current_budget(Current::Milliamps(3840), MATRIX_LEN);
    assert_eq!(config.max_brightness, 64);
    let relaxed = DisplayConfig::default().with_current_budget(Current::Unlimited, MATRIX_LEN);
    assert_eq!(relaxed.max_brightness, MAX_BRIGHTNESS);
    let sink: PixelSink<MATRIX_LEN> = config.pixel_sink();
    assert_eq!(sink.max_brightness(), 64);
}

#[test]
fn out_of_range_pixel_index_is_ignored() {
    let sink = PixelSink::<3>::new(Gamma::Linear, MAX_BRIGHTNESS, 1.0);
    sink.set_pixel(3, colors::RED);
    assert_eq!(sink.frame(), Frame1d::new());
}

#[test]
fn transmit_hands_the_corrected_frame_to_the_driver() {
    let sink = PixelSink::<2>::new(Gamma::Linear, 256, 0.5);
    sink.write_frame(&Frame1d([Rgb::new(200, 0, 0), Rgb::new(0, 0, 255)]));
    let mut driver = RecordingDriver::new(false);
    block_on(sink.transmit(&mut driver)).unwrap();
    assert_eq!(driver.frames.len(), 1);
    assert_eq!(driver.frames[0][0], Rgb::new(100, 0, 0));
    assert_eq!(driver.frames[0][1], Rgb::new(0, 0, 127));
}

#[test]
fn transmit_failure_is_reported_and_keeps_the_frame() {
    let sink = PixelSink::<2>::new(Gamma::Linear, MAX_BRIGHTNESS, 1.0);
    sink.fill(colors::GREEN);
    let mut driver = RecordingDriver::new(true);
    assert!(matches!(
        block_on(sink.transmit(&mut driver)),
        Err(Error::HardwareTransmitFailure)
    ));
    assert_eq!(sink.frame(), Frame1d::filled(colors::GREEN));
}
