//! `HH:MM` wall clock in the middle of the panel.

use embassy_time::Duration;

use super::{OwnedBuffer, Placement};
use crate::app_manager::App;
use crate::graphics::{Font, draw_char};
use crate::layer::{Layer, LayerBuffer};
use crate::led_strip::{Rgb, colors};
use crate::status::{ONE_SECOND, WallClock, h12_m_s};
use crate::{MatrixCompositor, Result};

/// Name the clock registers under.
pub const CLOCK_APP_NAME: &str = "clock";

const PLACEMENT: Placement = Placement {
    width: 13,
    height: 7,
    x: 9,
    y: 1,
    layer: Layer::Foreground,
};

/// Left edge of each digit: hour tens, hour ones, minute tens, minute ones.
const DIGIT_X: [usize; 4] = [0, 3, 7, 10];
const COLON: [(usize, usize); 2] = [(6, 1), (6, 3)];

/// Draw `time` as 12-hour `H H : M M` into a 13×7 buffer.
///
/// `time` is `(hour_12, minute)`; `None` draws `--:--`. A single-digit hour leaves the
/// tens position blank.
pub fn draw_time<const N: usize>(
    buffer: &mut LayerBuffer<N>,
    time: Option<(u8, u8)>,
    color: Rgb,
) {
    buffer.clear();
    let digits = match time {
        Some((hour, minute)) => [
            if hour >= 10 { digit(hour / 10) } else { ' ' },
            digit(hour % 10),
            digit(minute / 10),
            digit(minute % 10),
        ],
        None => ['-'; 4],
    };
    for (x, ch) in DIGIT_X.into_iter().zip(digits) {
        draw_char(buffer, x, 0, ch, Font::Font3x5, color);
    }
    for (x, y) in COLON {
        buffer.set_pixel(x, y, color);
    }
}

fn digit(value: u8) -> char {
    char::from_digit(u32::from(value), 10).unwrap_or('-')
}

/// Shows the local time from a [`WallClock`], redrawn every second.
pub struct ClockApp<'a, C: WallClock> {
    buffer: OwnedBuffer<'a>,
    clock: &'a C,
    color: Rgb,
}

impl<'a, C: WallClock> ClockApp<'a, C> {
    /// A stopped clock drawing in white.
    #[must_use]
    pub const fn new(compositor: &'a MatrixCompositor, clock: &'a C) -> Self {
        Self::with_color(compositor, clock, colors::WHITE)
    }

    /// A stopped clock drawing in `color`.
    #[must_use]
    pub const fn with_color(compositor: &'a MatrixCompositor, clock: &'a C, color: Rgb) -> Self {
        Self {
            buffer: OwnedBuffer::new(compositor, PLACEMENT),
            clock,
            color,
        }
    }

    /// `true` between `init` and `teardown`.
    #[must_use]
    pub const fn has_buffer(&self) -> bool {
        self.buffer.is_acquired()
    }
}

impl<C: WallClock> App for ClockApp<'_, C> {
    fn name(&self) -> &str {
        CLOCK_APP_NAME
    }

    fn init(&mut self) -> Result<()> {
        self.buffer.acquire(CLOCK_APP_NAME)
    }

    fn tick(&mut self) -> Duration {
        let time = self.clock.local_time().map(|now| {
            let (hour, minute, _) = h12_m_s(&now);
            (hour, minute)
        });
        let color = self.color;
        self.buffer
            .draw(CLOCK_APP_NAME, |buffer| draw_time(buffer, time, color));
        ONE_SECOND
    }

    fn teardown(&mut self) {
        self.buffer.release(CLOCK_APP_NAME);
    }
}
