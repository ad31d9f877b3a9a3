//! One-pixel network indicator in the top-left corner.

use embassy_time::Duration;

use super::{OwnedBuffer, Placement};
use crate::app_manager::App;
use crate::layer::{Layer, LayerBuffer};
use crate::led_strip::{Rgb, colors};
use crate::status::{NetworkPhase, NetworkStatus};
use crate::{MatrixCompositor, Result};

/// Name the indicator registers under.
pub const STATUS_APP_NAME: &str = "status";

/// Redraw (and blink) period.
pub const STATUS_PERIOD: Duration = Duration::from_millis(500);

/// Green for "connected", dim so it does not compete with the clock.
pub const DIM_GREEN: Rgb = Rgb::new(0, 32, 0);

const PLACEMENT: Placement = Placement {
    width: 1,
    height: 1,
    x: 0,
    y: 0,
    layer: Layer::Foreground,
};

/// Color of the indicator for `phase`. `blink_on` selects the phase of the connecting blink.
#[must_use]
pub const fn status_color(phase: NetworkPhase, blink_on: bool) -> Rgb {
    match phase {
        NetworkPhase::Disconnected => colors::RED,
        NetworkPhase::Connecting if blink_on => colors::YELLOW,
        NetworkPhase::Connecting => colors::BLACK,
        NetworkPhase::Connected => DIM_GREEN,
    }
}

/// Paint the whole buffer with [`status_color`].
pub fn draw_status<const N: usize>(
    buffer: &mut LayerBuffer<N>,
    phase: NetworkPhase,
    blink_on: bool,
) {
    buffer.fill(status_color(phase, blink_on));
}

/// Shows [`NetworkStatus`] as a single pixel.
pub struct StatusApp<'a> {
    buffer: OwnedBuffer<'a>,
    network: &'a NetworkStatus,
    blink_on: bool,
}

impl<'a> StatusApp<'a> {
    /// A stopped indicator.
    #[must_use]
    pub const fn new(compositor: &'a MatrixCompositor, network: &'a NetworkStatus) -> Self {
        Self {
            buffer: OwnedBuffer::new(compositor, PLACEMENT),
            network,
            blink_on: true,
        }
    }

    /// `true` between `init` and `teardown`.
    #[must_use]
    pub const fn has_buffer(&self) -> bool {
        self.buffer.is_acquired()
    }
}

impl App for StatusApp<'_> {
    fn name(&self) -> &str {
        STATUS_APP_NAME
    }

    fn init(&mut self) -> Result<()> {
        self.blink_on = true;
        self.buffer.acquire(STATUS_APP_NAME)
    }

    fn tick(&mut self) -> Duration {
        let phase = self.network.phase();
        let blink_on = self.blink_on;
        self.buffer
            .draw(STATUS_APP_NAME, |buffer| draw_status(buffer, phase, blink_on));
        self.blink_on = !self.blink_on;
        STATUS_PERIOD
    }

    fn teardown(&mut self) {
        self.buffer.release(STATUS_APP_NAME);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connecting_blinks() {
        assert_eq!(status_color(NetworkPhase::Connecting, true), colors::YELLOW);
        assert_eq!(status_color(NetworkPhase::Connecting, false), colors::BLACK);
        assert_eq!(status_color(NetworkPhase::Disconnected, false), colors::RED);
        assert_eq!(status_color(NetworkPhase::Connected, true), DIM_GREEN);
    }
}
