//! Firmware update progress bar on the right edge.

use embassy_time::Duration;

use super::{OwnedBuffer, Placement};
use crate::app_manager::App;
use crate::layer::{Layer, LayerBuffer};
use crate::led_strip::colors;
use crate::status::{UpdateProgress, UpdateStatus};
use crate::{MatrixCompositor, Result};

/// Name the progress bar registers under.
pub const UPDATE_APP_NAME: &str = "update";

/// Redraw period while an update is running.
pub const IN_PROGRESS_PERIOD: Duration = Duration::from_millis(100);

/// Redraw period otherwise.
pub const IDLE_PROGRESS_PERIOD: Duration = Duration::from_millis(2500);

const PLACEMENT: Placement = Placement {
    width: 1,
    height: 7,
    x: 31,
    y: 1,
    layer: Layer::System,
};

/// Draw `status` into a column buffer.
///
/// While in progress, the top `percent * height / 100` cells are yellow and the rest black.
/// Success fills green, failure red, and an idle or starting update leaves the column
/// transparent.
pub fn draw_progress<const N: usize>(
    buffer: &mut LayerBuffer<N>,
    status: UpdateStatus,
    percent: u8,
) {
    match status {
        UpdateStatus::Idle | UpdateStatus::Starting => buffer.clear(),
        UpdateStatus::InProgress => {
            let (width, height) = (buffer.width(), buffer.height());
            let lit = usize::from(percent.min(100)) * height / 100;
            for y in 0..height {
                let color = if y < lit { colors::YELLOW } else { colors::BLACK };
                for x in 0..width {
                    buffer.set_pixel(x, y, color);
                }
            }
        }
        UpdateStatus::Success => buffer.fill(colors::GREEN),
        UpdateStatus::Failed => buffer.fill(colors::RED),
    }
}

/// Shows [`UpdateProgress`] as a vertical bar.
pub struct UpdateProgressApp<'a> {
    buffer: OwnedBuffer<'a>,
    progress: &'a UpdateProgress,
}

impl<'a> UpdateProgressApp<'a> {
    /// A stopped progress bar.
    #[must_use]
    pub const fn new(compositor: &'a MatrixCompositor, progress: &'a UpdateProgress) -> Self {
        Self {
            buffer: OwnedBuffer::new(compositor, PLACEMENT),
            progress,
        }
    }

    /// `true` between `init` and `teardown`.
    #[must_use]
    pub const fn has_buffer(&self) -> bool {
        self.buffer.is_acquired()
    }
}

impl App for UpdateProgressApp<'_> {
    fn name(&self) -> &str {
        UPDATE_APP_NAME
    }

    fn init(&mut self) -> Result<()> {
        self.buffer.acquire(UPDATE_APP_NAME)
    }

    fn tick(&mut self) -> Duration {
        let status = self.progress.status();
        let percent = self.progress.percent();
        self.buffer
            .draw(UPDATE_APP_NAME, |buffer| draw_progress(buffer, status, percent));
        if status == UpdateStatus::InProgress {
            IN_PROGRESS_PERIOD
        } else {
            IDLE_PROGRESS_PERIOD
        }
    }

    fn teardown(&mut self) {
        self.buffer.release(UPDATE_APP_NAME);
    }
}
