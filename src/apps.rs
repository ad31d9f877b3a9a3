//! The display producers that ship with the clock.
//!
//! Each producer owns one layer buffer, acquired in [`App::init`](crate::app_manager::App::init)
//! and released in [`App::teardown`](crate::app_manager::App::teardown). Between the two it
//! reads a status source once per tick and redraws its buffer. The drawing itself lives in
//! plain functions (`draw_time`, `draw_progress`, `draw_status`) so it can be checked without
//! a compositor.

pub mod clock;
pub mod status_indicator;
pub mod update_progress;

pub use clock::{ClockApp, draw_time};
pub use status_indicator::{StatusApp, draw_status};
pub use update_progress::{UpdateProgressApp, draw_progress};

use crate::compositor::LayerHandle;
use crate::layer::{Layer, LayerBuffer};
use crate::{MATRIX_LEN, MatrixCompositor, Result};

/// Placement of a producer's buffer on the display.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Placement {
    width: usize,
    height: usize,
    x: usize,
    y: usize,
    layer: Layer,
}

/// A layer buffer held by a producer between `init` and `teardown`.
struct OwnedBuffer<'a> {
    compositor: &'a MatrixCompositor,
    placement: Placement,
    handle: Option<LayerHandle>,
}

impl<'a> OwnedBuffer<'a> {
    const fn new(compositor: &'a MatrixCompositor, placement: Placement) -> Self {
        Self {
            compositor,
            placement,
            handle: None,
        }
    }

    fn acquire(&mut self, owner: &str) -> Result<()> {
        if self.handle.is_some() {
            return Ok(());
        }
        let Placement {
            width,
            height,
            x,
            y,
            layer,
        } = self.placement;
        self.handle = Some(
            self.compositor
                .create_buffer(owner, width, height, x, y, layer)?,
        );
        Ok(())
    }

    fn release(&mut self, owner: &str) {
        if let Some(handle) = self.handle.take()
            && let Err(err) = self.compositor.release_buffer(handle)
        {
            warn!("{}: release failed: {}", owner, err);
        }
    }

    /// Redraw through `f`. A handle that went stale is dropped so the producer stops drawing.
    fn draw(&mut self, owner: &str, f: impl FnOnce(&mut LayerBuffer<MATRIX_LEN>)) {
        let Some(handle) = self.handle.as_ref() else {
            debug!("{}: tick without a buffer", owner);
            return;
        };
        if let Err(err) = self.compositor.with_buffer(handle, f) {
            warn!("{}: {}", owner, err);
            self.handle = None;
        }
    }

    const fn is_acquired(&self) -> bool {
        self.handle.is_some()
    }
}
