//! Producer-owned drawing surfaces.
//!
//! A [`LayerBuffer`] is a rectangle of [`Cell`]s placed at `(x, y)` on the display and
//! tagged with a [`Layer`]. Producers draw into their own buffer; the compositor reads
//! every active buffer and stacks them by layer.
//!
//! [`LayerBuffer::try_set_pixel`] is the one write path every drawing operation funnels
//! through, so the bounds and active-flag checks live in exactly one place.

use core::convert::Infallible;

use derive_more::Display;
use embedded_graphics::Pixel;
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::{DrawTarget, OriginDimensions, Size};
use heapless::{String, Vec};

use crate::led2d::{Cell, TRANSPARENT, rgb888_to_rgb};
use crate::{Error, Result};

/// Longest owner name kept by a buffer; longer names are truncated.
pub const OWNER_NAME_LEN: usize = 32;

/// Precedence tier of a buffer. Later tiers cover earlier ones.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Layer {
    /// Lowest tier, for wallpapers and ambient animation.
    #[default]
    Background,
    /// Regular app content such as the clock.
    Foreground,
    /// Transient notifications drawn over app content.
    Popup,
    /// System indicators that must never be hidden.
    System,
}

impl Layer {
    /// Every tier, lowest precedence first.
    pub const ALL: [Self; 4] = [Self::Background, Self::Foreground, Self::Popup, Self::System];
}

/// A rectangular pixel surface owned by one producer.
///
/// The size is fixed at creation. Storage is row-major, `width * height` cells, starting
/// out transparent. `N` is the storage capacity of the slot the buffer lives in.
#[derive(Clone, Debug)]
pub struct LayerBuffer<const N: usize> {
    owner: String<OWNER_NAME_LEN>,
    width: usize,
    height: usize,
    x: usize,
    y: usize,
    layer: Layer,
    active: bool,
    opacity: u8,
    pixels: Vec<Cell, N>,
}

impl<const N: usize> LayerBuffer<N> {
    /// Create an active, fully opaque, transparent-filled buffer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for a zero width or height and
    /// [`Error::AllocationFailed`] if `width * height` exceeds the storage capacity `N`.
    pub fn new(
        owner: &str,
        width: usize,
        height: usize,
        x: usize,
        y: usize,
        layer: Layer,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidArgument);
        }
        let len = width.checked_mul(height).ok_or(Error::AllocationFailed)?;
        let mut pixels = Vec::new();
        pixels
            .resize(len, TRANSPARENT)
            .map_err(|()| Error::AllocationFailed)?;

        let mut owner_name = String::new();
        for ch in owner.chars() {
            if owner_name.push(ch).is_err() {
                break;
            }
        }

        Ok(Self {
            owner: owner_name,
            width,
            height,
            x,
            y,
            layer,
            active: true,
            opacity: u8::MAX,
            pixels,
        })
    }

    /// Name of the producer that owns this buffer.
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Buffer width in pixels.
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Buffer height in pixels.
    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    /// Top-left placement on the display.
    #[must_use]
    pub const fn position(&self) -> (usize, usize) {
        (self.x, self.y)
    }

    /// Move the buffer on the display.
    pub fn set_position(&mut self, x: usize, y: usize) {
        self.x = x;
        self.y = y;
    }

    /// Precedence tier.
    #[must_use]
    pub const fn layer(&self) -> Layer {
        self.layer
    }

    /// Move the buffer to another tier.
    pub fn set_layer(&mut self, layer: Layer) {
        self.layer = layer;
    }

    /// Inactive buffers keep their storage but are skipped by the compositor and reject draws.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Show or hide the buffer.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Stored opacity. Not consumed by composition yet: every non-transparent cell is opaque.
    #[must_use]
    pub const fn opacity(&self) -> u8 {
        self.opacity
    }

    /// Store an opacity for future blending.
    pub fn set_opacity(&mut self, opacity: u8) {
        self.opacity = opacity;
    }

    /// Cell at local `(x, y)`, or `None` when out of bounds.
    #[must_use]
    pub fn pixel(&self, x: usize, y: usize) -> Option<Cell> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get(y * self.width + x).copied()
    }

    /// Row-major view of the storage.
    #[must_use]
    pub fn pixels(&self) -> &[Cell] {
        &self.pixels
    }

    /// Bounds-checked write of one cell.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the buffer is inactive and
    /// [`Error::OutOfBounds`] if `(x, y)` lies outside the buffer.
    pub fn try_set_pixel(&mut self, x: usize, y: usize, color: impl Into<Cell>) -> Result<()> {
        if !self.active {
            return Err(Error::InvalidArgument);
        }
        if x >= self.width || y >= self.height {
            return Err(Error::OutOfBounds);
        }
        let cell = self
            .pixels
            .get_mut(y * self.width + x)
            .ok_or(Error::OutOfBounds)?;
        *cell = color.into();
        Ok(())
    }

    /// Write one cell, logging and ignoring writes to an inactive buffer or outside its bounds.
    pub fn set_pixel(&mut self, x: usize, y: usize, color: impl Into<Cell>) {
        if let Err(err) = self.try_set_pixel(x, y, color) {
            warn!("{}: pixel ({}, {}) not drawn: {}", self.owner.as_str(), x, y, err);
        }
    }

    /// Set every cell to `color`. Ignored (with a warning) while inactive.
    pub fn fill(&mut self, color: impl Into<Cell>) {
        if !self.active {
            warn!("{}: fill on inactive buffer", self.owner.as_str());
            return;
        }
        let color = color.into();
        self.pixels.iter_mut().for_each(|cell| *cell = color);
    }

    /// Reset every cell to [`TRANSPARENT`].
    pub fn clear(&mut self) {
        self.pixels.iter_mut().for_each(|cell| *cell = TRANSPARENT);
    }
}

impl<const N: usize> OriginDimensions for LayerBuffer<N> {
    #[allow(
        clippy::cast_possible_truncation,
        reason = "buffers are at most a panel in size"
    )]
    fn size(&self) -> Size {
        Size::new(self.width as u32, self.height as u32)
    }
}

impl<const N: usize> DrawTarget for LayerBuffer<N> {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> core::result::Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(coord, color) in pixels {
            let (Ok(x), Ok(y)) = (usize::try_from(coord.x), usize::try_from(coord.y)) else {
                continue;
            };
            // embedded-graphics expects silent clipping
            let _ = self.try_set_pixel(x, y, rgb888_to_rgb(color));
        }
        Ok(())
    }
}
