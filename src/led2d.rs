//! Logical 2D frames for the LED matrix.
//!
//! A [`Frame2d`] is addressed by `(x, y)` with `(0, 0)` at the top-left, independent of
//! how the strip is wired. Each cell is a [`Cell`]: either a color or [`TRANSPARENT`].
//! Black (`Some(colors::BLACK)`) is a real color that turns an LED off and occludes
//! whatever is underneath; transparent lets lower layers show through.
//!
//! See [`layout`] for mapping frames onto the physical wiring.
//!
//! Frames implement the [`embedded-graphics`](https://docs.rs/embedded-graphics)
//! [`DrawTarget`], so anything embedded-graphics can draw can be drawn into one.

pub mod layout;

use core::convert::Infallible;
use core::ops::{Deref, DerefMut, Index, IndexMut};

use embedded_graphics::Pixel;
use embedded_graphics::pixelcolor::{Rgb888, RgbColor};
use embedded_graphics::prelude::{DrawTarget, OriginDimensions, Size};

use crate::led_strip::{Rgb, colors};

/// One pixel of a logical frame or layer buffer: a color, or [`TRANSPARENT`].
pub type Cell = Option<Rgb>;

/// A cell that contributes nothing when composited.
pub const TRANSPARENT: Cell = None;

/// Color a cell shows on the panel: transparent cells are dark.
#[must_use]
pub const fn cell_to_rgb(cell: Cell) -> Rgb {
    match cell {
        Some(color) => color,
        None => colors::BLACK,
    }
}

/// Convert an embedded-graphics color into a strip color.
#[must_use]
pub fn rgb888_to_rgb(color: Rgb888) -> Rgb {
    Rgb::new(color.r(), color.g(), color.b())
}

/// Row-major logical frame of [`Cell`]s, `W` columns by `H` rows.
///
/// Index with `frame[(x, y)]`; rows are `frame.0[y]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Frame2d<const W: usize, const H: usize>(pub [[Cell; W]; H]);

impl<const W: usize, const H: usize> Frame2d<W, H> {
    /// Frame width in pixels.
    pub const WIDTH: usize = W;
    /// Frame height in pixels.
    pub const HEIGHT: usize = H;
    /// Total pixels.
    pub const LEN: usize = W * H;

    /// Create a fully transparent frame.
    #[must_use]
    pub const fn new() -> Self {
        Self([[TRANSPARENT; W]; H])
    }

    /// Create a frame filled with a single cell value.
    #[must_use]
    pub const fn filled(cell: Cell) -> Self {
        Self([[cell; W]; H])
    }

    /// Cell at `(x, y)`, or `None` when out of bounds.
    #[must_use]
    pub fn get(&self, x: usize, y: usize) -> Option<Cell> {
        self.0.get(y).and_then(|row| row.get(x)).copied()
    }

    /// Reset every cell to [`TRANSPARENT`].
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// The frame as the panel shows it, with transparent cells dark.
    #[must_use]
    pub fn to_rgb(&self) -> [[Rgb; W]; H] {
        self.0.map(|row| row.map(cell_to_rgb))
    }
}

impl<const W: usize, const H: usize> Deref for Frame2d<W, H> {
    type Target = [[Cell; W]; H];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<const W: usize, const H: usize> DerefMut for Frame2d<W, H> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<const W: usize, const H: usize> Index<(usize, usize)> for Frame2d<W, H> {
    type Output = Cell;

    fn index(&self, (x_index, y_index): (usize, usize)) -> &Self::Output {
        assert!(x_index < W, "x_index must be within width");
        assert!(y_index < H, "y_index must be within height");
        &self.0[y_index][x_index]
    }
}

impl<const W: usize, const H: usize> IndexMut<(usize, usize)> for Frame2d<W, H> {
    fn index_mut(&mut self, (x_index, y_index): (usize, usize)) -> &mut Self::Output {
        assert!(x_index < W, "x_index must be within width");
        assert!(y_index < H, "y_index must be within height");
        &mut self.0[y_index][x_index]
    }
}

impl<const W: usize, const H: usize> From<[[Cell; W]; H]> for Frame2d<W, H> {
    fn from(array: [[Cell; W]; H]) -> Self {
        Self(array)
    }
}

impl<const W: usize, const H: usize> Default for Frame2d<W, H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const W: usize, const H: usize> OriginDimensions for Frame2d<W, H> {
    fn size(&self) -> Size {
        Size::new(W as u32, H as u32)
    }
}

impl<const W: usize, const H: usize> DrawTarget for Frame2d<W, H> {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> core::result::Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(coord, color) in pixels {
            let (Ok(x_index), Ok(y_index)) = (usize::try_from(coord.x), usize::try_from(coord.y))
            else {
                continue;
            };
            if let Some(cell) = self.0.get_mut(y_index).and_then(|row| row.get_mut(x_index)) {
                *cell = Some(rgb888_to_rgb(color));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::prelude::Point;
    use embedded_graphics::primitives::{Line, Primitive, PrimitiveStyle};
    use embedded_graphics::Drawable;

    #[test]
    fn new_frame_is_transparent_and_shows_dark() {
        let frame = Frame2d::<4, 2>::new();
        assert!(frame.iter().flatten().all(|cell| *cell == TRANSPARENT));
        assert_eq!(frame.to_rgb(), [[colors::BLACK; 4]; 2]);
    }

    #[test]
    fn black_is_not_transparent() {
        assert_ne!(Some(colors::BLACK), TRANSPARENT);
    }

    #[test]
    fn embedded_graphics_clips_to_frame() {
        let mut frame = Frame2d::<4, 2>::new();
        Line::new(Point::new(-2, 0), Point::new(10, 0))
            .into_styled(PrimitiveStyle::with_stroke(Rgb888::RED, 1))
            .draw(&mut frame)
            .unwrap();
        assert!(frame.0[0].iter().all(|cell| *cell == Some(colors::RED)));
        assert!(frame.0[1].iter().all(|cell| *cell == TRANSPARENT));
        assert_eq!(frame.get(4, 0), None);
    }
}
