//! Drawing primitives for layer buffers.
//!
//! Everything here draws into a [`LayerBuffer`], never into the physical frame, and every
//! pixel goes through [`LayerBuffer::try_set_pixel`]. Rectangles and lines clip silently;
//! characters are all-or-nothing.
//!
//! For anything fancier, a [`LayerBuffer`] is also an embedded-graphics `DrawTarget`.

use crate::layer::LayerBuffer;
use crate::led2d::Cell;
use crate::led_strip::{Rgb, colors};

/// Bitmap fonts available to [`draw_char`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Font {
    /// 3 columns by 5 rows: digits, `:`, `-`, `%`, and space.
    #[default]
    Font3x5,
}

/// Rows of a 3×5 glyph, top first. Bit 2 is the leftmost column.
type Glyph3x5 = [u8; 5];

#[rustfmt::skip]
const DIGITS_3X5: [Glyph3x5; 10] = [
    [0b111, 0b101, 0b101, 0b101, 0b111], // 0
    [0b010, 0b110, 0b010, 0b010, 0b111], // 1
    [0b111, 0b001, 0b111, 0b100, 0b111], // 2
    [0b111, 0b001, 0b111, 0b001, 0b111], // 3
    [0b101, 0b101, 0b111, 0b001, 0b001], // 4
    [0b111, 0b100, 0b111, 0b001, 0b111], // 5
    [0b111, 0b100, 0b111, 0b101, 0b111], // 6
    [0b111, 0b001, 0b001, 0b001, 0b001], // 7
    [0b111, 0b101, 0b111, 0b101, 0b111], // 8
    [0b111, 0b101, 0b111, 0b001, 0b111], // 9
];

const COLON_3X5: Glyph3x5 = [0b000, 0b010, 0b000, 0b010, 0b000];
const DASH_3X5: Glyph3x5 = [0b000, 0b000, 0b111, 0b000, 0b000];
const PERCENT_3X5: Glyph3x5 = [0b101, 0b001, 0b010, 0b100, 0b101];
const SPACE_3X5: Glyph3x5 = [0; 5];

impl Font {
    /// Glyph width in pixels.
    #[must_use]
    pub const fn width(self) -> usize {
        match self {
            Self::Font3x5 => 3,
        }
    }

    /// Glyph height in pixels.
    #[must_use]
    pub const fn height(self) -> usize {
        match self {
            Self::Font3x5 => 5,
        }
    }

    /// Bitmap rows for `ch`, or `None` if the font has no such glyph.
    #[must_use]
    pub const fn glyph(self, ch: char) -> Option<[u8; 5]> {
        match self {
            Self::Font3x5 => match ch {
                '0'..='9' => Some(DIGITS_3X5[ch as usize - '0' as usize]),
                ':' => Some(COLON_3X5),
                '-' => Some(DASH_3X5),
                '%' => Some(PERCENT_3X5),
                ' ' => Some(SPACE_3X5),
                _ => None,
            },
        }
    }
}

/// Fill `[x, x + width) × [y, y + height)`, dropping whatever lies outside the buffer.
pub fn draw_rectangle<const N: usize>(
    buffer: &mut LayerBuffer<N>,
    x: usize,
    y: usize,
    width: usize,
    height: usize,
    color: impl Into<Cell>,
) {
    if !buffer.is_active() {
        warn!("{}: rectangle on inactive buffer", buffer.owner());
        return;
    }
    let color = color.into();
    let x_end = x.saturating_add(width).min(buffer.width());
    let y_end = y.saturating_add(height).min(buffer.height());
    for row in y..y_end {
        for col in x..x_end {
            buffer.set_pixel(col, row, color);
        }
    }
}

/// Draw the inclusive line from `(x1, y1)` to `(x2, y2)` with integer Bresenham stepping.
///
/// The endpoints are put in a fixed order first, so swapping them draws the same pixels.
/// Only the stretch of the major axis that overlaps the buffer is walked, so endpoints far
/// outside the buffer cost nothing extra.
pub fn draw_line<const N: usize>(
    buffer: &mut LayerBuffer<N>,
    x1: usize,
    y1: usize,
    x2: usize,
    y2: usize,
    color: impl Into<Cell>,
) {
    if !buffer.is_active() {
        warn!("{}: line on inactive buffer", buffer.owner());
        return;
    }
    let color = color.into();
    let ((x_start, y_start), (x_end, y_end)) = if (x1, y1) <= (x2, y2) {
        ((x1, y1), (x2, y2))
    } else {
        ((x2, y2), (x1, y1))
    };
    // x_start <= x_end after ordering; y may run either way.
    let dx = x_end.abs_diff(x_start);
    let dy = y_end.abs_diff(y_start);
    let y_rising = y_end >= y_start;
    let (width, height) = (buffer.width(), buffer.height());

    if dx >= dy {
        if x_start >= width {
            return;
        }
        for step in 0..=dx.min(width - 1 - x_start) {
            let Some(offset) = minor_offset(step, dy, dx) else {
                break;
            };
            let y = if y_rising {
                y_start.checked_add(offset)
            } else {
                y_start.checked_sub(offset)
            };
            if let Some(y) = y
                && y < height
            {
                buffer.set_pixel(x_start + step, y, color);
            }
        }
    } else {
        let steps = if y_rising {
            if y_start >= height {
                return;
            }
            0..=dy.min(height - 1 - y_start)
        } else {
            y_start.saturating_sub(height - 1)..=dy
        };
        for step in steps {
            let Some(offset) = minor_offset(step, dx, dy) else {
                break;
            };
            let y = if y_rising {
                y_start + step
            } else {
                y_start - step
            };
            if let Some(x) = x_start.checked_add(offset)
                && x < width
            {
                buffer.set_pixel(x, y, color);
            }
        }
    }
}

/// Minor-axis offset after `step` major-axis steps: `step * minor / major`, rounded half up.
fn minor_offset(step: usize, minor: usize, major: usize) -> Option<usize> {
    if major == 0 {
        return Some(0);
    }
    let (step, minor, major) = (
        u128::try_from(step).ok()?,
        u128::try_from(minor).ok()?,
        u128::try_from(major).ok()?,
    );
    let numerator = step.checked_mul(minor)?.checked_mul(2)?.checked_add(major)?;
    usize::try_from(numerator / major.checked_mul(2)?).ok()
}

/// Draw one glyph with its top-left at `(x, y)`.
///
/// Set bits become `color` and clear bits become black, so the whole glyph cell is
/// repainted. Nothing is drawn (and a warning is logged) if the glyph is unknown, the
/// footprint does not fit in the buffer, or the buffer is inactive.
pub fn draw_char<const N: usize>(
    buffer: &mut LayerBuffer<N>,
    x: usize,
    y: usize,
    ch: char,
    font: Font,
    color: Rgb,
) {
    if !buffer.is_active() {
        warn!("{}: char on inactive buffer", buffer.owner());
        return;
    }
    let Some(glyph) = font.glyph(ch) else {
        warn!("{}: no glyph for {}", buffer.owner(), ch);
        return;
    };
    let (width, height) = (font.width(), font.height());
    if x.saturating_add(width) > buffer.width() || y.saturating_add(height) > buffer.height() {
        warn!(
            "{}: '{}' does not fit at ({}, {}) in {}x{}",
            buffer.owner(),
            ch,
            x,
            y,
            buffer.width(),
            buffer.height()
        );
        return;
    }

    for (row, bits) in glyph.iter().take(height).enumerate() {
        for col in 0..width {
            let lit = (*bits >> (width - 1 - col)) & 1 == 1;
            buffer.set_pixel(x + col, y + row, if lit { color } else { colors::BLACK });
        }
    }
}

/// Draw `text` left to right starting at `(x, y)`, leaving `spacing` columns between glyphs.
///
/// Each character follows the rules of [`draw_char`].
pub fn draw_text<const N: usize>(
    buffer: &mut LayerBuffer<N>,
    x: usize,
    y: usize,
    text: &str,
    font: Font,
    color: Rgb,
    spacing: usize,
) {
    let advance = font.width().saturating_add(spacing);
    let mut next = Some(x);
    for ch in text.chars() {
        let Some(col) = next else {
            warn!("{}: text runs past the coordinate range", buffer.owner());
            break;
        };
        draw_char(buffer, col, y, ch, font, color);
        next = col.checked_add(advance);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_digit_has_a_glyph() {
        for ch in '0'..='9' {
            assert!(Font::Font3x5.glyph(ch).is_some(), "missing {ch}");
        }
        assert!(Font::Font3x5.glyph('A').is_none());
    }

    #[test]
    fn glyph_rows_fit_the_width() {
        for ch in "0123456789:-% ".chars() {
            let glyph = Font::Font3x5.glyph(ch).unwrap();
            assert!(glyph.iter().all(|row| *row < 1 << Font::Font3x5.width()));
        }
    }
}
