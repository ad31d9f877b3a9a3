//! Panel wiring: how a logical `(x, y)` grid maps onto the strip order of the LEDs.
//!
//! [`LedLayout`] is a compile-time checked wiring table. [`Rotation`] picks the table for
//! the mounted orientation of the panel, and [`PixelMapper`] answers the per-pixel
//! question the compositor asks every frame: "which LED is row `r`, column `c`?".

use crate::{Error, Result};

/// Compile-time description of panel geometry and wiring.
///
/// Entry `i` of the table is the `(x, y)` position of LED `i` on the strip.
/// `(0, 0)` is the top-left corner, `x` grows to the right and `y` grows downward.
///
/// Construction validates (in `const` context when used in a `const`) that every
/// coordinate is in bounds and that each cell appears exactly once.
///
/// ```rust
/// use matrix_envoy::led2d::layout::LedLayout;
///
/// // A 2-wide, 4-tall row serpentine wired from the bottom, turned a quarter counter-clockwise.
/// const WIRING: LedLayout<8, 4, 2> =
///     LedLayout::<8, 2, 4>::serpentine_row_major().flip_v().rotate_ccw();
/// const EXPECTED: LedLayout<8, 4, 2> =
///     LedLayout::new([(3, 1), (3, 0), (2, 0), (2, 1), (1, 1), (1, 0), (0, 0), (0, 1)]);
/// const _: () = assert!(WIRING.equals(&EXPECTED));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LedLayout<const N: usize, const W: usize, const H: usize> {
    map: [(u16, u16); N],
}

impl<const N: usize, const W: usize, const H: usize> LedLayout<N, W, H> {
    /// Return the array mapping LED wiring order to `(x, y)` coordinates.
    #[must_use]
    pub const fn index_to_xy(&self) -> &[(u16, u16); N] {
        &self.map
    }

    /// Invert the wiring table: entry `y * W + x` holds the LED index of that cell.
    #[must_use]
    pub const fn xy_to_index(&self) -> [u16; N] {
        assert!(
            N <= u16::MAX as usize,
            "total LEDs must fit in u16 for xy_to_index"
        );

        let mut inverse = [u16::MAX; N];
        let mut led_index = 0;
        while led_index < N {
            let (x, y) = self.map[led_index];
            let cell = y as usize * W + x as usize;
            assert!(
                inverse[cell] == u16::MAX,
                "duplicate (x, y) in xy_to_index inversion"
            );
            inverse[cell] = led_index as u16;
            led_index += 1;
        }
        inverse
    }

    /// Structural equality usable in `const` assertions.
    #[must_use]
    pub const fn equals(&self, other: &Self) -> bool {
        let mut i = 0;
        while i < N {
            if self.map[i].0 != other.map[i].0 || self.map[i].1 != other.map[i].1 {
                return false;
            }
            i += 1;
        }
        true
    }

    /// Build a layout from an explicit list of `(x, y)` positions in strip order.
    ///
    /// # Panics
    ///
    /// Panics (at compile time in `const` context) if `W * H != N`, a coordinate is out of
    /// bounds, or a cell is listed twice.
    #[must_use]
    pub const fn new(map: [(u16, u16); N]) -> Self {
        assert!(W > 0 && H > 0, "W and H must be positive");
        assert!(W * H == N, "W*H must equal N");

        let mut seen = [false; N];
        let mut i = 0;
        while i < N {
            let (x, y) = map[i];
            let x = x as usize;
            let y = y as usize;
            assert!(x < W, "x out of bounds");
            assert!(y < H, "y out of bounds");

            let cell = y * W + x;
            assert!(!seen[cell], "duplicate (x, y) in mapping");
            seen[cell] = true;
            i += 1;
        }
        // N distinct in-bounds cells out of W * H == N means every cell is covered.

        Self { map }
    }

    /// Row-major serpentine starting at the top-left: even rows run right, odd rows left.
    #[must_use]
    pub const fn serpentine_row_major() -> Self {
        assert!(W * H == N, "W*H must equal N");
        let mut mapping = [(0_u16, 0_u16); N];
        let mut y = 0;
        while y < H {
            let mut x = 0;
            while x < W {
                let led_index = if y % 2 == 0 {
                    y * W + x
                } else {
                    y * W + (W - 1 - x)
                };
                mapping[led_index] = (x as u16, y as u16);
                x += 1;
            }
            y += 1;
        }
        Self::new(mapping)
    }

    /// Rotate the panel 90° clockwise; width and height swap.
    #[must_use]
    pub const fn rotate_cw(self) -> LedLayout<N, H, W> {
        let mut out = [(0u16, 0u16); N];
        let mut i = 0;
        while i < N {
            let (x, y) = self.map[i];
            out[i] = ((H - 1 - y as usize) as u16, x);
            i += 1;
        }
        LedLayout::<N, H, W>::new(out)
    }

    /// Rotate the panel 90° counter-clockwise; width and height swap.
    #[must_use]
    pub const fn rotate_ccw(self) -> LedLayout<N, H, W> {
        self.rotate_cw().rotate_cw().rotate_cw()
    }

    /// Mirror top to bottom.
    #[must_use]
    pub const fn flip_v(self) -> Self {
        let mut out = [(0u16, 0u16); N];
        let mut i = 0;
        while i < N {
            let (x, y) = self.map[i];
            out[i] = (x, (H - 1 - y as usize) as u16);
            i += 1;
        }
        Self::new(out)
    }
}

/// Mounting orientation of the physical panel relative to the logical display.
///
/// Each orientation is a wiring strategy; only [`Rotation::Rotate270`] (the appliance's
/// mounting) has a table today. Selecting any other is reported when the compositor is built.
///
/// The appliance panel is `H` LEDs wide and `W` tall in its own frame, wired as a row
/// serpentine that starts at the bottom-left. Turned a quarter counter-clockwise, display
/// column `x` lands on strip block `W - 1 - x`, running down when `x` is even and up when it
/// is odd.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Rotation {
    /// Panel mounted upright.
    Rotate0,
    /// Panel mounted a quarter turn clockwise.
    Rotate90,
    /// Panel mounted upside down.
    Rotate180,
    /// Panel mounted a quarter turn counter-clockwise (the appliance).
    #[default]
    Rotate270,
}

impl Rotation {
    /// Wiring table for this orientation on a `W`×`H` display.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedRotation`] for orientations without a table.
    pub const fn led_layout<const N: usize, const W: usize, const H: usize>(
        self,
    ) -> Result<LedLayout<N, W, H>> {
        match self {
            Self::Rotate270 => Ok(LedLayout::<N, H, W>::serpentine_row_major()
                .flip_v()
                .rotate_ccw()),
            Self::Rotate0 | Self::Rotate90 | Self::Rotate180 => {
                Err(Error::UnsupportedRotation(self))
            }
        }
    }
}

/// Logical `(row, col)` to strip index lookup built from a [`LedLayout`].
#[derive(Clone, Debug)]
pub struct PixelMapper<const N: usize, const W: usize, const H: usize> {
    mapping_by_xy: [u16; N],
}

impl<const N: usize, const W: usize, const H: usize> PixelMapper<N, W, H> {
    /// Build the lookup table for `layout`.
    #[must_use]
    pub const fn new(layout: &LedLayout<N, W, H>) -> Self {
        Self {
            mapping_by_xy: layout.xy_to_index(),
        }
    }

    /// Build the lookup table for a mounting orientation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedRotation`] if the orientation has no wiring table.
    pub fn for_rotation(rotation: Rotation) -> Result<Self> {
        let layout = rotation.led_layout::<N, W, H>()?;
        Ok(Self::new(&layout))
    }

    /// Strip index of the LED at logical `(row, col)`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfBounds`] if `row >= H` or `col >= W`.
    pub fn map_to_physical_index(&self, row: usize, col: usize) -> Result<usize> {
        if row >= H || col >= W {
            return Err(Error::OutOfBounds);
        }
        self.mapping_by_xy
            .get(row * W + col)
            .map(|&led_index| usize::from(led_index))
            .ok_or(Error::OutOfBounds)
    }
}
