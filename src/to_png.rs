//! Host-side PNG preview of composited frames.
//!
//! Each display cell becomes a round "LED" on a black board. Lit cells keep their color;
//! transparent cells (dark on the real panel) are drawn as a faint unlit LED so the grid
//! stays readable.

use std::error::Error;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use png::{BitDepth, ColorType, Encoder};

use crate::led_strip::Rgb;
use crate::led2d::Frame2d;

/// Color of an LED whose cell is transparent.
pub const UNLIT_LED: Rgb = Rgb::new(24, 24, 24);

/// Size in pixels of the preview [`write_frame_png`] produces for a `W`×`H` frame.
///
/// Cells are square and as large as fit in `max_dimension`, with a half-cell border.
///
/// # Errors
///
/// Fails if `max_dimension` is too small for a 2-pixel cell.
pub fn preview_size<const W: usize, const H: usize>(
    max_dimension: u32,
) -> Result<(u32, u32, u32), Box<dyn Error>> {
    let cell_size = cell_size::<W, H>(max_dimension)?;
    let (cols, rows) = (u32::try_from(W)?, u32::try_from(H)?);
    Ok((cell_size, (cols + 1) * cell_size, (rows + 1) * cell_size))
}

fn cell_size<const W: usize, const H: usize>(max_dimension: u32) -> Result<u32, Box<dyn Error>> {
    // one extra cell for the border on both sides
    let cells = u32::try_from(W.max(H))? + 1;
    let cell_size = max_dimension / cells;
    if cell_size < 2 {
        return Err(format!("{max_dimension}px is too small for a {W}x{H} preview").into());
    }
    Ok(cell_size)
}

/// Render `frame` to an 8-bit RGB PNG no larger than `max_dimension` on either side.
///
/// # Errors
///
/// Fails if `max_dimension` is too small or the file cannot be written.
pub fn write_frame_png<const W: usize, const H: usize>(
    frame: &Frame2d<W, H>,
    output_path: impl AsRef<Path>,
    max_dimension: u32,
) -> Result<(), Box<dyn Error>> {
    let output_path = output_path.as_ref();
    let (cell_size, width, height) = preview_size::<W, H>(max_dimension)?;
    let pixels = render(frame, cell_size, width, height)?;

    if let Some(parent) = output_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(output_path)?;
    let mut encoder = Encoder::new(BufWriter::new(file), width, height);
    encoder.set_color(ColorType::Rgb);
    encoder.set_depth(BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(&pixels)?;
    writer.finish()?;
    log::info!("wrote {}x{} preview to {}", width, height, output_path.display());
    Ok(())
}

#[allow(
    clippy::cast_precision_loss,
    reason = "cell sizes are a few hundred pixels at most"
)]
fn render<const W: usize, const H: usize>(
    frame: &Frame2d<W, H>,
    cell_size: u32,
    width: u32,
    height: u32,
) -> Result<Vec<u8>, Box<dyn Error>> {
    let stride = usize::try_from(width)? * 3;
    let mut bytes = vec![0_u8; stride * usize::try_from(height)?];
    let cell = usize::try_from(cell_size)?;
    let border = cell / 2;
    // LED diameter is 3/4 of the cell, centered
    let radius = cell as f32 * 3.0 / 8.0;
    let center = (cell as f32 - 1.0) / 2.0;

    for (row_index, row) in frame.iter().enumerate() {
        for (col_index, pixel) in row.iter().enumerate() {
            let color = pixel.unwrap_or(UNLIT_LED);
            let origin_x = border + col_index * cell;
            let origin_y = border + row_index * cell;
            for local_y in 0..cell {
                for local_x in 0..cell {
                    let dx = local_x as f32 - center;
                    let dy = local_y as f32 - center;
                    if dx * dx + dy * dy > radius * radius {
                        continue;
                    }
                    let offset = (origin_y + local_y) * stride + (origin_x + local_x) * 3;
                    if let Some(target) = bytes.get_mut(offset..offset + 3) {
                        target.copy_from_slice(&[color.r, color.g, color.b]);
                    }
                }
            }
        }
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_fits_the_requested_size() {
        let (cell, width, height) = preview_size::<32, 8>(660).unwrap();
        assert_eq!(cell, 20);
        assert_eq!((width, height), (660, 180));
        assert!(preview_size::<32, 8>(40).is_err());
    }
}
