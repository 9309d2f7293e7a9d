use image::GrayImage;
use image::imageops;

use crate::error::CaptchaError;

/// Number of characters in every captcha.
pub const CELL_COUNT: usize = 6;
/// Column pitch of one character cell.
pub const CELL_WIDTH: u32 = 10;

/// One fixed-width column slice of the normalized matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct CharacterCell {
    pub position: usize,
    pub image: GrayImage,
}

/// Slices columns `[position*10, position*10 + 10)` over the full matrix height.
///
/// Only positions `0..CELL_COUNT` are valid. A 70-wide matrix would fit a
/// seventh cell; it is never read.
pub fn extract(matrix: &GrayImage, position: usize) -> Result<CharacterCell, CaptchaError> {
    let window = u32::try_from(position)
        .ok()
        .and_then(|p| p.checked_mul(CELL_WIDTH))
        .and_then(|start| start.checked_add(CELL_WIDTH).map(|end| (start, end)));

    let start = match window {
        Some((start, end)) if position < CELL_COUNT && end <= matrix.width() => start,
        // Out-of-range windows are reported saturated
        _ => {
            let start = window.map_or(u32::MAX, |(start, _)| start);
            return Err(CaptchaError::Segmentation {
                position,
                start,
                end: start.saturating_add(CELL_WIDTH),
                width: matrix.width(),
            });
        }
    };

    let image = imageops::crop_imm(matrix, start, 0, CELL_WIDTH, matrix.height()).to_image();
    Ok(CharacterCell { position, image })
}

/// Center-crops a cell to `width` x `height` so it can be scored against a template.
///
/// A 20x10 cell against a 10x8 template keeps rows 5..15 and columns 1..9.
pub fn fit_to(cell: &GrayImage, width: u32, height: u32) -> Result<GrayImage, CaptchaError> {
    let (cell_width, cell_height) = cell.dimensions();
    if cell_width < width || cell_height < height {
        return Err(CaptchaError::ShapeMismatch {
            cell_height,
            cell_width,
            template_height: height,
            template_width: width,
        });
    }

    let left = (cell_width - width) / 2;
    let top = (cell_height - height) / 2;
    Ok(imageops::crop_imm(cell, left, top, width, height).to_image())
}
