//! Nearest-template classification by pixel agreement.

use image::GrayImage;

use super::segment::{fit_to, CharacterCell};
use super::templates::Template;
use crate::error::CaptchaError;

/// Best template for one cell.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub label: char,
    /// Percentage of equal pixels, 0.0..=100.0
    pub confidence: f64,
}

/// Percentage of positions where `cell` and `template` hold the same value.
///
/// Both images must have identical dimensions.
pub fn score(cell: &GrayImage, template: &GrayImage) -> Result<f64, CaptchaError> {
    if cell.dimensions() != template.dimensions() {
        return Err(CaptchaError::ShapeMismatch {
            cell_height: cell.height(),
            cell_width: cell.width(),
            template_height: template.height(),
            template_width: template.width(),
        });
    }

    let total = (cell.width() * cell.height()) as usize;
    if total == 0 {
        return Ok(0.0);
    }

    let matching = cell
        .pixels()
        .zip(template.pixels())
        .filter(|(a, b)| a[0] == b[0])
        .count();

    Ok(matching as f64 / total as f64 * 100.0)
}

/// Scores the cell against every template in library order.
///
/// The cell is center-cropped to the template shape first. A later template
/// replaces the running best only when strictly better, so ties go to the
/// lower library index. Low scores still return a label; judging them is the
/// caller's job.
pub fn classify(cell: &CharacterCell, templates: &[Template]) -> Result<MatchResult, CaptchaError> {
    let mut best: Option<MatchResult> = None;

    for template in templates {
        let bitmap = template.bitmap();
        let fitted = fit_to(&cell.image, bitmap.width(), bitmap.height())?;
        let confidence = score(&fitted, bitmap)?;

        let better = match &best {
            Some(current) => confidence > current.confidence,
            None => true,
        };
        if better {
            best = Some(MatchResult {
                label: template.label(),
                confidence,
            });
        }
    }

    best.ok_or_else(|| CaptchaError::Configuration("no character templates defined".to_string()))
}
