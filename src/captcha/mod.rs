//! Captcha solving: binarize, slice into fixed cells, match each cell against templates.
//!
//! ```text
//! image bytes → preprocess (70x20, 0/255) → extract ×6 (20x10 cells)
//!             → classify (center crop to 10x8, pixel agreement) → "A1B2C3"
//! ```

pub mod matcher;
pub mod preprocess;
pub mod segment;
pub mod templates;

pub use matcher::MatchResult;
pub use preprocess::CaptchaImage;
pub use templates::{Template, TemplateLibrary};

use std::fmt;

use crate::error::CaptchaError;
use crate::logging::Logger;
use matcher::classify;
use preprocess::preprocess;
use segment::{extract, CELL_COUNT};

/// Positions scoring below this are reported as low confidence.
pub const LOW_CONFIDENCE_THRESHOLD: f64 = 50.0;

/// Per-position match results for one captcha, in position order.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptchaSolution {
    matches: Vec<MatchResult>,
}

impl CaptchaSolution {
    /// The solved captcha text.
    pub fn text(&self) -> String {
        self.matches.iter().map(|m| m.label).collect()
    }

    pub fn matches(&self) -> &[MatchResult] {
        &self.matches
    }

    /// Positions whose best match scored below [`LOW_CONFIDENCE_THRESHOLD`].
    pub fn low_confidence_positions(&self) -> Vec<usize> {
        self.matches
            .iter()
            .enumerate()
            .filter(|(_, m)| m.confidence < LOW_CONFIDENCE_THRESHOLD)
            .map(|(i, _)| i)
            .collect()
    }
}

impl fmt::Display for CaptchaSolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text())
    }
}

/// Turns a captcha image into its six-character text.
pub struct CaptchaSolver {
    library: TemplateLibrary,
    logger: Logger,
}

impl CaptchaSolver {
    pub fn new(library: TemplateLibrary, logger: Logger) -> Self {
        Self { library, logger }
    }

    /// Solves one captcha.
    ///
    /// The template set is checked before the image is touched. Any failure
    /// aborts the whole solve; low-confidence positions are only logged.
    pub fn solve(&self, image: CaptchaImage<'_>) -> Result<CaptchaSolution, CaptchaError> {
        let templates = self.library.load()?;
        let matrix = preprocess(image)?;

        let mut matches = Vec::with_capacity(CELL_COUNT);
        for position in 0..CELL_COUNT {
            let cell = extract(&matrix, position)?;
            let result = classify(&cell, templates)?;

            if result.confidence < LOW_CONFIDENCE_THRESHOLD {
                self.logger.warn(format!(
                    "Low confidence match for character at position {}: '{}' ({:.1}%)",
                    position, result.label, result.confidence
                ));
            }

            matches.push(result);
        }

        Ok(CaptchaSolution { matches })
    }
}
