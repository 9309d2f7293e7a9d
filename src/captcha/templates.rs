//! Labeled reference bitmaps used for character classification.
//!
//! Template data is stored as JSON rows of `0`/`1` characters:
//!
//! ```json
//! [{ "label": "0", "rows": ["01111110", "11111111", ...] }]
//! ```
//!
//! The seed library embedded in the binary only covers `0`; deployments point
//! `templates_path` at a fuller set.

use image::{GrayImage, Luma};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::CaptchaError;

/// Template height in pixels (rows).
pub const TEMPLATE_HEIGHT: u32 = 10;
/// Template width in pixels (columns).
pub const TEMPLATE_WIDTH: u32 = 8;
/// Labels a template may carry.
pub const ALPHABET: &str = "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

const SEED_TEMPLATES: &str = include_str!("../../resources/templates.json");

/// A labeled 10x8 binary bitmap (pixels are 0 or 255).
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    label: char,
    bitmap: GrayImage,
}

impl Template {
    /// Creates a template, validating label, shape and pixel values.
    pub fn new(label: char, bitmap: GrayImage) -> Result<Self, CaptchaError> {
        if !ALPHABET.contains(label) {
            return Err(CaptchaError::Configuration(format!(
                "template label {:?} is not in 0-9, A-Z",
                label
            )));
        }

        if bitmap.dimensions() != (TEMPLATE_WIDTH, TEMPLATE_HEIGHT) {
            return Err(CaptchaError::Configuration(format!(
                "template {:?} is {}x{}, expected {}x{}",
                label,
                bitmap.height(),
                bitmap.width(),
                TEMPLATE_HEIGHT,
                TEMPLATE_WIDTH
            )));
        }

        if bitmap.pixels().any(|p| p[0] != 0 && p[0] != 255) {
            return Err(CaptchaError::Configuration(format!(
                "template {:?} contains non-binary pixels",
                label
            )));
        }

        Ok(Self { label, bitmap })
    }

    /// Builds a template from `0`/`1` strings, one per row.
    pub fn from_rows(label: char, rows: &[&str]) -> Result<Self, CaptchaError> {
        if rows.len() != TEMPLATE_HEIGHT as usize {
            return Err(CaptchaError::Configuration(format!(
                "template {:?} has {} rows, expected {}",
                label,
                rows.len(),
                TEMPLATE_HEIGHT
            )));
        }

        let mut bitmap = GrayImage::new(TEMPLATE_WIDTH, TEMPLATE_HEIGHT);
        for (y, row) in rows.iter().enumerate() {
            if row.chars().count() != TEMPLATE_WIDTH as usize {
                return Err(CaptchaError::Configuration(format!(
                    "template {:?} row {} has {} columns, expected {}",
                    label,
                    y,
                    row.chars().count(),
                    TEMPLATE_WIDTH
                )));
            }
            for (x, c) in row.chars().enumerate() {
                let value = match c {
                    '0' => 0u8,
                    '1' => 255u8,
                    other => {
                        return Err(CaptchaError::Configuration(format!(
                            "template {:?} row {} has invalid cell {:?}",
                            label, y, other
                        )));
                    }
                };
                bitmap.put_pixel(x as u32, y as u32, Luma([value]));
            }
        }

        Self::new(label, bitmap)
    }

    pub fn label(&self) -> char {
        self.label
    }

    pub fn bitmap(&self) -> &GrayImage {
        &self.bitmap
    }
}

#[derive(Deserialize)]
struct TemplateRecord {
    label: char,
    rows: Vec<String>,
}

/// Ordered, immutable set of templates.
///
/// Order matters: classification ties go to the lower index.
#[derive(Debug, Clone, Default)]
pub struct TemplateLibrary {
    templates: Vec<Template>,
}

impl TemplateLibrary {
    pub fn new(templates: Vec<Template>) -> Self {
        Self { templates }
    }

    /// The library shipped with the binary.
    pub fn seed() -> Result<Self, CaptchaError> {
        Self::from_json(SEED_TEMPLATES)
    }

    /// Parses a JSON template list.
    pub fn from_json(json: &str) -> Result<Self, CaptchaError> {
        let records: Vec<TemplateRecord> = serde_json::from_str(json)
            .map_err(|e| CaptchaError::Configuration(format!("invalid template JSON: {}", e)))?;

        let templates = records
            .iter()
            .map(|record| {
                let rows: Vec<&str> = record.rows.iter().map(String::as_str).collect();
                Template::from_rows(record.label, &rows)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(templates))
    }

    /// Reads a JSON template list from disk.
    pub fn from_json_file(path: &Path) -> Result<Self, CaptchaError> {
        let json = fs::read_to_string(path).map_err(|e| {
            CaptchaError::Configuration(format!(
                "failed to read templates from {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&json)
    }

    /// Returns the templates in library order.
    ///
    /// Fails when the library is empty: every comparison would score 0%.
    pub fn load(&self) -> Result<&[Template], CaptchaError> {
        if self.templates.is_empty() {
            return Err(CaptchaError::Configuration(
                "no character templates defined".to_string(),
            ));
        }
        Ok(&self.templates)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_library_has_zero_template() {
        let library = TemplateLibrary::seed().unwrap();
        let templates = library.load().unwrap();

        assert_eq!(templates.len(), 1);
        assert_eq!(templates[0].label(), '0');
        assert_eq!(templates[0].bitmap().dimensions(), (TEMPLATE_WIDTH, TEMPLATE_HEIGHT));
        // Corners of the ring are background, edges are ink
        assert_eq!(templates[0].bitmap().get_pixel(0, 0)[0], 0);
        assert_eq!(templates[0].bitmap().get_pixel(1, 0)[0], 255);
        assert_eq!(templates[0].bitmap().get_pixel(3, 4)[0], 0);
    }

    #[test]
    fn test_empty_library_fails_to_load() {
        let library = TemplateLibrary::default();
        assert!(library.is_empty());
        assert!(matches!(library.load(), Err(CaptchaError::Configuration(_))));
    }

    #[test]
    fn test_rejects_label_outside_alphabet() {
        let bitmap = GrayImage::new(TEMPLATE_WIDTH, TEMPLATE_HEIGHT);
        assert!(Template::new('a', bitmap.clone()).is_err());
        assert!(Template::new('#', bitmap).is_err());
    }

    #[test]
    fn test_rejects_wrong_shape() {
        let bitmap = GrayImage::new(10, 20);
        let err = Template::new('A', bitmap).unwrap_err();
        assert!(err.to_string().contains("expected 10x8"));
    }

    #[test]
    fn test_rejects_grey_pixels() {
        let mut bitmap = GrayImage::new(TEMPLATE_WIDTH, TEMPLATE_HEIGHT);
        bitmap.put_pixel(2, 2, Luma([128]));
        assert!(Template::new('A', bitmap).is_err());
    }

    #[test]
    fn test_from_rows_rejects_ragged_rows() {
        let mut rows = vec!["00000000"; 10];
        rows[4] = "0000000";
        assert!(Template::from_rows('1', &rows).is_err());
        assert!(Template::from_rows('1', &rows[..9]).is_err());
    }

    #[test]
    fn test_from_json_preserves_order() {
        let json = r#"[
            {"label": "B", "rows": ["00000000","00000000","00000000","00000000","00000000",
                                     "00000000","00000000","00000000","00000000","00000000"]},
            {"label": "7", "rows": ["11111111","11111111","11111111","11111111","11111111",
                                     "11111111","11111111","11111111","11111111","11111111"]}
        ]"#;
        let library = TemplateLibrary::from_json(json).unwrap();
        let labels: Vec<char> = library.load().unwrap().iter().map(Template::label).collect();
        assert_eq!(labels, vec!['B', '7']);
        assert_eq!(library.load().unwrap()[1].bitmap().get_pixel(7, 9)[0], 255);
    }

    #[test]
    fn test_from_json_file_missing_is_configuration_error() {
        let err = TemplateLibrary::from_json_file(Path::new("/nonexistent/templates.json")).unwrap_err();
        assert!(err.is_fatal());
    }
}
