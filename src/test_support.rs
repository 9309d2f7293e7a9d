//! Fixtures shared by unit tests: glyph templates, synthetic captchas and a
//! scripted browser driver.

use image::{DynamicImage, GrayImage, ImageFormat};
use std::collections::{HashMap, VecDeque};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::browser::{BrowserDriver, Locator};
use crate::captcha::preprocess::{MATRIX_HEIGHT, MATRIX_WIDTH};
use crate::captcha::segment::CELL_WIDTH;
use crate::captcha::Template;
use crate::error::DriverError;

/// Six distinct 10x8 glyphs labeled A, 1, B, 2, C, 3.
pub fn glyph_templates() -> Vec<Template> {
    let glyphs: [(char, [&str; 10]); 6] = [
        ('A', [
            "00011000", "00111100", "01100110", "11000011", "11000011",
            "11111111", "11111111", "11000011", "11000011", "11000011",
        ]),
        ('1', [
            "00011000", "00111000", "01111000", "00011000", "00011000",
            "00011000", "00011000", "00011000", "01111110", "01111110",
        ]),
        ('B', [
            "11111100", "11000110", "11000011", "11000110", "11111100",
            "11111100", "11000110", "11000011", "11000110", "11111100",
        ]),
        ('2', [
            "00111100", "01100110", "11000011", "00000011", "00000110",
            "00001100", "00110000", "01100000", "11111111", "11111111",
        ]),
        ('C', [
            "00111110", "01100011", "11000000", "11000000", "11000000",
            "11000000", "11000000", "11000000", "01100011", "00111110",
        ]),
        ('3', [
            "01111100", "11000110", "00000011", "00000110", "00111100",
            "00111100", "00000110", "00000011", "11000110", "01111100",
        ]),
    ];

    glyphs
        .iter()
        .map(|(label, rows)| Template::from_rows(*label, rows).unwrap())
        .collect()
}

/// A 70x20 PNG with each character's template drawn in the center of its cell.
pub fn captcha_png(templates: &[Template], text: &str) -> Vec<u8> {
    let mut canvas = GrayImage::new(MATRIX_WIDTH, MATRIX_HEIGHT);

    for (position, label) in text.chars().enumerate() {
        let template = templates
            .iter()
            .find(|t| t.label() == label)
            .unwrap_or_else(|| panic!("no template for {:?}", label));
        let x = position as u32 * CELL_WIDTH + 1;
        image::imageops::replace(&mut canvas, template.bitmap(), x as i64, 5);
    }

    let mut bytes = Vec::new();
    DynamicImage::ImageLuma8(canvas)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

/// What the driver does when asked for the captcha screenshot.
#[derive(Debug, Clone)]
pub enum CaptureScript {
    Write(Vec<u8>),
    Fail,
}

/// In-memory [`BrowserDriver`] following a per-call script.
///
/// Waits consult `waits[locator]` in order (`false` times out); once a queue
/// is empty, the element is present.
#[derive(Default)]
pub struct ScriptedDriver {
    pub default_capture: Vec<u8>,
    pub captures: VecDeque<CaptureScript>,
    pub waits: HashMap<Locator, VecDeque<bool>>,
    pub rows: Vec<Vec<String>>,
    pub navigations: Vec<String>,
    pub clicks: Vec<Locator>,
    pub filled: Vec<(Locator, String)>,
    pub captured_paths: Vec<PathBuf>,
    /// Captures still on disk when a later navigation started
    pub stale_captures: Vec<PathBuf>,
    /// Upcoming navigations that fail with a protocol error
    pub failing_navigations: usize,
    /// Upcoming form fills that fail with a missing element
    pub failing_fills: usize,
}

impl ScriptedDriver {
    pub fn new(default_capture: Vec<u8>) -> Self {
        Self {
            default_capture,
            ..Self::default()
        }
    }

    /// Scripts the outcomes of successive waits for `locator`.
    pub fn script_waits(mut self, locator: Locator, outcomes: &[bool]) -> Self {
        self.waits.insert(locator, outcomes.iter().copied().collect());
        self
    }

    pub fn script_captures(mut self, captures: Vec<CaptureScript>) -> Self {
        self.captures = captures.into();
        self
    }

    pub fn fail_navigations(mut self, count: usize) -> Self {
        self.failing_navigations = count;
        self
    }

    pub fn fail_fills(mut self, count: usize) -> Self {
        self.failing_fills = count;
        self
    }
}

impl BrowserDriver for ScriptedDriver {
    fn navigate(&mut self, url: &str) -> Result<(), DriverError> {
        let stale: Vec<PathBuf> = self
            .captured_paths
            .iter()
            .filter(|p| p.exists())
            .cloned()
            .collect();
        self.stale_captures.extend(stale);
        self.navigations.push(url.to_string());

        if self.failing_navigations > 0 {
            self.failing_navigations -= 1;
            return Err(DriverError::Protocol {
                error: "unknown error".to_string(),
                message: "net::ERR_CONNECTION_RESET".to_string(),
            });
        }
        Ok(())
    }

    fn wait_for_element(&mut self, locator: &Locator, timeout: Duration) -> Result<(), DriverError> {
        let present = self
            .waits
            .get_mut(locator)
            .and_then(VecDeque::pop_front)
            .unwrap_or(true);
        if present {
            Ok(())
        } else {
            Err(DriverError::Timeout {
                locator: locator.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            })
        }
    }

    fn screenshot_element(&mut self, locator: &Locator, path: &Path) -> Result<(), DriverError> {
        self.captured_paths.push(path.to_path_buf());
        match self.captures.pop_front() {
            Some(CaptureScript::Fail) => Err(DriverError::NoSuchElement(locator.to_string())),
            Some(CaptureScript::Write(bytes)) => Ok(std::fs::write(path, bytes)?),
            None => Ok(std::fs::write(path, &self.default_capture)?),
        }
    }

    fn fill_field(&mut self, locator: &Locator, text: &str) -> Result<(), DriverError> {
        if self.failing_fills > 0 {
            self.failing_fills -= 1;
            return Err(DriverError::NoSuchElement(locator.to_string()));
        }
        self.filled.push((locator.clone(), text.to_string()));
        Ok(())
    }

    fn click(&mut self, locator: &Locator) -> Result<(), DriverError> {
        self.clicks.push(locator.clone());
        Ok(())
    }

    fn table_rows(&mut self, _table: &Locator) -> Result<Vec<Vec<String>>, DriverError> {
        Ok(self.rows.clone())
    }
}

/// Number of entries in a directory.
pub fn dir_entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}
