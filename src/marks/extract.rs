use serde::{Deserialize, Serialize};

use crate::browser::{BrowserDriver, Locator};
use crate::config::AppConfig;
use crate::error::ExtractionError;
use crate::logging::Logger;

/// Cells expected per marks-table row.
const COLUMNS: usize = 6;

/// One subject row from the marks table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkRecord {
    pub code: String,
    pub name: String,
    pub internal: String,
    pub external: String,
    pub total: String,
    pub result: String,
}

/// Reads the marks table of the logged-in student.
///
/// With `semester`, the matching option of the semester select is chosen
/// before the table is read.
pub fn extract_marks<D: BrowserDriver>(
    driver: &mut D,
    config: &AppConfig,
    semester: Option<&str>,
    logger: &Logger,
) -> Result<Vec<MarkRecord>, ExtractionError> {
    let selectors = &config.selectors;
    driver.navigate(&config.portal.marks_url())?;

    if let Some(semester) = semester {
        logger.info(format!("Selecting semester {}", semester));
        driver.click(&selectors.semester_select)?;
        driver.click(&Locator::XPath(format!(
            "//option[text()={}]",
            xpath_literal(semester)
        )))?;
    }

    driver.wait_for_element(&selectors.marks_table, config.marks_timeout())?;
    let rows = driver.table_rows(&selectors.marks_table)?;
    let records = parse_rows(&rows)?;

    logger.info(format!("Extracted marks for {} subjects", records.len()));
    Ok(records)
}

/// Maps table rows to records, skipping the header row.
///
/// Cells beyond the sixth are ignored.
pub fn parse_rows(rows: &[Vec<String>]) -> Result<Vec<MarkRecord>, ExtractionError> {
    rows.iter()
        .enumerate()
        .skip(1)
        .map(|(index, cells)| {
            if cells.len() < COLUMNS {
                return Err(ExtractionError::Parse {
                    row: index,
                    found: cells.len(),
                    expected: COLUMNS,
                });
            }
            Ok(MarkRecord {
                code: cells[0].trim().to_string(),
                name: cells[1].trim().to_string(),
                internal: cells[2].trim().to_string(),
                external: cells[3].trim().to_string(),
                total: cells[4].trim().to_string(),
                result: cells[5].trim().to_string(),
            })
        })
        .collect()
}

/// Quotes `text` as an XPath string literal.
fn xpath_literal(text: &str) -> String {
    if !text.contains('\'') {
        format!("'{}'", text)
    } else if !text.contains('"') {
        format!("\"{}\"", text)
    } else {
        let parts: Vec<String> = text.split('\'').map(|p| format!("'{}'", p)).collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}
