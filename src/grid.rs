use std::path::Path;

use crate::error::SourceError;
use crate::normalize::{nfc, parse_date, parse_float};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Empty,
    Text(String),
}

static EMPTY_CELL: Cell = Cell::Empty;

impl Cell {
    pub fn from_raw(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(trimmed.to_string())
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    pub fn text(&self) -> &str {
        match self {
            Cell::Empty => "",
            Cell::Text(text) => text,
        }
    }

    pub fn contains(&self, needle: &str) -> bool {
        !self.is_empty() && self.text().contains(needle)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Empty => None,
            Cell::Text(text) => parse_float(text),
        }
    }

    /// Whole-number read used for index columns: "1" or "1.0", never "1.5" or "NO".
    pub fn as_index(&self) -> Option<i64> {
        match self {
            Cell::Empty => None,
            Cell::Text(text) => text.parse::<i64>().ok().or_else(|| {
                text.parse::<f64>()
                    .ok()
                    .filter(|value| value.is_finite() && value.fract() == 0.0)
                    .map(|value| value as i64)
            }),
        }
    }

    pub fn as_date(&self) -> Option<chrono::NaiveDate> {
        match self {
            Cell::Empty => None,
            Cell::Text(text) => parse_date(text),
        }
    }

    /// "Y"/"N" marker, case-insensitive; anything else is absent.
    pub fn yes_no(&self) -> Option<bool> {
        match self.text().to_uppercase().as_str() {
            "Y" => Some(true),
            "N" => Some(false),
            _ => None,
        }
    }

    pub fn is_yes(&self) -> bool {
        self.yes_no() == Some(true)
    }

    /// Count-style cells: positive after truncation.
    pub fn is_positive_count(&self) -> Option<bool> {
        self.as_f64().map(|value| value.trunc() > 0.0)
    }

    pub fn non_empty_text(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(text) => Some(text.clone()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Sheet {
    pub name: String,
    rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn row(&self, index: usize) -> &[Cell] {
        self.rows.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        cell_at(self.row(row), col)
    }
}

pub fn cell_at(row: &[Cell], col: usize) -> &Cell {
    row.get(col).unwrap_or(&EMPTY_CELL)
}

#[derive(Debug, Clone)]
pub struct Workbook {
    pub name: String,
    pub sheets: Vec<Sheet>,
}

/// Loads one workbook; the returned value owns every cell it needs.
pub trait TabularSource {
    fn load(&self, path: &Path) -> Result<Workbook, SourceError>;
}

/// A workbook exported as a directory of headerless CSV files, one per sheet.
///
/// The csv reader drops fully blank lines, so empty sheet rows must be
/// exported as delimiter-only lines (`,,,`) to keep row indices intact.
#[derive(Debug, Default, Clone, Copy)]
pub struct CsvWorkbookSource;

impl TabularSource for CsvWorkbookSource {
    fn load(&self, path: &Path) -> Result<Workbook, SourceError> {
        if !path.is_dir() {
            return Err(SourceError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let entries = std::fs::read_dir(path).map_err(|source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut sheet_paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| SourceError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            let sheet_path = entry.path();
            let is_csv = sheet_path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
            if is_csv && sheet_path.is_file() {
                sheet_paths.push(sheet_path);
            }
        }
        sheet_paths.sort();

        if sheet_paths.is_empty() {
            return Err(SourceError::EmptyWorkbook {
                path: path.to_path_buf(),
            });
        }

        let mut sheets = Vec::with_capacity(sheet_paths.len());
        for sheet_path in sheet_paths {
            let name = sheet_path
                .file_stem()
                .map(|stem| nfc(&stem.to_string_lossy()))
                .unwrap_or_default();
            let rows = read_csv_grid(&sheet_path)?;
            sheets.push(Sheet::new(name, rows));
        }

        let name = path
            .file_name()
            .map(|n| nfc(&n.to_string_lossy()))
            .unwrap_or_default();
        Ok(Workbook { name, sheets })
    }
}

fn read_csv_grid(path: &Path) -> Result<Vec<Vec<Cell>>, SourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|source| SourceError::Csv {
            path: path.to_path_buf(),
            source,
        })?;

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|source| SourceError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        rows.push(record.iter().map(Cell::from_raw).collect());
    }
    Ok(rows)
}

#[cfg(test)]
pub(crate) fn grid(rows: &[&[&str]]) -> Vec<Vec<Cell>> {
    rows.iter()
        .map(|row| row.iter().map(|raw| Cell::from_raw(raw)).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coercions_follow_cell_content() {
        assert_eq!(Cell::from_raw("  "), Cell::Empty);
        assert_eq!(Cell::from_raw(" 1 ").as_index(), Some(1));
        assert_eq!(Cell::from_raw("1.5").as_index(), None);
        assert_eq!(Cell::from_raw("1.0").as_index(), Some(1));
        assert_eq!(Cell::from_raw("NaN").as_index(), None);
        assert_eq!(Cell::from_raw("NO").as_index(), None);
        assert_eq!(Cell::from_raw("12%").as_f64(), Some(12.0));
        assert!(Cell::from_raw("10월 2주차").contains("2주차"));
        assert!(!Cell::Empty.contains(""));
    }

    #[test]
    fn yes_no_markers() {
        assert_eq!(Cell::from_raw("y").yes_no(), Some(true));
        assert_eq!(Cell::from_raw("N").yes_no(), Some(false));
        assert_eq!(Cell::from_raw("-").yes_no(), None);
        assert!(!Cell::Empty.is_yes());
    }

    #[test]
    fn positive_counts_truncate() {
        assert_eq!(Cell::from_raw("2").is_positive_count(), Some(true));
        assert_eq!(Cell::from_raw("0.5").is_positive_count(), Some(false));
        assert_eq!(Cell::from_raw("0").is_positive_count(), Some(false));
        assert_eq!(Cell::from_raw("x").is_positive_count(), None);
    }

    #[test]
    fn out_of_range_cells_are_empty() {
        let sheet = Sheet::new("s", grid(&[&["a"]]));
        assert!(sheet.cell(0, 5).is_empty());
        assert!(sheet.cell(9, 0).is_empty());
        assert!(sheet.row(9).is_empty());
    }

    #[test]
    fn loads_csv_directory_as_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let workbook_dir = dir.path().join("용산 부진상담사 10월 2주차");
        std::fs::create_dir(&workbook_dir).unwrap();
        std::fs::write(workbook_dir.join("요약.csv"), "a,b\n").unwrap();
        std::fs::write(workbook_dir.join("10월 2주차.csv"), "x,,y\n1,2\n").unwrap();
        std::fs::write(workbook_dir.join("notes.txt"), "ignored").unwrap();

        let workbook = CsvWorkbookSource.load(&workbook_dir).unwrap();
        assert_eq!(workbook.name, "용산 부진상담사 10월 2주차");
        assert_eq!(workbook.sheets.len(), 2);
        let sheet = &workbook.sheets[0];
        assert_eq!(sheet.name, "10월 2주차");
        assert_eq!(sheet.height(), 2);
        assert!(sheet.cell(0, 1).is_empty());
        assert_eq!(sheet.cell(0, 2).text(), "y");
    }

    #[test]
    fn missing_or_empty_workbooks_fail() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        assert!(matches!(
            CsvWorkbookSource.load(&missing),
            Err(SourceError::NotFound { .. })
        ));

        let empty = dir.path().join("empty");
        std::fs::create_dir(&empty).unwrap();
        assert!(matches!(
            CsvWorkbookSource.load(&empty),
            Err(SourceError::EmptyWorkbook { .. })
        ));
    }

    #[test]
    fn delimiter_only_lines_keep_row_positions() {
        let dir = tempfile::tempdir().unwrap();
        let workbook_dir = dir.path().join("광주 집중관리 10월 4주차");
        std::fs::create_dir(&workbook_dir).unwrap();
        std::fs::write(workbook_dir.join("10월 2주차.csv"), ",,\n\n,,\nNO,,\n").unwrap();

        let workbook = CsvWorkbookSource.load(&workbook_dir).unwrap();
        let sheet = &workbook.sheets[0];
        assert_eq!(sheet.height(), 3);
        assert_eq!(sheet.cell(2, 0).text(), "NO");
    }
}
