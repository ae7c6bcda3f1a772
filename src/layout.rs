use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::grid::{Cell, Sheet};
use crate::models::SheetPeriod;

/// Index column shared by both layouts; agent rows hold 1, 2, 3, ... here.
pub const INDEX_COL: usize = 1;

pub const WEEK_HEADER_ROW: usize = 2;
const WEEK_UNIT: &str = "주차";

pub const SECTION_GLOBAL_HEADER_ROW: usize = 5;
pub const SECTION_GLOBAL_SUBHEADER_ROW: usize = 6;
const SECTION_LABEL_COL: usize = 2;
const SECTION_DATA_OFFSET: usize = 3;
pub const FLAG_HEADER: &str = "저품질 상담사";
pub const FLAG_REASON_HEADER: &str = "저품질 유형";

static SECTION_ORDINAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+\.").expect("section ordinal pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pick {
    First,
    Last,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Needle {
    /// Plain substring of the header text.
    Text(String),
    /// "{month}월 {week}주" where the month is not the tail of a longer
    /// number, so January never matches "11월".
    Period { month: u32, week: u32 },
}

enum CellMatcher<'a> {
    Text(&'a str),
    Period(Regex),
}

impl CellMatcher<'_> {
    fn is_match(&self, cell: &Cell) -> bool {
        match self {
            CellMatcher::Text(text) => cell.contains(text),
            CellMatcher::Period(pattern) => pattern.is_match(cell.text()),
        }
    }
}

impl Needle {
    fn matcher(&self) -> Option<CellMatcher<'_>> {
        match self {
            Needle::Text(text) => Some(CellMatcher::Text(text)),
            Needle::Period { month, week } => {
                let pattern = Regex::new(&format!(r"(?:^|\D){month}월\s*{week}주")).ok()?;
                Some(CellMatcher::Period(pattern))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderRule {
    pub row: usize,
    pub needle: Needle,
    pub pick: Pick,
}

impl HeaderRule {
    fn locate(&self, sheet: &Sheet) -> Option<usize> {
        let matcher = self.needle.matcher()?;
        let mut hits = sheet
            .row(self.row)
            .iter()
            .enumerate()
            .filter(|(_, cell)| matcher.is_match(cell))
            .map(|(col, _)| col);
        match self.pick {
            Pick::First => hits.next(),
            Pick::Last => hits.last(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnSearch {
    rules: Vec<HeaderRule>,
}

impl ColumnSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_row(mut self, row: usize, needle: Needle, pick: Pick) -> Self {
        self.rules.push(HeaderRule { row, needle, pick });
        self
    }

    pub fn resolve(&self, sheet: &Sheet) -> Option<usize> {
        self.rules.iter().find_map(|rule| rule.locate(sheet))
    }
}

fn text(needle: &str) -> Needle {
    Needle::Text(needle.to_string())
}

fn period_needle(period: &SheetPeriod) -> Needle {
    Needle::Period {
        month: period.month,
        week: period.week,
    }
}

/// Week group of a fixed-offset sheet: QA, attitude, operations, then the
/// weekly and monthly evaluation buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedOffsetCoords {
    pub qa_col: usize,
    pub attitude_col: usize,
    pub ops_col: usize,
    pub eval_week_col: usize,
    pub data_start: usize,
}

pub fn fixed_offset_search(period: &SheetPeriod) -> ColumnSearch {
    ColumnSearch::new()
        .try_row(WEEK_HEADER_ROW, period_needle(period), Pick::First)
        .try_row(WEEK_HEADER_ROW, text(WEEK_UNIT), Pick::Last)
}

/// `None` when the week group or the first agent row cannot be found.
pub fn resolve_fixed_offset(sheet: &Sheet, period: &SheetPeriod) -> Option<FixedOffsetCoords> {
    let base = fixed_offset_search(period).resolve(sheet)?;
    let data_start = first_agent_row(sheet)?;
    Some(FixedOffsetCoords {
        qa_col: base,
        attitude_col: base + 1,
        ops_col: base + 2,
        eval_week_col: base + 3,
        data_start,
    })
}

fn first_agent_row(sheet: &Sheet) -> Option<usize> {
    (0..sheet.height()).find(|&row| sheet.cell(row, INDEX_COL).as_index() == Some(1))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionCoords {
    pub header_row: usize,
    pub label: String,
    pub period_col: usize,
    pub flag_col: usize,
    pub flag_reason_col: Option<usize>,
    pub data_rows: Range<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionResolution {
    Located(SectionCoords),
    Unlocatable {
        header_row: usize,
        label: String,
        missing: &'static str,
    },
}

/// Rules for one section: its own sub-header row first, then the sheet-wide
/// header rows.
fn section_search(sub_header_row: usize, needle: Needle) -> ColumnSearch {
    ColumnSearch::new()
        .try_row(sub_header_row, needle.clone(), Pick::First)
        .try_row(SECTION_GLOBAL_HEADER_ROW, needle.clone(), Pick::First)
        .try_row(SECTION_GLOBAL_SUBHEADER_ROW, needle, Pick::First)
}

pub fn section_header_rows(sheet: &Sheet) -> Vec<usize> {
    (0..sheet.height())
        .filter(|&row| SECTION_ORDINAL.is_match(sheet.cell(row, SECTION_LABEL_COL).text()))
        .collect()
}

/// Resolve every stacked section independently.
pub fn resolve_sections(sheet: &Sheet, period: &SheetPeriod) -> Vec<SectionResolution> {
    let headers = section_header_rows(sheet);
    let needle = period_needle(period);
    let flag = text(FLAG_HEADER);
    let flag_reason = text(FLAG_REASON_HEADER);

    headers
        .iter()
        .enumerate()
        .map(|(i, &header_row)| {
            let label = sheet.cell(header_row, SECTION_LABEL_COL).text().to_string();
            let sub_header_row = header_row + 1;

            let Some(period_col) = section_search(sub_header_row, needle.clone()).resolve(sheet) else {
                return SectionResolution::Unlocatable {
                    header_row,
                    label,
                    missing: "period",
                };
            };
            let Some(flag_col) = section_search(sub_header_row, flag.clone()).resolve(sheet) else {
                return SectionResolution::Unlocatable {
                    header_row,
                    label,
                    missing: "flag",
                };
            };
            let flag_reason_col = section_search(sub_header_row, flag_reason.clone()).resolve(sheet);

            let end = headers.get(i + 1).copied().unwrap_or(sheet.height());
            let start = (header_row + SECTION_DATA_OFFSET).min(end);

            SectionResolution::Located(SectionCoords {
                header_row,
                label,
                period_col,
                flag_col,
                flag_reason_col,
                data_rows: start..end,
            })
        })
        .collect()
}
