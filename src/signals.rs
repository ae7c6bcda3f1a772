use tracing::debug;

use crate::config::LayoutKind;
use crate::grid::{cell_at, Cell, Sheet};
use crate::layout::{
    resolve_fixed_offset, resolve_sections, FixedOffsetCoords, SectionCoords, SectionResolution,
    INDEX_COL,
};
use crate::models::{SheetPeriod, SignalTuple};
use crate::normalize::{map_vertical, parse_tenure};

const VERTICAL_COL: usize = 2;
const NAME_COL: usize = 3;
const CODE_COL: usize = 4;
const HIRE_DATE_COL: usize = 5;
const TENURE_COL: usize = 6;
/// Fixed-offset sheets keep the underperforming marker and note at fixed
/// positions after the weekly groups.
const FIXED_MARKER_COL: usize = 22;
const FIXED_NOTE_COL: usize = 23;
const FIXED_MIN_WIDTH: usize = 7;

#[derive(Debug, Clone, Default)]
pub struct SheetScan {
    pub tuples: Vec<SignalTuple>,
    /// Sheet or section labels skipped because a required column was missing.
    pub skipped: Vec<String>,
}

pub fn scan_sheet(sheet: &Sheet, layout: LayoutKind, period: &SheetPeriod) -> SheetScan {
    match layout {
        LayoutKind::FixedOffset => match resolve_fixed_offset(sheet, period) {
            Some(coords) => SheetScan {
                tuples: scan_fixed_offset(sheet, &coords),
                skipped: Vec::new(),
            },
            None => SheetScan {
                tuples: Vec::new(),
                skipped: vec![sheet.name.clone()],
            },
        },
        LayoutKind::SectionRelative => {
            let mut scan = SheetScan::default();
            for resolution in resolve_sections(sheet, period) {
                match resolution {
                    SectionResolution::Located(coords) => {
                        scan.tuples.extend(scan_section(sheet, &coords));
                    }
                    SectionResolution::Unlocatable {
                        header_row,
                        label,
                        missing,
                    } => {
                        debug!(sheet = %sheet.name, section = %label, header_row, missing, "section skipped");
                        scan.skipped.push(format!("{} / {}", sheet.name, label));
                    }
                }
            }
            scan
        }
    }
}

struct AgentFields {
    name: String,
    code: String,
    vertical: String,
}

/// Name and short code are both required for a row to count as an agent.
fn agent_fields(row: &[Cell]) -> Option<AgentFields> {
    let name = cell_at(row, NAME_COL).text().to_string();
    let code = cell_at(row, CODE_COL).text().to_string();
    if name.is_empty() || code.is_empty() {
        return None;
    }
    Some(AgentFields {
        name,
        code,
        vertical: cell_at(row, VERTICAL_COL).text().to_string(),
    })
}

fn tuple_for(layout: LayoutKind, row: &[Cell], agent: AgentFields) -> SignalTuple {
    let (service, channel) = map_vertical(&agent.vertical);
    SignalTuple {
        layout,
        agent_name: agent.name,
        agent_code: agent.code,
        vertical: agent.vertical,
        service,
        channel,
        hire_date: cell_at(row, HIRE_DATE_COL).as_date(),
        tenure_months: parse_tenure(cell_at(row, TENURE_COL).text()),
        attitude_error: None,
        ops_error: None,
        qa_flagged: None,
        eval_flagged: false,
        underperforming: true,
        underperformance_type: None,
        note: None,
    }
}

/// Weekly evaluation count above zero, or a literal "Y".
fn eval_flag(cell: &Cell) -> bool {
    match cell.as_f64() {
        Some(value) => value > 0.0,
        None => cell.is_yes(),
    }
}

pub fn scan_fixed_offset(sheet: &Sheet, coords: &FixedOffsetCoords) -> Vec<SignalTuple> {
    let mut tuples = Vec::new();
    for row_index in coords.data_start..sheet.height() {
        let row = sheet.row(row_index);
        if row.len() < FIXED_MIN_WIDTH || cell_at(row, INDEX_COL).as_index().is_none() {
            continue;
        }
        let Some(agent) = agent_fields(row) else {
            continue;
        };
        if !cell_at(row, FIXED_MARKER_COL).is_yes() {
            continue;
        }

        let mut tuple = tuple_for(LayoutKind::FixedOffset, row, agent);
        tuple.attitude_error = cell_at(row, coords.attitude_col).yes_no();
        tuple.ops_error = cell_at(row, coords.ops_col).yes_no();
        tuple.qa_flagged = Some(cell_at(row, coords.qa_col).is_yes());
        tuple.eval_flagged = eval_flag(cell_at(row, coords.eval_week_col));
        tuple.note = cell_at(row, FIXED_NOTE_COL).non_empty_text();
        tuples.push(tuple);
    }
    tuples
}

pub fn scan_section(sheet: &Sheet, coords: &SectionCoords) -> Vec<SignalTuple> {
    let mut tuples = Vec::new();
    for row_index in coords.data_rows.clone() {
        let row = sheet.row(row_index);
        if cell_at(row, INDEX_COL).as_index().is_none() {
            continue;
        }
        let Some(agent) = agent_fields(row) else {
            continue;
        };
        if !cell_at(row, coords.flag_col).is_yes() {
            continue;
        }

        let mut tuple = tuple_for(LayoutKind::SectionRelative, row, agent);
        tuple.attitude_error = cell_at(row, coords.period_col + 1).is_positive_count();
        tuple.ops_error = cell_at(row, coords.period_col + 2).is_positive_count();
        let flag_reason = coords
            .flag_reason_col
            .and_then(|col| cell_at(row, col).non_empty_text());
        tuple.underperformance_type = flag_reason.clone();
        tuple.note = flag_reason;
        tuples.push(tuple);
    }
    debug!(
        sheet = %sheet.name,
        section = %coords.label,
        header_row = coords.header_row,
        flagged = tuples.len(),
        "section scanned"
    );
    tuples
}
