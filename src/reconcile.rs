use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::UnderperformanceRecord;

static MONTH_WEEK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,2})월\s*(\d)주차").expect("month-week pattern"));
static MONTH_ONLY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{1,2})월").expect("month pattern"));

/// (month, week-of-month) encoded in a workbook name. A name carrying only a
/// month ranks below every week of that month.
pub fn file_period(name: &str) -> Option<(u32, u32)> {
    if let Some(caps) = MONTH_WEEK.captures(name) {
        let month = caps[1].parse().ok()?;
        let week = caps[2].parse().ok()?;
        return Some((month, week));
    }
    let caps = MONTH_ONLY.captures(name)?;
    Some((caps[1].parse().ok()?, 0))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub month: u32,
    pub week: u32,
    pub file_name: String,
    pub path: PathBuf,
}

/// One file per month: the one with the latest week. Ties go to whichever
/// candidate comes later in scan order. Output is month-ascending.
pub fn select_month_end(candidates: Vec<SourceFile>) -> Vec<SourceFile> {
    let mut by_month: BTreeMap<u32, SourceFile> = BTreeMap::new();
    for candidate in candidates {
        match by_month.get(&candidate.month) {
            Some(current) if candidate.week < current.week => {}
            _ => {
                by_month.insert(candidate.month, candidate);
            }
        }
    }
    by_month.into_values().collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub center: String,
    pub agent_code: String,
    pub week_label: String,
}

impl DedupKey {
    pub fn of(record: &UnderperformanceRecord) -> Self {
        Self {
            center: record.center.clone(),
            agent_code: record.agent_code.clone(),
            week_label: record.report_week_label.clone(),
        }
    }
}

#[derive(Debug, Default)]
pub struct DedupContext {
    seen: HashSet<DedupKey>,
}

impl DedupContext {
    pub fn has_seen(&self, key: &DedupKey) -> bool {
        self.seen.contains(key)
    }

    pub fn mark_seen(&mut self, key: DedupKey) {
        self.seen.insert(key);
    }
}

/// Keep the first record per key, in the order given. Returns the kept
/// records and the number dropped.
pub fn reconcile(
    ctx: &mut DedupContext,
    records: Vec<UnderperformanceRecord>,
) -> (Vec<UnderperformanceRecord>, usize) {
    let mut kept = Vec::with_capacity(records.len());
    let mut dropped = 0;
    for record in records {
        let key = DedupKey::of(&record);
        if ctx.has_seen(&key) {
            dropped += 1;
            continue;
        }
        ctx.mark_seen(key);
        kept.push(record);
    }
    (kept, dropped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Channel, ReasonSet, Service};

    fn source(name: &str) -> SourceFile {
        let (month, week) = file_period(name).unwrap();
        SourceFile {
            month,
            week,
            file_name: name.to_string(),
            path: PathBuf::from(name),
        }
    }

    fn record(center: &str, code: &str, label: &str, file: &str) -> UnderperformanceRecord {
        UnderperformanceRecord {
            record_id: format!("{center}-{code}-{label}"),
            center: center.to_string(),
            report_week: None,
            report_week_label: label.to_string(),
            report_date: None,
            agent_name: "상담사".to_string(),
            agent_code: code.to_string(),
            vertical: String::new(),
            service: Service::Other,
            channel: Channel::Other,
            hire_date: None,
            tenure_months: None,
            qc_attitude_error: None,
            qc_ops_error: None,
            is_underperforming: true,
            underperforming_reason: ReasonSet::default(),
            note: None,
            source_file: file.to_string(),
        }
    }

    #[test]
    fn parses_file_periods() {
        assert_eq!(file_period("용산 미흡상담사 10월 4주차"), Some((10, 4)));
        assert_eq!(file_period("광주 집중관리 9월3주차"), Some((9, 3)));
        assert_eq!(file_period("광주 집중관리 11월"), Some((11, 0)));
        assert_eq!(file_period("용산 미흡상담사 최종"), None);
    }

    #[test]
    fn selects_latest_week_per_month() {
        let selected = select_month_end(vec![
            source("용산 미흡상담사 10월 2주차"),
            source("용산 미흡상담사 9월 4주차"),
            source("용산 미흡상담사 10월 4주차"),
            source("용산 미흡상담사 10월 3주차"),
        ]);
        let names: Vec<&str> = selected.iter().map(|f| f.file_name.as_str()).collect();
        assert_eq!(
            names,
            vec!["용산 미흡상담사 9월 4주차", "용산 미흡상담사 10월 4주차"]
        );
    }

    #[test]
    fn equal_weeks_keep_the_later_file() {
        let selected = select_month_end(vec![
            source("부진상담사 10월 4주차"),
            source("미흡상담사 10월 4주차 수정"),
        ]);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].file_name, "미흡상담사 10월 4주차 수정");
    }

    #[test]
    fn month_only_name_loses_to_any_week() {
        let selected = select_month_end(vec![
            source("집중관리 10월 1주차"),
            source("집중관리 10월"),
        ]);
        assert_eq!(selected[0].file_name, "집중관리 10월 1주차");
    }

    #[test]
    fn first_seen_record_wins() {
        let mut ctx = DedupContext::default();
        let (kept, dropped) = reconcile(
            &mut ctx,
            vec![
                record("용산", "a.kim", "10월 2주차", "first"),
                record("용산", "a.kim", "10월 3주차", "first"),
                record("광주", "a.kim", "10월 2주차", "first"),
            ],
        );
        assert_eq!(kept.len(), 3);
        assert_eq!(dropped, 0);

        let (kept, dropped) = reconcile(
            &mut ctx,
            vec![
                record("용산", "a.kim", "10월 2주차", "second"),
                record("용산", "b.lee", "10월 2주차", "second"),
            ],
        );
        assert_eq!(dropped, 1);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].agent_code, "b.lee");
        assert!(ctx.has_seen(&DedupKey::of(&record("용산", "a.kim", "10월 2주차", "x"))));
    }

    #[test]
    fn duplicates_inside_one_batch_collapse() {
        let mut ctx = DedupContext::default();
        let (kept, dropped) = reconcile(
            &mut ctx,
            vec![
                record("용산", "a.kim", "10월 2주차", "one"),
                record("용산", "a.kim", "10월 2주차", "two"),
            ],
        );
        assert_eq!(dropped, 1);
        assert_eq!(kept[0].source_file, "one");
    }
}
