use std::collections::HashMap;
use std::fmt::Write;

use chrono::NaiveDateTime;

use crate::models::{ReasonSummary, UnderperformanceRecord};
use crate::pipeline::{PostRun, UnderperformanceRun};

/// Count of records per reason tag, most frequent first.
pub fn summarize_by_reason(records: &[UnderperformanceRecord]) -> Vec<ReasonSummary> {
    let mut map = HashMap::new();
    for record in records {
        for reason in record.underperforming_reason.iter() {
            *map.entry(reason).or_insert(0usize) += 1;
        }
    }

    let mut summaries: Vec<ReasonSummary> = map
        .into_iter()
        .map(|(reason, count)| ReasonSummary { reason, count })
        .collect();

    summaries.sort_by(|a, b| b.count.cmp(&a.count).then(a.reason.cmp(&b.reason)));
    summaries
}

pub fn build_summary(
    generated_at: NaiveDateTime,
    posts: Option<&PostRun>,
    underperformance: Option<&UnderperformanceRun>,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# QC Extraction Summary");
    let _ = writeln!(output, "Generated at {}", generated_at.format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Streams");

    if let Some(run) = posts {
        let _ = writeln!(output, "- posts: {}", run.posts.len());
        let _ = writeln!(output, "- report items: {}", run.actions.len());
        let _ = writeln!(output, "- education records: {}", run.education.len());
    }
    if let Some(run) = underperformance {
        let _ = writeln!(
            output,
            "- underperformance records: {} ({} duplicates dropped)",
            run.records.len(),
            run.duplicates
        );
    }
    if posts.is_none() && underperformance.is_none() {
        let _ = writeln!(output, "No streams were run.");
    }

    if let Some(run) = underperformance {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Reason Mix");
        let summaries = summarize_by_reason(&run.records);
        if summaries.is_empty() {
            let _ = writeln!(output, "No underperformance records.");
        } else {
            for summary in &summaries {
                let _ = writeln!(output, "- {}: {}", summary.reason.as_str(), summary.count);
            }
        }

        let _ = writeln!(output);
        let _ = writeln!(output, "## File Selections");
        if run.files.is_empty() {
            let _ = writeln!(output, "No workbooks selected.");
        } else {
            for file in &run.files {
                let status = match &file.failure {
                    Some(cause) => format!("failed: {cause}"),
                    None => format!("{} records", file.kept),
                };
                let _ = writeln!(
                    output,
                    "- {} / {}월 (week {}): {} ({})",
                    file.center, file.month, file.week, file.file_name, status
                );
            }
        }
    }

    let failed_centers = posts.map(|run| run.failed_centers.as_slice()).unwrap_or(&[]);
    if !failed_centers.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Unavailable Post Exports");
        for (center, cause) in failed_centers {
            let _ = writeln!(output, "- {}: {}", center, cause);
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::models::{Channel, Reason, ReasonSet, Service};
    use crate::pipeline::FileReport;

    fn record(code: &str, reasons: &[Reason]) -> UnderperformanceRecord {
        let mut set = ReasonSet::default();
        for reason in reasons {
            set.push(*reason);
        }
        UnderperformanceRecord {
            record_id: code.to_string(),
            center: "용산".to_string(),
            report_week: None,
            report_week_label: "10월 2주차".to_string(),
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
            underperforming_reason: set,
            note: None,
            source_file: "용산 미흡상담사 10월 4주차".to_string(),
        }
    }

    fn generated_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 10, 20)
            .and_then(|d| d.and_hms_opt(9, 30, 0))
            .unwrap()
    }

    #[test]
    fn reasons_are_counted_per_tag() {
        let records = vec![
            record("a", &[Reason::AttitudeShortfall, Reason::OpsShortfall]),
            record("b", &[Reason::AttitudeShortfall]),
            record("c", &[Reason::Other]),
        ];
        let summaries = summarize_by_reason(&records);
        assert_eq!(summaries[0].reason, Reason::AttitudeShortfall);
        assert_eq!(summaries[0].count, 2);
        assert_eq!(summaries.len(), 3);
    }

    #[test]
    fn summary_lists_streams_selections_and_failures() {
        let underperformance = UnderperformanceRun {
            records: vec![record("a", &[Reason::QaShortfall])],
            files: vec![
                FileReport {
                    center: "용산".to_string(),
                    file_name: "용산 미흡상담사 10월 4주차".to_string(),
                    month: 10,
                    week: 4,
                    kept: 1,
                    failure: None,
                },
                FileReport {
                    center: "광주".to_string(),
                    file_name: "광주 집중관리 10월 3주차".to_string(),
                    month: 10,
                    week: 3,
                    kept: 0,
                    failure: Some("workbook has no sheets".to_string()),
                },
            ],
            duplicates: 2,
        };
        let posts = PostRun {
            failed_centers: vec![("광주".to_string(), "source not found".to_string())],
            ..PostRun::default()
        };

        let summary = build_summary(generated_at(), Some(&posts), Some(&underperformance));

        assert!(summary.starts_with("# QC Extraction Summary"));
        assert!(summary.contains("- posts: 0"));
        assert!(summary.contains("- underperformance records: 1 (2 duplicates dropped)"));
        assert!(summary.contains("- QA-shortfall: 1"));
        assert!(summary.contains("- 용산 / 10월 (week 4): 용산 미흡상담사 10월 4주차 (1 records)"));
        assert!(summary.contains("- 광주 / 10월 (week 3): 광주 집중관리 10월 3주차 (failed: workbook has no sheets)"));
        assert!(summary.contains("- 광주: source not found"));
    }

    #[test]
    fn empty_summary_says_so() {
        let summary = build_summary(generated_at(), None, None);
        assert!(summary.contains("No streams were run."));
    }
}
