use crate::config::LayoutKind;
use crate::models::{Reason, ReasonSet, ReportingWeek, SignalTuple, UnderperformanceRecord};
use crate::normalize::make_id;

const ATTITUDE_KEYWORD: &str = "태도";
const CONSULTATION_KEYWORD: &str = "상담";

/// Where a batch of tuples came from.
#[derive(Debug, Clone, Copy)]
pub struct RecordContext<'a> {
    pub center: &'a str,
    pub week: &'a ReportingWeek,
    pub source_file: &'a str,
}

/// Reason tags for one underperforming agent-week. Never empty.
pub fn derive_reasons(tuple: &SignalTuple) -> ReasonSet {
    let mut reasons = ReasonSet::default();
    match tuple.layout {
        LayoutKind::FixedOffset => {
            if tuple.qa_flagged == Some(true) {
                reasons.push(Reason::QaShortfall);
            }
            if tuple.attitude_error == Some(true) {
                reasons.push(Reason::AttitudeShortfall);
            }
            if tuple.ops_error == Some(true) {
                reasons.push(Reason::OpsShortfall);
            }
            if tuple.eval_flagged {
                reasons.push(Reason::EvalShortfall);
            }
            reasons.or_fallback(Reason::Other)
        }
        LayoutKind::SectionRelative => {
            if let Some(kind) = tuple.underperformance_type.as_deref() {
                if kind.contains(ATTITUDE_KEYWORD) {
                    reasons.push(Reason::AttitudeShortfall);
                }
                if kind.contains(CONSULTATION_KEYWORD) {
                    reasons.push(Reason::OpsShortfall);
                }
            }
            reasons.or_fallback(Reason::QcShortfall)
        }
    }
}

pub fn record_id(center: &str, agent_code: &str, week: &ReportingWeek) -> String {
    make_id(&[center, agent_code, week.iso_week.as_deref().unwrap_or("")])
}

pub fn classify(tuple: SignalTuple, ctx: &RecordContext<'_>) -> UnderperformanceRecord {
    let reasons = derive_reasons(&tuple);
    debug_assert!(!reasons.is_empty());
    UnderperformanceRecord {
        record_id: record_id(ctx.center, &tuple.agent_code, ctx.week),
        center: ctx.center.to_string(),
        report_week: ctx.week.iso_week.clone(),
        report_week_label: ctx.week.label.clone(),
        report_date: ctx.week.report_date,
        agent_name: tuple.agent_name,
        agent_code: tuple.agent_code,
        vertical: tuple.vertical,
        service: tuple.service,
        channel: tuple.channel,
        hire_date: tuple.hire_date,
        tenure_months: tuple.tenure_months,
        qc_attitude_error: tuple.attitude_error,
        qc_ops_error: tuple.ops_error,
        is_underperforming: tuple.underperforming,
        underperforming_reason: reasons,
        note: tuple.note,
        source_file: ctx.source_file.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Channel, Service};
    use crate::normalize::reporting_week;

    fn sample_tuple(layout: LayoutKind) -> SignalTuple {
        SignalTuple {
            layout,
            agent_name: "김상담".to_string(),
            agent_code: "agent.kim".to_string(),
            vertical: "택시 유선".to_string(),
            service: Service::Taxi,
            channel: Channel::Phone,
            hire_date: None,
            tenure_months: Some(12),
            attitude_error: None,
            ops_error: None,
            qa_flagged: None,
            eval_flagged: false,
            underperforming: true,
            underperformance_type: None,
            note: None,
        }
    }

    fn tags(reasons: &ReasonSet) -> String {
        reasons.to_string()
    }

    #[test]
    fn fixed_offset_reasons_accumulate_in_order() {
        let mut tuple = sample_tuple(LayoutKind::FixedOffset);
        tuple.eval_flagged = true;
        tuple.ops_error = Some(true);
        tuple.qa_flagged = Some(true);
        tuple.attitude_error = Some(false);
        assert_eq!(
            tags(&derive_reasons(&tuple)),
            "QA-shortfall,ops-shortfall,eval-shortfall"
        );
    }

    #[test]
    fn fixed_offset_without_signals_falls_back_to_other() {
        let tuple = sample_tuple(LayoutKind::FixedOffset);
        assert_eq!(tags(&derive_reasons(&tuple)), "other");
    }

    #[test]
    fn section_reasons_come_from_type_text() {
        let mut tuple = sample_tuple(LayoutKind::SectionRelative);
        tuple.underperformance_type = Some("태도&상담".to_string());
        assert_eq!(
            tags(&derive_reasons(&tuple)),
            "attitude-shortfall,ops-shortfall"
        );

        tuple.underperformance_type = Some("상담".to_string());
        assert_eq!(tags(&derive_reasons(&tuple)), "ops-shortfall");
    }

    #[test]
    fn section_without_recognised_type_falls_back_to_qc_shortfall() {
        let mut tuple = sample_tuple(LayoutKind::SectionRelative);
        tuple.attitude_error = Some(true);
        assert_eq!(tags(&derive_reasons(&tuple)), "QC-shortfall");

        tuple.underperformance_type = Some("기타".to_string());
        assert_eq!(tags(&derive_reasons(&tuple)), "QC-shortfall");
    }

    #[test]
    fn reason_set_is_never_empty() {
        for layout in [LayoutKind::FixedOffset, LayoutKind::SectionRelative] {
            assert!(!derive_reasons(&sample_tuple(layout)).is_empty());
        }
    }

    #[test]
    fn classify_builds_record_with_stable_identity() {
        let week = reporting_week(2025, 10, 2);
        let ctx = RecordContext {
            center: "용산",
            week: &week,
            source_file: "용산 부진상담사 10월 4주차",
        };
        let mut tuple = sample_tuple(LayoutKind::FixedOffset);
        tuple.attitude_error = Some(true);

        let first = classify(tuple.clone(), &ctx);
        let second = classify(tuple, &ctx);

        assert_eq!(first.record_id, second.record_id);
        assert_eq!(first.record_id, make_id(&["용산", "agent.kim", "2025-W42"]));
        assert_eq!(first.report_week_label, "10월 2주차");
        assert_eq!(first.report_week.as_deref(), Some("2025-W42"));
        assert!(first.is_underperforming);
        assert_eq!(tags(&first.underperforming_reason), "attitude-shortfall");
        assert_eq!(first.qc_attitude_error, Some(true));

        let json = serde_json::to_value(&first).unwrap();
        assert_eq!(json["underperforming_reason"], "attitude-shortfall");
        assert_eq!(json["service"], "taxi");
        assert_eq!(json["report_date"], "2025-10-14");
    }
}
