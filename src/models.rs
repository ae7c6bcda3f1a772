use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Serialize, Serializer};

use crate::config::LayoutKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PostType {
    Original,
    Reply,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PostCategory {
    QcWeekly,
    Refresher,
    NewHire,
    JobTest,
    QaEval,
    AdvancedTraining,
    Other,
}

impl PostCategory {
    pub fn is_education(self) -> bool {
        matches!(
            self,
            PostCategory::Refresher
                | PostCategory::NewHire
                | PostCategory::JobTest
                | PostCategory::QaEval
                | PostCategory::AdvancedTraining
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Service {
    Taxi,
    Quick,
    Driver,
    Freight,
    Bike,
    Parking,
    /// Synthetic section covering a whole report without service markers.
    Unified,
    Other,
}

impl Service {
    pub fn as_str(self) -> &'static str {
        match self {
            Service::Taxi => "taxi",
            Service::Quick => "quick",
            Service::Driver => "driver",
            Service::Freight => "freight",
            Service::Bike => "bike",
            Service::Parking => "parking",
            Service::Unified => "unified",
            Service::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Phone,
    Chat,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QcCategory {
    GreetingError,
    EmpathyError,
    ApologyError,
    AdditionalInquiryError,
    UnkindError,
    ConsultTypeError,
    GuideError,
    IdentityCheckError,
    RequiredSearchError,
    WrongGuideError,
    ProcessMissingError,
    ProcessIncompleteError,
    SystemError,
    IdMappingError,
    FlagKeywordError,
    HistoryError,
    Uncategorized,
}

impl QcCategory {
    pub fn group(self) -> QcGroup {
        match self {
            QcCategory::GreetingError
            | QcCategory::EmpathyError
            | QcCategory::ApologyError
            | QcCategory::AdditionalInquiryError
            | QcCategory::UnkindError => QcGroup::Attitude,
            QcCategory::Uncategorized => QcGroup::Uncategorized,
            _ => QcGroup::Operations,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QcGroup {
    Attitude,
    Operations,
    Uncategorized,
}

#[derive(Debug, Clone)]
pub struct Post {
    pub post_id: String,
    pub parent_id: String,
    pub post_type: PostType,
    pub center: String,
    pub created_at: Option<NaiveDateTime>,
    pub author_id: String,
    pub content: String,
    pub attachment_url: Option<String>,
    pub board_url: Option<String>,
    /// Only set for top-level posts.
    pub category: Option<PostCategory>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostRecord {
    pub post_id: String,
    pub parent_id: String,
    pub post_type: PostType,
    pub center: String,
    pub created_at: Option<NaiveDateTime>,
    pub author_id: String,
    pub content: String,
    pub has_attachment: bool,
    pub attachment_url: Option<String>,
    pub board_url: Option<String>,
    pub category: Option<PostCategory>,
    pub parsed_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportItem {
    pub action_id: String,
    pub post_id: String,
    pub parent_id: String,
    pub center: String,
    pub report_week: Option<String>,
    pub report_week_label: String,
    pub report_date: Option<NaiveDate>,
    pub service: Service,
    pub item_seq: usize,
    pub item_name: String,
    pub item_category: QcCategory,
    pub item_group: QcGroup,
    pub cause: String,
    pub plan: String,
    pub author_id: String,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EducationRecord {
    pub record_id: String,
    pub post_id: String,
    pub parent_id: String,
    pub center: String,
    pub record_type: PostCategory,
    pub record_date: Option<NaiveDate>,
    pub service: Service,
    pub title: String,
    pub description: Option<String>,
    pub author_id: String,
    pub attachment_url: Option<String>,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetPeriod {
    pub explicit_year: Option<i32>,
    pub month: u32,
    pub week: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportingWeek {
    /// "{month}월 {week}주차"
    pub label: String,
    /// "{iso-year}-W{iso-week:02}"
    pub iso_week: Option<String>,
    pub report_date: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct SignalTuple {
    pub layout: LayoutKind,
    pub agent_name: String,
    pub agent_code: String,
    pub vertical: String,
    pub service: Service,
    pub channel: Channel,
    pub hire_date: Option<NaiveDate>,
    pub tenure_months: Option<i64>,
    pub attitude_error: Option<bool>,
    pub ops_error: Option<bool>,
    pub qa_flagged: Option<bool>,
    pub eval_flagged: bool,
    /// Underperforming marker as read from the sheet.
    pub underperforming: bool,
    /// Free-text underperformance type (section-relative sheets).
    pub underperformance_type: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Reason {
    QaShortfall,
    AttitudeShortfall,
    OpsShortfall,
    EvalShortfall,
    Other,
    QcShortfall,
}

impl Reason {
    pub fn as_str(self) -> &'static str {
        match self {
            Reason::QaShortfall => "QA-shortfall",
            Reason::AttitudeShortfall => "attitude-shortfall",
            Reason::OpsShortfall => "ops-shortfall",
            Reason::EvalShortfall => "eval-shortfall",
            Reason::Other => "other",
            Reason::QcShortfall => "QC-shortfall",
        }
    }
}

/// Ordered, de-duplicated reason tags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReasonSet(Vec<Reason>);

impl ReasonSet {
    pub fn push(&mut self, reason: Reason) {
        if !self.0.contains(&reason) {
            self.0.push(reason);
        }
    }

    /// Seal the set, substituting `fallback` when nothing applied.
    pub fn or_fallback(mut self, fallback: Reason) -> Self {
        if self.0.is_empty() {
            self.0.push(fallback);
        }
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = Reason> + '_ {
        self.0.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ReasonSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, reason) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            f.write_str(reason.as_str())?;
        }
        Ok(())
    }
}

impl Serialize for ReasonSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UnderperformanceRecord {
    pub record_id: String,
    pub center: String,
    pub report_week: Option<String>,
    pub report_week_label: String,
    pub report_date: Option<NaiveDate>,
    pub agent_name: String,
    pub agent_code: String,
    pub vertical: String,
    pub service: Service,
    pub channel: Channel,
    pub hire_date: Option<NaiveDate>,
    pub tenure_months: Option<i64>,
    pub qc_attitude_error: Option<bool>,
    pub qc_ops_error: Option<bool>,
    pub is_underperforming: bool,
    pub underperforming_reason: ReasonSet,
    pub note: Option<String>,
    pub source_file: String,
}

#[derive(Debug, Clone)]
pub struct ReasonSummary {
    pub reason: Reason,
    pub count: usize,
}
