use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{QcCategory, Service};
use crate::normalize::collapse_whitespace;

/// Enumerator glyphs, one per QC category.
const ENUMERATORS: [char; 16] = [
    '①', '②', '③', '④', '⑤', '⑥', '⑦', '⑧', '⑨', '⑩', '⑪', '⑫', '⑬', '⑭', '⑮', '⑯',
];

/// Label given to the single item recovered from a section without enumerators.
pub const UNCATEGORIZED_LABEL: &str = "uncategorized";

static SERVICE_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\*?\s*-\s*(택시|퀵|대리|화물|바이크|주차)\s*\*?").expect("service marker pattern")
});
static CAUSE_START: Lazy<Regex> = Lazy::new(|| Regex::new(r"-\s*원인").expect("cause start"));
static CAUSE_ANCHOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-\s*원인\s*[:：]\s*").expect("cause anchor"));
static PLAN_BOUNDARY: Lazy<Regex> = Lazy::new(|| Regex::new(r"-\s*방안").expect("plan boundary"));
static PLAN_ANCHOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-\s*방안\s*[:：]\s*").expect("plan anchor"));

const SERVICE_MARKERS: &[(&str, Service)] = &[
    ("택시", Service::Taxi),
    ("퀵", Service::Quick),
    ("대리", Service::Driver),
    ("화물", Service::Freight),
    ("바이크", Service::Bike),
    ("주차", Service::Parking),
];

/// Raw label fragments to canonical categories. Evaluated top to bottom by
/// substring containment; the first hit wins.
const CATEGORY_SYNONYMS: &[(&str, QcCategory)] = &[
    ("첫인사", QcCategory::GreetingError),
    ("끝인사", QcCategory::GreetingError),
    ("공감표현", QcCategory::EmpathyError),
    ("사과표현", QcCategory::ApologyError),
    ("추가문의", QcCategory::AdditionalInquiryError),
    ("불친절", QcCategory::UnkindError),
    ("상담유형", QcCategory::ConsultTypeError),
    ("가이드", QcCategory::GuideError),
    ("본인확인", QcCategory::IdentityCheckError),
    ("필수탐색", QcCategory::RequiredSearchError),
    ("오안내", QcCategory::WrongGuideError),
    ("전산처리누락", QcCategory::ProcessMissingError),
    ("전산 처리 누락", QcCategory::ProcessMissingError),
    ("전산처리미흡", QcCategory::ProcessIncompleteError),
    ("전산 처리 미흡", QcCategory::ProcessIncompleteError),
    ("전산조작", QcCategory::SystemError),
    ("전산 조작", QcCategory::SystemError),
    ("콜픽트립", QcCategory::IdMappingError),
    ("ID매핑", QcCategory::IdMappingError),
    ("플래그", QcCategory::FlagKeywordError),
    ("키워드", QcCategory::FlagKeywordError),
    ("상담이력", QcCategory::HistoryError),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section<'a> {
    pub service: Service,
    pub text: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFields {
    pub label: String,
    pub cause: String,
    pub plan: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentedItem {
    pub service: Service,
    pub seq: usize,
    pub category: QcCategory,
    pub fields: ItemFields,
}

pub fn segment_comment(text: &str) -> Vec<SegmentedItem> {
    let mut items = Vec::new();
    for section in split_service_sections(text) {
        let parsed = parse_section_items(section.text);
        for (index, fields) in parsed.into_iter().enumerate() {
            items.push(SegmentedItem {
                service: section.service,
                seq: index + 1,
                category: map_category(&fields.label),
                fields,
            });
        }
    }
    items
}

/// Partition by "- <service>" markers; no marker means one unified section.
pub fn split_service_sections(text: &str) -> Vec<Section<'_>> {
    let markers: Vec<(usize, usize, Service)> = SERVICE_MARKER
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let service = service_for_marker(caps.get(1)?.as_str())?;
            Some((whole.start(), whole.end(), service))
        })
        .collect();

    if markers.is_empty() {
        return vec![Section {
            service: Service::Unified,
            text,
        }];
    }

    markers
        .iter()
        .enumerate()
        .map(|(i, &(_, end, service))| {
            let next = markers.get(i + 1).map_or(text.len(), |m| m.0);
            Section {
                service,
                text: text[end..next].trim(),
            }
        })
        .collect()
}

fn service_for_marker(marker: &str) -> Option<Service> {
    SERVICE_MARKERS
        .iter()
        .find(|(name, _)| *name == marker)
        .map(|(_, service)| *service)
}

/// Items of one section, in text order. Items whose fields are all empty are
/// dropped.
pub fn parse_section_items(text: &str) -> Vec<ItemFields> {
    let bodies = enumerated_bodies(text);

    if bodies.is_empty() {
        let cause = capture_cause(text);
        let plan = capture_plan(text);
        if cause.is_none() && plan.is_none() {
            return Vec::new();
        }
        return vec![ItemFields {
            label: UNCATEGORIZED_LABEL.to_string(),
            cause: cause.map(|c| collapse_whitespace(&c)).unwrap_or_default(),
            plan: plan.map(|p| collapse_whitespace(&p)).unwrap_or_default(),
        }];
    }

    bodies.into_iter().filter_map(extract_fields).collect()
}

/// Text following each enumerator glyph up to the next glyph. Anything before
/// the first glyph is preamble and ignored.
fn enumerated_bodies(text: &str) -> Vec<&str> {
    let starts: Vec<(usize, usize)> = text
        .char_indices()
        .filter(|(_, c)| ENUMERATORS.contains(c))
        .map(|(i, c)| (i, i + c.len_utf8()))
        .collect();

    starts
        .iter()
        .enumerate()
        .map(|(i, &(_, body_start))| {
            let body_end = starts.get(i + 1).map_or(text.len(), |next| next.0);
            &text[body_start..body_end]
        })
        .collect()
}

fn extract_fields(body: &str) -> Option<ItemFields> {
    let raw_label = match CAUSE_START.find(body) {
        Some(m) => &body[..m.start()],
        None => body.trim_start().lines().next().unwrap_or(""),
    };

    let fields = ItemFields {
        label: collapse_whitespace(raw_label),
        cause: capture_cause(body)
            .map(|c| collapse_whitespace(&c))
            .unwrap_or_default(),
        plan: capture_plan(body)
            .map(|p| collapse_whitespace(&p))
            .unwrap_or_default(),
    };

    let all_empty = fields.label.is_empty() && fields.cause.is_empty() && fields.plan.is_empty();
    (!all_empty).then_some(fields)
}

fn capture_cause(text: &str) -> Option<String> {
    let anchor = CAUSE_ANCHOR.find(text)?;
    let rest = &text[anchor.end()..];
    let first = rest.chars().next()?;
    let end = PLAN_BOUNDARY
        .find_at(rest, first.len_utf8())
        .map_or(rest.len(), |m| m.start());
    Some(rest[..end].to_string())
}

fn capture_plan(text: &str) -> Option<String> {
    let anchor = PLAN_ANCHOR.find(text)?;
    let rest = &text[anchor.end()..];
    (!rest.is_empty()).then(|| rest.to_string())
}

pub fn map_category(label: &str) -> QcCategory {
    let clean = label.trim();
    if clean.is_empty() {
        return QcCategory::Uncategorized;
    }
    CATEGORY_SYNONYMS
        .iter()
        .find(|(key, _)| clean.contains(key))
        .map_or(QcCategory::Uncategorized, |(_, category)| *category)
}
