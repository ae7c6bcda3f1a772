use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use csv::StringRecord;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::CenterConfig;
use crate::error::SourceError;
use crate::models::{Post, PostCategory, PostRecord, PostType};
use crate::normalize::{parse_datetime, truncate_chars};

const MAX_CONTENT_CHARS: usize = 60_000;

const COL_PARENT: usize = 0;
const COL_POST: usize = 1;
const COL_TYPE: usize = 2;
const COL_CREATED: usize = 3;
const COL_AUTHOR: usize = 4;
const COL_CONTENT: usize = 5;
const COL_BOARD_URL: usize = 8;
const COL_ATTACHMENT: usize = 9;

static IMAGE_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{IMAGE:\d+\}").expect("image placeholder pattern"));

pub trait PostSource {
    fn posts(&self, center: &CenterConfig) -> Result<Vec<Post>, SourceError>;
}

#[derive(Debug, Clone)]
pub struct CsvPostSource {
    root: PathBuf,
}

impl CsvPostSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl PostSource for CsvPostSource {
    fn posts(&self, center: &CenterConfig) -> Result<Vec<Post>, SourceError> {
        let path = self.root.join(&center.posts_file);
        if !path.is_file() {
            return Err(SourceError::NotFound { path });
        }
        read_posts(&path, &center.name)
    }
}

fn read_posts(path: &Path, center: &str) -> Result<Vec<Post>, SourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|source| SourceError::Csv {
            path: path.to_path_buf(),
            source,
        })?;

    let mut posts = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|source| SourceError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        if let Some(post) = post_from_record(&record, center) {
            posts.push(post);
        }
    }
    Ok(posts)
}

fn field(record: &StringRecord, index: usize) -> &str {
    record.get(index).map(str::trim).unwrap_or("")
}

fn optional_field(record: &StringRecord, index: usize) -> Option<String> {
    let value = field(record, index);
    (!value.is_empty()).then(|| value.to_string())
}

/// Rows that are neither originals nor replies (headers, blank lines) are
/// skipped, as are rows without any id.
fn post_from_record(record: &StringRecord, center: &str) -> Option<Post> {
    let post_type = match field(record, COL_TYPE) {
        "원글" => PostType::Original,
        "댓글" => PostType::Reply,
        _ => return None,
    };

    let parent_id = field(record, COL_PARENT).to_string();
    let post_id = match field(record, COL_POST) {
        "" => parent_id.clone(),
        id => id.to_string(),
    };
    if post_id.is_empty() {
        return None;
    }

    let content = clean_content(field(record, COL_CONTENT));
    let category = (post_type == PostType::Original).then(|| classify_post(&content));

    Some(Post {
        post_id,
        parent_id,
        post_type,
        center: center.to_string(),
        created_at: parse_datetime(field(record, COL_CREATED)),
        author_id: field(record, COL_AUTHOR).to_string(),
        content,
        attachment_url: optional_field(record, COL_ATTACHMENT),
        board_url: optional_field(record, COL_BOARD_URL),
        category,
    })
}

pub fn clean_content(raw: &str) -> String {
    let stripped = IMAGE_PLACEHOLDER.replace_all(raw, "");
    truncate_chars(stripped.trim(), MAX_CONTENT_CHARS)
}

struct CategoryRule {
    all: &'static [&'static str],
    any: &'static [&'static str],
    category: PostCategory,
}

const CATEGORY_RULES: &[CategoryRule] = &[
    CategoryRule {
        all: &["qc"],
        any: &["리포트", "리포팅", "report"],
        category: PostCategory::QcWeekly,
    },
    CategoryRule {
        all: &[],
        any: &["보수교육", "보수 교육"],
        category: PostCategory::Refresher,
    },
    CategoryRule {
        all: &["신입", "교육"],
        any: &[],
        category: PostCategory::NewHire,
    },
    CategoryRule {
        all: &["직무"],
        any: &["테스트", "평가"],
        category: PostCategory::JobTest,
    },
    CategoryRule {
        all: &["qa"],
        any: &["평가", "대상"],
        category: PostCategory::QaEval,
    },
    CategoryRule {
        all: &["심화", "교육"],
        any: &[],
        category: PostCategory::AdvancedTraining,
    },
];

/// Classify a top-level post by keywords in its text.
pub fn classify_post(title: &str) -> PostCategory {
    let lowered = title.to_lowercase();
    if lowered.is_empty() {
        return PostCategory::Other;
    }
    CATEGORY_RULES
        .iter()
        .find(|rule| {
            rule.all.iter().all(|k| lowered.contains(k))
                && (rule.any.is_empty() || rule.any.iter().any(|k| lowered.contains(k)))
        })
        .map_or(PostCategory::Other, |rule| rule.category)
}

pub fn to_record(post: &Post, parsed_at: NaiveDateTime) -> PostRecord {
    PostRecord {
        post_id: post.post_id.clone(),
        parent_id: post.parent_id.clone(),
        post_type: post.post_type,
        center: post.center.clone(),
        created_at: post.created_at,
        author_id: post.author_id.clone(),
        content: post.content.clone(),
        has_attachment: post.attachment_url.is_some(),
        attachment_url: post.attachment_url.clone(),
        board_url: post.board_url.clone(),
        category: post.category,
        parsed_at,
    }
}
