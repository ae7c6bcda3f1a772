use std::collections::HashMap;

use crate::models::{Post, PostCategory, PostType, ReportItem};
use crate::normalize::{find_week_label, iso_week_id, make_id};
use crate::segment::segment_comment;

const CAUSE_KEYWORD: &str = "원인";
const PLAN_KEYWORD: &str = "방안";

/// Replies to weekly QC reports that mention a cause or a plan, segmented
/// into report items.
pub fn extract_report_items(posts: &[Post]) -> Vec<ReportItem> {
    let parents: HashMap<&str, &Post> = posts
        .iter()
        .filter(|p| p.post_type == PostType::Original && p.category == Some(PostCategory::QcWeekly))
        .map(|p| (p.post_id.as_str(), p))
        .collect();

    let mut items = Vec::new();
    for comment in posts.iter().filter(|p| p.post_type == PostType::Reply) {
        let Some(parent) = parents.get(comment.parent_id.as_str()) else {
            continue;
        };
        if !(comment.content.contains(CAUSE_KEYWORD) || comment.content.contains(PLAN_KEYWORD)) {
            continue;
        }
        items.extend(items_for_comment(comment, parent));
    }
    items
}

fn items_for_comment(comment: &Post, parent: &Post) -> Vec<ReportItem> {
    let week_label = find_week_label(&parent.content)
        .or_else(|| find_week_label(&comment.content))
        .unwrap_or_default();
    let report_date = comment.created_at.map(|dt| dt.date());
    let report_week = report_date.map(iso_week_id);

    segment_comment(&comment.content)
        .into_iter()
        .map(|item| {
            let seq = item.seq.to_string();
            ReportItem {
                action_id: make_id(&[&comment.post_id, item.service.as_str(), &seq]),
                post_id: comment.post_id.clone(),
                parent_id: comment.parent_id.clone(),
                center: comment.center.clone(),
                report_week: report_week.clone(),
                report_week_label: week_label.clone(),
                report_date,
                service: item.service,
                item_seq: item.seq,
                item_name: item.fields.label,
                item_category: item.category,
                item_group: item.category.group(),
                cause: item.fields.cause,
                plan: item.fields.plan,
                author_id: comment.author_id.clone(),
                created_at: comment.created_at,
            }
        })
        .collect()
}
