use std::collections::HashMap;

use crate::models::{EducationRecord, Post, PostType, Service};
use crate::normalize::{make_id, truncate_chars};

const MIN_REPLY_CHARS: usize = 20;
const MAX_TITLE_CHARS: usize = 200;
const MAX_DESCRIPTION_CHARS: usize = 10_000;

const SERVICE_KEYWORDS: &[(&str, Service)] = &[
    ("택시", Service::Taxi),
    ("퀵", Service::Quick),
    ("대리", Service::Driver),
];

fn detect_service(content: &str) -> Service {
    SERVICE_KEYWORDS
        .iter()
        .find(|(keyword, _)| content.contains(keyword))
        .map_or(Service::Other, |(_, service)| *service)
}

fn title_of(content: &str) -> String {
    truncate_chars(content.lines().next().unwrap_or(""), MAX_TITLE_CHARS)
}

/// One record per training post, plus one per substantive reply to it.
pub fn extract_education_records(posts: &[Post]) -> Vec<EducationRecord> {
    let mut parents: Vec<&Post> = Vec::new();
    let mut by_id: HashMap<&str, &Post> = HashMap::new();
    for post in posts {
        let is_training = post.post_type == PostType::Original
            && post.category.is_some_and(|category| category.is_education());
        if is_training && by_id.insert(post.post_id.as_str(), post).is_none() {
            parents.push(post);
        }
    }

    let mut records = Vec::with_capacity(parents.len());
    for parent in &parents {
        let Some(category) = parent.category else {
            continue;
        };
        records.push(EducationRecord {
            record_id: make_id(&[&parent.post_id, "edu"]),
            post_id: parent.post_id.clone(),
            parent_id: parent.parent_id.clone(),
            center: parent.center.clone(),
            record_type: category,
            record_date: parent.created_at.map(|dt| dt.date()),
            service: detect_service(&parent.content),
            title: title_of(&parent.content),
            description: None,
            author_id: parent.author_id.clone(),
            attachment_url: parent.attachment_url.clone(),
            created_at: parent.created_at,
        });
    }

    for reply in posts.iter().filter(|p| p.post_type == PostType::Reply) {
        let Some(parent) = by_id.get(reply.parent_id.as_str()) else {
            continue;
        };
        let Some(category) = parent.category else {
            continue;
        };
        if reply.content.chars().count() < MIN_REPLY_CHARS {
            continue;
        }
        records.push(EducationRecord {
            record_id: make_id(&[&reply.post_id, "edu_c"]),
            post_id: reply.post_id.clone(),
            parent_id: reply.parent_id.clone(),
            center: reply.center.clone(),
            record_type: category,
            record_date: reply.created_at.map(|dt| dt.date()),
            service: detect_service(&reply.content),
            title: title_of(&parent.content),
            description: Some(truncate_chars(&reply.content, MAX_DESCRIPTION_CHARS)),
            author_id: reply.author_id.clone(),
            attachment_url: reply.attachment_url.clone(),
            created_at: reply.created_at,
        });
    }

    records
}
