//! Run-scoped normalization and duplicate suppression.
//!
//! Every record from every extraction source flows through the same two
//! stages: field cleanup with mandatory-field enforcement, then
//! first-seen-wins dedup keyed on content. Both stages absorb problems
//! locally; a bad record is dropped and counted, never an error.

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use tracing::debug;

use crate::dates;
use crate::types::{RawReview, ReviewRecord, Source};

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static NUMERIC_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+\.?\d*").expect("valid regex"));
static CANONICAL_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid regex"));

const TITLE_SNIPPET_LEN: usize = 80;
const DEDUP_SNIPPET_LEN: usize = 50;

#[derive(Default)]
pub struct Pipeline {
    seen: HashSet<String>,
    pub dropped_incomplete: u64,
    pub dropped_duplicates: u64,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize then dedup one record. `None` means dropped.
    pub fn process(&mut self, raw: RawReview) -> Option<ReviewRecord> {
        let record = self.normalize(raw)?;
        self.dedup(record)
    }

    fn normalize(&mut self, raw: RawReview) -> Option<ReviewRecord> {
        let company = clean(raw.company_name);
        let product_name = clean(raw.product_name);
        let product_url = clean(raw.product_url);
        let title = clean(raw.title);
        let review_title = clean(raw.review_title);
        let body = clean(raw.review_text);
        let reviewer = clean(raw.reviewer_name);
        let rating = coerce_number(raw.rating.as_deref());

        let date = clean(raw.date)
            .or_else(|| clean(raw.review_date))
            .and_then(|d| {
                if CANONICAL_DATE.is_match(&d) {
                    Some(d)
                } else {
                    dates::normalize(&d, Utc::now())
                }
            });

        let source = raw
            .source
            .or_else(|| product_url.as_deref().and_then(Source::from_url));

        let (Some(source), Some(review_text), Some(date)) = (source, body, date) else {
            self.dropped_incomplete += 1;
            debug!("record dropped: missing mandatory field after backfill");
            return None;
        };

        Some(ReviewRecord {
            source,
            company_name: company.or(product_name).unwrap_or_default(),
            title: title
                .or(review_title)
                .unwrap_or_else(|| synthesize_title(&review_text)),
            review_text,
            date,
            rating,
            reviewer_name: reviewer,
            scraped_at: Utc::now(),
        })
    }

    fn dedup(&mut self, record: ReviewRecord) -> Option<ReviewRecord> {
        let key = identity_key(&record);
        if !self.seen.insert(key.clone()) {
            self.dropped_duplicates += 1;
            debug!(key = %key, "duplicate record dropped");
            return None;
        }
        Some(record)
    }
}

/// Content-derived identity: source, reviewer, date and the leading body
/// snippet. The `review_` prefix namespaces review-shaped records in stores
/// that also hold product or category listings.
pub fn identity_key(record: &ReviewRecord) -> String {
    let snippet: String = record.review_text.chars().take(DEDUP_SNIPPET_LEN).collect();
    format!(
        "review_{}_{}_{}_{}",
        record.source,
        record.reviewer_name.as_deref().unwrap_or(""),
        record.date,
        snippet
    )
}

/// First numeric token of any string form, tolerating thousands separators.
pub fn coerce_number(value: Option<&str>) -> Option<f64> {
    let cleaned = value?.replace(',', "");
    NUMERIC_TOKEN
        .find(&cleaned)
        .and_then(|m| m.as_str().parse().ok())
}

fn synthesize_title(body: &str) -> String {
    if body.chars().count() > TITLE_SNIPPET_LEN {
        let head: String = body.chars().take(TITLE_SNIPPET_LEN).collect();
        format!("{head}...")
    } else {
        body.to_string()
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value.and_then(|s| {
        let collapsed = WHITESPACE.replace_all(&s, " ").trim().to_string();
        if collapsed.is_empty() {
            None
        } else {
            Some(collapsed)
        }
    })
}
