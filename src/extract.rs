//! Review extraction from a confirmed listing page.
//!
//! Card location and every per-field read go through ordered selector
//! chains, first non-empty match wins. Capterra pages that render reviews
//! purely client-side fall back to the embedded JSON-LD graph.

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;

use crate::dates;
use crate::sources::{Grab, SiteProfile};
use crate::types::{ExtractionContext, RawReview};

static JSONLD_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"script[type="application/ld+json"]"#).expect("valid jsonld selector")
});
static LEADING_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?)").expect("valid regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// What one page yielded. `cards_seen` counts located review containers
/// before date filtering; zero means the listing is exhausted (or was never
/// a listing), which the engine uses to stop paginating.
pub struct PageExtract {
    pub cards_seen: usize,
    pub raws: Vec<RawReview>,
}

/// True when any detection query matches at least one element. Used by the
/// prober to validate a candidate page without a second fetch.
pub fn page_matches(html: &str, detection: &[&str]) -> bool {
    let doc = Html::parse_document(html);
    detection.iter().any(|q| {
        Selector::parse(q)
            .map(|sel| doc.select(&sel).next().is_some())
            .unwrap_or(false)
    })
}

pub fn extract_reviews(html: &str, profile: &SiteProfile, ctx: &ExtractionContext) -> PageExtract {
    let doc = Html::parse_document(html);

    let cards = locate_cards(&doc, profile.cards);
    if cards.is_empty() && profile.jsonld_fallback {
        let (located, raws) = jsonld_reviews(&doc, ctx);
        return PageExtract {
            cards_seen: located,
            raws,
        };
    }

    let mut raws = Vec::new();
    for card in &cards {
        let date_iso = extract_date(card, profile);
        if !dates::in_range(
            date_iso.as_deref(),
            ctx.start_date.as_deref(),
            ctx.end_date.as_deref(),
        ) {
            continue;
        }
        raws.push(RawReview {
            source: Some(profile.source),
            company_name: Some(ctx.company_name.clone()),
            title: first_grab(card, profile.title),
            review_text: first_grab(card, profile.body),
            date: date_iso,
            rating: extract_rating(card, profile),
            reviewer_name: first_grab(card, profile.reviewer),
            ..Default::default()
        });
    }
    PageExtract {
        cards_seen: cards.len(),
        raws,
    }
}

/// First card query with at least one match wins; later queries are not tried.
fn locate_cards<'a>(doc: &'a Html, chains: &[&str]) -> Vec<ElementRef<'a>> {
    for q in chains {
        if let Ok(sel) = Selector::parse(q) {
            let found: Vec<_> = doc.select(&sel).collect();
            if !found.is_empty() {
                return found;
            }
        }
    }
    Vec::new()
}

fn grab(el: &ElementRef<'_>, g: &Grab) -> Option<String> {
    match g {
        Grab::Text(q) => {
            let sel = Selector::parse(q).ok()?;
            let hit = el.select(&sel).next()?;
            clean_text(&hit.text().collect::<String>())
        }
        Grab::Attr(q, attr) => {
            let sel = Selector::parse(q).ok()?;
            let hit = el.select(&sel).next()?;
            clean_text(hit.value().attr(attr)?)
        }
    }
}

fn first_grab(el: &ElementRef<'_>, grabs: &[Grab]) -> Option<String> {
    grabs.iter().find_map(|g| grab(el, g))
}

fn clean_text(raw: &str) -> Option<String> {
    let v = WHITESPACE.replace_all(raw, " ").trim().to_string();
    if v.is_empty() {
        None
    } else {
        Some(v)
    }
}

/// Each date location is tried through the normalizer; first parse wins.
fn extract_date(card: &ElementRef<'_>, profile: &SiteProfile) -> Option<String> {
    profile
        .date
        .iter()
        .find_map(|g| grab(card, g).and_then(|raw| dates::normalize(&raw, Utc::now())))
}

fn extract_rating(card: &ElementRef<'_>, profile: &SiteProfile) -> Option<String> {
    for g in profile.rating {
        if let Some(v) = grab(card, g) {
            if let Some(c) = LEADING_NUMBER.captures(&v) {
                return Some(c[1].to_string());
            }
        }
    }
    for q in profile.star_count {
        if let Ok(sel) = Selector::parse(q) {
            let filled = card.select(&sel).count();
            if filled > 0 {
                return Some(filled.to_string());
            }
        }
    }
    None
}

/* ------------ JSON-LD fallback ------------ */

/// Returns (review objects located, in-window records). The located count
/// is pre-filter, matching what `locate_cards` reports for DOM cards, so an
/// all-out-of-window page does not read as an exhausted listing.
fn jsonld_reviews(doc: &Html, ctx: &ExtractionContext) -> (usize, Vec<RawReview>) {
    let mut located = 0;
    let mut out = Vec::new();
    for script in doc.select(&JSONLD_SELECTOR) {
        let Some(txt) = script.text().next() else {
            continue;
        };
        let Some(vals) = parse_jsonld_block(txt) else {
            continue;
        };
        for obj in &vals {
            let Some(map) = obj.as_object() else { continue };
            let ty = map.get("@type").and_then(Value::as_str).unwrap_or("");

            let mut reviews: Vec<&Value> = Vec::new();
            if ty == "Review" {
                reviews.push(obj);
            } else if ty == "Product" || ty == "SoftwareApplication" {
                if let Some(r) = map.get("review").or_else(|| map.get("reviews")) {
                    match r {
                        Value::Array(items) => reviews.extend(items.iter()),
                        Value::Object(_) => reviews.push(r),
                        _ => {}
                    }
                }
            }

            for r in reviews {
                located += 1;
                if let Some(raw) = jsonld_review_record(r, ctx) {
                    if dates::in_range(
                        raw.date.as_deref(),
                        ctx.start_date.as_deref(),
                        ctx.end_date.as_deref(),
                    ) {
                        out.push(raw);
                    }
                }
            }
        }
    }
    (located, out)
}

fn jsonld_review_record(review: &Value, ctx: &ExtractionContext) -> Option<RawReview> {
    let map = review.as_object()?;

    let date_iso = ["datePublished", "dateCreated", "date"]
        .iter()
        .find_map(|k| map.get(*k).and_then(Value::as_str))
        .and_then(|d| dates::normalize(d, Utc::now()));

    let body = map
        .get("reviewBody")
        .or_else(|| map.get("description"))
        .and_then(Value::as_str)?;

    let title = map
        .get("headline")
        .or_else(|| map.get("name"))
        .and_then(Value::as_str)
        .map(str::to_string);

    let rating = map
        .get("reviewRating")
        .or_else(|| map.get("aggregateRating"))
        .and_then(Value::as_object)
        .and_then(|o| o.get("ratingValue"))
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        });

    let reviewer = match map.get("author") {
        Some(Value::Object(a)) => a.get("name").and_then(Value::as_str).map(str::to_string),
        Some(Value::String(s)) => Some(s.clone()),
        _ => None,
    };

    Some(RawReview {
        source: Some(ctx.source),
        company_name: Some(ctx.company_name.clone()),
        title,
        review_text: Some(body.to_string()),
        date: date_iso,
        rating,
        reviewer_name: reviewer,
        ..Default::default()
    })
}

fn parse_jsonld_block(txt: &str) -> Option<Vec<Value>> {
    let txt = txt.trim();
    if txt.is_empty() {
        return None;
    }
    if let Ok(v) = serde_json::from_str::<Value>(txt) {
        return Some(flatten_jsonld(v));
    }
    // Some pages emit bare comma-joined objects
    let bracketed = format!("[{}]", txt);
    if let Ok(v) = serde_json::from_str::<Value>(&bracketed) {
        return Some(flatten_jsonld(v));
    }
    None
}

fn flatten_jsonld(v: Value) -> Vec<Value> {
    let mut out = Vec::new();
    match v {
        Value::Array(arr) => {
            for it in arr {
                out.extend(flatten_jsonld(it));
            }
        }
        Value::Object(mut obj) => {
            if let Some(graph) = obj.remove("@graph") {
                out.extend(flatten_jsonld(graph));
                if !obj.is_empty() {
                    out.push(Value::Object(obj));
                }
            } else {
                out.push(Value::Object(obj));
            }
        }
        other => out.push(other),
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{adapter_for, SiteAdapter};
    use crate::types::Source;

    fn ctx(source: Source, start: Option<&str>, end: Option<&str>) -> ExtractionContext {
        ExtractionContext {
            source,
            company_name: "Acme".into(),
            start_date: start.map(String::from),
            end_date: end.map(String::from),
            max_pages: None,
            page: 1,
        }
    }

    fn g2_card(date: &str, body: &str) -> String {
        format!(
            r#"<div itemprop="review">
                 <meta itemprop="datePublished" content="{date}">
                 <h3>Great tool</h3>
                 <div itemprop="reviewBody">{body}</div>
                 <span itemprop="author">Ann Example</span>
                 <meta itemprop="ratingValue" content="4.5">
               </div>"#
        )
    }

    #[test]
    fn extracts_fields_from_microdata_card() {
        let html = format!("<html><body>{}</body></html>", g2_card("2024-01-01", "Love it"));
        let profile = adapter_for(Source::G2).profile();
        let page = extract_reviews(&html, profile, &ctx(Source::G2, None, None));

        assert_eq!(page.cards_seen, 1);
        let raw = &page.raws[0];
        assert_eq!(raw.source, Some(Source::G2));
        assert_eq!(raw.title.as_deref(), Some("Great tool"));
        assert_eq!(raw.review_text.as_deref(), Some("Love it"));
        assert_eq!(raw.date.as_deref(), Some("2024-01-01"));
        assert_eq!(raw.rating.as_deref(), Some("4.5"));
        assert_eq!(raw.reviewer_name.as_deref(), Some("Ann Example"));
    }

    #[test]
    fn date_window_filters_cards_in_order() {
        let html = format!(
            "<html><body>{}{}{}</body></html>",
            g2_card("2024-01-01", "first"),
            g2_card("2024-03-01", "second"),
            g2_card("2023-12-31", "too old"),
        );
        let profile = adapter_for(Source::G2).profile();
        let page = extract_reviews(
            &html,
            profile,
            &ctx(Source::G2, Some("2024-01-01"), Some("2024-12-31")),
        );

        assert_eq!(page.cards_seen, 3);
        let bodies: Vec<_> = page
            .raws
            .iter()
            .map(|r| r.review_text.as_deref().unwrap())
            .collect();
        assert_eq!(bodies, vec!["first", "second"]);
    }

    #[test]
    fn rating_falls_back_to_aria_label_then_stars() {
        let labeled = r#"<html><body>
            <article data-service-review-card-paper>
              <time datetime="2024-05-05T10:00:00Z">May 5</time>
              <p>Labeled body text</p>
              <div aria-label="4.2 out of 5 stars"></div>
            </article>
        </body></html>"#;
        let starred = r#"<html><body>
            <article data-service-review-card-paper>
              <time datetime="2024-05-05T10:00:00Z">May 5</time>
              <p>Starred body text</p>
              <span class="star filled"></span><span class="star filled"></span>
              <span class="star filled"></span><span class="star empty"></span>
            </article>
        </body></html>"#;
        let profile = adapter_for(Source::Trustpilot).profile();
        let context = ctx(Source::Trustpilot, None, None);

        let page = extract_reviews(labeled, profile, &context);
        assert_eq!(page.raws[0].rating.as_deref(), Some("4.2"));

        let page = extract_reviews(starred, profile, &context);
        assert_eq!(page.raws[0].rating.as_deref(), Some("3"));
    }

    #[test]
    fn detection_chain_validates_pages() {
        let profile = adapter_for(Source::Trustpilot).profile();
        let listing = r#"<html><body><article data-service-review-card-paper></article></body></html>"#;
        let landing = r#"<html><body><h1>Welcome</h1></body></html>"#;
        assert!(page_matches(listing, profile.detection));
        assert!(!page_matches(landing, profile.detection));
    }

    #[test]
    fn capterra_jsonld_fallback_reads_product_reviews() {
        let html = r#"<html><body>
            <script type="application/ld+json">
            {
              "@type": "SoftwareApplication",
              "name": "Acme",
              "review": [
                {
                  "@type": "Review",
                  "headline": "Solid",
                  "reviewBody": "Does the job",
                  "datePublished": "2024-02-02",
                  "reviewRating": {"ratingValue": 4},
                  "author": {"name": "Bob"}
                },
                {
                  "@type": "Review",
                  "reviewBody": "Old one",
                  "datePublished": "2020-01-01",
                  "author": "Carol"
                }
              ]
            }
            </script>
        </body></html>"#;
        let profile = adapter_for(Source::Capterra).profile();
        let page = extract_reviews(
            html,
            profile,
            &ctx(Source::Capterra, Some("2024-01-01"), Some("2024-12-31")),
        );

        assert_eq!(page.cards_seen, 2);
        assert_eq!(page.raws.len(), 1);
        let raw = &page.raws[0];
        assert_eq!(raw.title.as_deref(), Some("Solid"));
        assert_eq!(raw.review_text.as_deref(), Some("Does the job"));
        assert_eq!(raw.date.as_deref(), Some("2024-02-02"));
        assert_eq!(raw.rating.as_deref(), Some("4"));
        assert_eq!(raw.reviewer_name.as_deref(), Some("Bob"));
    }

    #[test]
    fn jsonld_cards_count_before_date_filtering() {
        let html = r#"<html><body>
            <script type="application/ld+json">
            {"@type": "Review", "reviewBody": "Too new",
             "datePublished": "2025-05-05"}
            </script>
        </body></html>"#;
        let profile = adapter_for(Source::Capterra).profile();
        let page = extract_reviews(
            html,
            profile,
            &ctx(Source::Capterra, Some("2024-01-01"), Some("2024-12-31")),
        );
        assert_eq!(page.cards_seen, 1);
        assert!(page.raws.is_empty());
    }

    #[test]
    fn jsonld_graph_wrapper_is_flattened() {
        let html = r#"<html><body>
            <script type="application/ld+json">
            {"@graph": [{"@type": "Review", "reviewBody": "Nested",
                         "datePublished": "2024-03-03"}]}
            </script>
        </body></html>"#;
        let profile = adapter_for(Source::Capterra).profile();
        let page = extract_reviews(html, profile, &ctx(Source::Capterra, None, None));
        assert_eq!(page.raws.len(), 1);
        assert_eq!(page.raws[0].review_text.as_deref(), Some("Nested"));
    }

    #[test]
    fn dateless_cards_are_excluded() {
        let html = r#"<html><body>
            <div itemprop="review">
              <div itemprop="reviewBody">No date on this one</div>
            </div>
        </body></html>"#;
        let profile = adapter_for(Source::G2).profile();
        let page = extract_reviews(html, profile, &ctx(Source::G2, None, None));
        assert_eq!(page.cards_seen, 1);
        assert!(page.raws.is_empty());
    }
}
