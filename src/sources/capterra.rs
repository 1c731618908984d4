use super::{Grab, SiteAdapter, SiteProfile};
use crate::slug::slugify;
use crate::types::{RunRequest, Source};
use crate::urls::ensure_render_flag;

// Class-name heuristics at the tail match the utility-class markup Capterra
// shipped after dropping semantic review attributes.
const DETECTION: &[&str] = &[
    r#"[itemprop="review"]"#,
    r#"article[data-test*="review"]"#,
    r#"div[data-test*="review"]"#,
    r#"section[data-test*="review"]"#,
    r#"article[class*="review"]"#,
    r#"div[class*="review-card"]"#,
    r#"div[class*="review"]"#,
    "div.p-6.space-y-4",
    "div.p-6.space-y-8",
    r#"div[class*="p-6"][class*="space-y-"]"#,
];

static PROFILE: SiteProfile = SiteProfile {
    source: Source::Capterra,
    detection: DETECTION,
    cards: DETECTION,
    title: &[
        Grab::Text(r#"[data-test="review-title"]"#),
        Grab::Text("h3"),
        Grab::Text("h2"),
        Grab::Text("header h3"),
    ],
    body: &[
        Grab::Text(r#"[itemprop="reviewBody"]"#),
        Grab::Text(".review-text"),
        Grab::Text(".review-content"),
        Grab::Text(r#"[data-test="review-body"]"#),
        Grab::Text("p"),
    ],
    reviewer: &[
        Grab::Attr(r#"[itemprop="author"] [itemprop="name"]"#, "content"),
        Grab::Text(r#"[itemprop="author"]"#),
        Grab::Text(".reviewer-name"),
        Grab::Text(".author-name"),
        Grab::Text(r#"[data-test="reviewer-name"]"#),
    ],
    date: &[
        Grab::Attr(r#"meta[itemprop="datePublished"]"#, "content"),
        Grab::Attr("time", "datetime"),
        Grab::Text(".review-date"),
        Grab::Text(r#"[data-test*="date"]"#),
        Grab::Text("span.ms-2"),
        Grab::Text("time"),
    ],
    rating: &[
        Grab::Attr(r#"meta[itemprop="ratingValue"]"#, "content"),
        Grab::Attr(r#"[itemprop="reviewRating"]"#, "content"),
        Grab::Attr(r#"[aria-label*="out of 5"]"#, "aria-label"),
        Grab::Attr("[data-star-rating]", "data-star-rating"),
        Grab::Text(r#"[class*="rating"]"#),
        Grab::Text(".stars"),
    ],
    star_count: &[
        r#"[class*="star"][class*="filled"]"#,
        r#"[class*="star"][aria-hidden="false"]"#,
    ],
    next_page: &[
        r#"a[rel="next"]"#,
        r#"a[aria-label="Next"]"#,
        ".pagination .next a",
        ".pagination-next",
    ],
    jsonld_fallback: true,
};

pub struct Capterra;

impl SiteAdapter for Capterra {
    fn source(&self) -> Source {
        Source::Capterra
    }

    fn profile(&self) -> &'static SiteProfile {
        &PROFILE
    }

    fn candidates(&self, req: &RunRequest) -> Vec<String> {
        if let Some(url) = &req.product_url {
            let mut variants = vec![url.clone()];
            if !url.contains("/reviews") {
                let base = url.trim_end_matches('/');
                variants.push(format!("{base}/reviews"));
                variants.push(format!("{base}/reviews/"));
            }
            return variants.iter().map(|u| ensure_render_flag(u)).collect();
        }

        let raw = req
            .product_slug
            .clone()
            .unwrap_or_else(|| req.company_name.clone());
        let raw = raw.trim();

        // A slash-containing numeric identifier is a literal /p/ path
        // segment (Capterra product ids), not something to re-slugify.
        let mut path = None;
        let mut name_slug = None;
        if raw.contains('/') && raw.chars().any(|c| c.is_ascii_digit()) {
            path = Some(raw.trim_matches(|c| c == '/' || c == ' ').to_string());
        } else if !raw.is_empty() && raw.chars().all(|c| c.is_ascii_digit()) {
            path = Some(raw.to_string());
        } else {
            name_slug = Some(slugify(raw));
        }

        let mut base = Vec::new();
        if let Some(slug) = &name_slug {
            base.push(format!("https://www.capterra.com/reviews/{slug}/"));
            base.push(format!("https://www.capterra.com/reviews/{slug}"));
            base.push(format!("https://www.capterra.com/{slug}/reviews/"));
            base.push(format!("https://www.capterra.com/{slug}/"));
        }
        if let Some(path) = &path {
            base.push(format!("https://www.capterra.com/p/{path}/reviews/"));
            base.push(format!("https://www.capterra.com/p/{path}/"));
        }
        if path.is_none() {
            if let Some(slug) = &name_slug {
                base.push(format!("https://www.capterra.com/p/{slug}/reviews/"));
                base.push(format!("https://www.capterra.com/p/{slug}/"));
            }
        }
        base.iter().map(|u| ensure_render_flag(u)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> RunRequest {
        RunRequest {
            source: Source::Capterra,
            company_name: "Acme".into(),
            start_date: None,
            end_date: None,
            product_url: None,
            product_slug: None,
            max_pages: None,
        }
    }

    #[test]
    fn name_yields_reviews_templates_then_p_fallbacks() {
        let candidates = Capterra.candidates(&request());
        assert_eq!(candidates.len(), 6);
        assert!(candidates[0].starts_with("https://www.capterra.com/reviews/acme/?"));
        assert!(candidates[4].starts_with("https://www.capterra.com/p/acme/reviews/?"));
    }

    #[test]
    fn numeric_path_identifier_is_kept_literal() {
        let mut req = request();
        req.product_slug = Some("/189532/acme/".into());
        let candidates = Capterra.candidates(&req);
        assert_eq!(candidates.len(), 2);
        assert!(candidates[0].starts_with("https://www.capterra.com/p/189532/acme/reviews/?"));
    }

    #[test]
    fn product_url_without_reviews_segment_gains_variants() {
        let mut req = request();
        req.product_url = Some("https://www.capterra.com/p/189532/acme/".into());
        let candidates = Capterra.candidates(&req);
        assert_eq!(candidates.len(), 3);
        assert!(candidates[1].contains("/reviews?"));
    }

    #[test]
    fn product_url_with_reviews_segment_stays_sole_candidate() {
        let mut req = request();
        req.product_url = Some("https://www.capterra.com/p/189532/acme/reviews/".into());
        assert_eq!(Capterra.candidates(&req).len(), 1);
    }
}
