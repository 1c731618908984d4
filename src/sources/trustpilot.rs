use super::{Grab, SiteAdapter, SiteProfile};
use crate::slug::slugify;
use crate::types::{RunRequest, Source};
use crate::urls::ensure_render_flag;
use url::Url;

const DETECTION: &[&str] = &[
    "article[data-service-review-card-paper]",
    "article[data-service-review-card]",
    "article.review-card",
    r#"[itemprop="review"]"#,
    "[data-review-type]",
];

static PROFILE: SiteProfile = SiteProfile {
    source: Source::Trustpilot,
    detection: DETECTION,
    cards: DETECTION,
    title: &[
        Grab::Text("a[data-review-title-link]"),
        Grab::Text("h2"),
        Grab::Text("h3"),
    ],
    body: &[
        Grab::Text(r#"[itemprop="reviewBody"]"#),
        Grab::Text("[data-service-review-text-typography]"),
        Grab::Text("[data-review-content-translation]"),
        Grab::Text(".review-content"),
        Grab::Text("p"),
    ],
    reviewer: &[
        Grab::Text("[data-consumer-name]"),
        Grab::Text(r#"span[class*="consumerName"]"#),
        Grab::Text(r#"[itemprop="author"]"#),
    ],
    date: &[
        Grab::Attr("time", "datetime"),
        Grab::Attr(r#"meta[itemprop="datePublished"]"#, "content"),
        Grab::Attr("[data-service-review-date-time-ago]", "datetime"),
        Grab::Text(".review-date"),
        Grab::Text("time"),
    ],
    rating: &[
        Grab::Attr(r#"meta[itemprop="ratingValue"]"#, "content"),
        Grab::Attr("[data-service-review-rating]", "data-service-review-rating"),
        Grab::Attr(r#"[aria-label*="out of 5"]"#, "aria-label"),
        Grab::Attr(r#"img[alt*="out of 5"]"#, "alt"),
    ],
    star_count: &[
        r#"[class*="star"][class*="filled"]"#,
        r#"[data-star="filled"]"#,
    ],
    next_page: &[
        r#"a[aria-label="Next page"]"#,
        r#"a[name="pagination-button-next"]"#,
        r#"a[rel="next"]"#,
    ],
    jsonld_fallback: false,
};

pub struct Trustpilot;

impl SiteAdapter for Trustpilot {
    fn source(&self) -> Source {
        Source::Trustpilot
    }

    fn profile(&self) -> &'static SiteProfile {
        &PROFILE
    }

    fn candidates(&self, req: &RunRequest) -> Vec<String> {
        if let Some(url) = &req.product_url {
            return vec![ensure_render_flag(url)];
        }

        let raw = req
            .product_slug
            .clone()
            .unwrap_or_else(|| req.company_name.clone());
        let raw = raw.trim();

        // Trustpilot keys listings by domain; keep domain-looking input as-is.
        let domain = if raw.starts_with("http://") || raw.starts_with("https://") {
            Url::parse(raw)
                .ok()
                .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
                .unwrap_or_else(|| slugify(raw))
        } else if raw.contains('.') && !raw.contains(' ') {
            raw.to_lowercase().trim_matches('/').to_string()
        } else {
            slugify(raw)
        };

        [
            format!("https://www.trustpilot.com/review/{domain}"),
            format!("https://www.trustpilot.com/review/www.{domain}"),
            format!("https://www.trustpilot.com/review/{domain}/"),
        ]
        .iter()
        .map(|u| ensure_render_flag(u))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(company: &str) -> RunRequest {
        RunRequest {
            source: Source::Trustpilot,
            company_name: company.into(),
            start_date: None,
            end_date: None,
            product_url: None,
            product_slug: None,
            max_pages: None,
        }
    }

    #[test]
    fn company_name_is_slugified() {
        let candidates = Trustpilot.candidates(&request("Acme Widgets"));
        assert_eq!(candidates.len(), 3);
        assert!(candidates[0].starts_with("https://www.trustpilot.com/review/acme-widgets?"));
        assert!(candidates[1].contains("/review/www.acme-widgets?"));
    }

    #[test]
    fn domain_looking_input_is_kept_literal() {
        let candidates = Trustpilot.candidates(&request("Acme.com"));
        assert!(candidates[0].starts_with("https://www.trustpilot.com/review/acme.com?"));
    }

    #[test]
    fn url_input_reduces_to_its_host() {
        let candidates = Trustpilot.candidates(&request("https://www.acme.com/shop"));
        assert!(candidates[0].starts_with("https://www.trustpilot.com/review/www.acme.com?"));
    }
}
