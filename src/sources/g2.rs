use super::{Grab, SiteAdapter, SiteProfile};
use crate::slug::slugify;
use crate::types::{RunRequest, Source};
use crate::urls::ensure_render_flag;

const DETECTION: &[&str] = &[
    "article.elv-bg-neutral-0",
    r#"article[data-testid*="review"]"#,
    r#"article[class*="review"]"#,
    r#"section[data-testid*="review"]"#,
    r#"section[class*="review"]"#,
    r#"div[data-testid*="review"]"#,
    r#"div[class*="review-card"]"#,
    r#"[itemprop="review"]"#,
];

static PROFILE: SiteProfile = SiteProfile {
    source: Source::G2,
    detection: DETECTION,
    cards: DETECTION,
    title: &[
        Grab::Text(r#"[data-testid="review-title"]"#),
        Grab::Text("h3"),
        Grab::Text("h2"),
    ],
    body: &[
        Grab::Text(r#"[itemprop="reviewBody"]"#),
        Grab::Text(".review-text"),
        Grab::Text(".review-content"),
        Grab::Text("p"),
    ],
    reviewer: &[
        Grab::Attr(r#"[itemprop="author"] [itemprop="name"]"#, "content"),
        Grab::Text(r#"[itemprop="author"]"#),
        Grab::Text(".reviewer-name"),
        Grab::Text(".author-name"),
        Grab::Text(".user-name"),
    ],
    date: &[
        Grab::Attr(r#"meta[itemprop="datePublished"]"#, "content"),
        Grab::Attr("time", "datetime"),
        Grab::Text(".review-date"),
        Grab::Text(".date"),
        Grab::Text("time"),
    ],
    rating: &[
        Grab::Attr(r#"meta[itemprop="ratingValue"]"#, "content"),
        Grab::Attr(r#"[itemprop="reviewRating"]"#, "content"),
        Grab::Attr(r#"[aria-label*="out of 5"]"#, "aria-label"),
        Grab::Text(r#"[class*="rating"]"#),
        Grab::Text(".stars"),
    ],
    star_count: &[r#"[class*="star"][class*="filled"]"#],
    next_page: &[r#"a[rel="next"]"#, ".pagination .next a", ".pagination-next"],
    jsonld_fallback: false,
};

pub struct G2;

impl SiteAdapter for G2 {
    fn source(&self) -> Source {
        Source::G2
    }

    fn profile(&self) -> &'static SiteProfile {
        &PROFILE
    }

    fn candidates(&self, req: &RunRequest) -> Vec<String> {
        if let Some(url) = &req.product_url {
            return vec![ensure_render_flag(url)];
        }
        let slug = req
            .product_slug
            .clone()
            .unwrap_or_else(|| slugify(&req.company_name));
        [
            format!("https://www.g2.com/products/{slug}/reviews"),
            format!("https://www.g2.com/products/{slug}/reviews/"),
            format!("https://g2.com/products/{slug}/reviews"),
            format!("https://g2.com/products/{slug}/reviews/"),
        ]
        .iter()
        .map(|u| ensure_render_flag(u))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_template_candidates_in_priority_order() {
        let req = RunRequest {
            source: Source::G2,
            company_name: "Acme".into(),
            start_date: None,
            end_date: None,
            product_url: None,
            product_slug: None,
            max_pages: None,
        };
        let candidates = G2.candidates(&req);
        assert_eq!(candidates.len(), 4);
        assert!(candidates[0].starts_with("https://www.g2.com/products/acme/reviews?"));
        assert!(candidates[2].starts_with("https://g2.com/products/acme/reviews?"));
    }
}
