//! Site adapters: one data-driven selector profile per review-hosting site.
//!
//! All three sites share the same extraction shape; what differs is the
//! candidate URL templates and the selector tables. Adding a site means
//! adding a profile and a candidate resolver, not subclassing anything.

mod capterra;
mod g2;
mod trustpilot;

pub use capterra::Capterra;
pub use g2::G2;
pub use trustpilot::Trustpilot;

use crate::types::{RunRequest, Source};

/// One ordered attempt at pulling a field value out of a review card.
#[derive(Debug, Clone, Copy)]
pub enum Grab {
    /// Flattened text content of the first match.
    Text(&'static str),
    /// Named attribute of the first match.
    Attr(&'static str, &'static str),
}

/// Selector tables for one site, most specific entries first. The detection
/// chain doubles as page validation during probing; card and field chains
/// drive extraction; `next_page` entries each yield an href.
pub struct SiteProfile {
    pub source: Source,
    pub detection: &'static [&'static str],
    pub cards: &'static [&'static str],
    pub title: &'static [Grab],
    pub body: &'static [Grab],
    pub reviewer: &'static [Grab],
    pub date: &'static [Grab],
    pub rating: &'static [Grab],
    /// Counting filled star glyphs is the rating of last resort.
    pub star_count: &'static [&'static str],
    pub next_page: &'static [&'static str],
    /// Scan embedded JSON-LD blocks when no card selector matches.
    pub jsonld_fallback: bool,
}

pub trait SiteAdapter: Send + Sync {
    fn source(&self) -> Source;

    fn profile(&self) -> &'static SiteProfile;

    /// Ordered listing-page guesses, most likely first. An explicit product
    /// URL short-circuits template guessing. Every candidate carries the
    /// render flag.
    fn candidates(&self, req: &RunRequest) -> Vec<String>;
}

pub fn adapter_for(source: Source) -> &'static dyn SiteAdapter {
    match source {
        Source::G2 => &G2,
        Source::Capterra => &Capterra,
        Source::Trustpilot => &Trustpilot,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(source: Source) -> RunRequest {
        RunRequest {
            source,
            company_name: "Acme Widgets".into(),
            start_date: None,
            end_date: None,
            product_url: None,
            product_slug: None,
            max_pages: None,
        }
    }

    #[test]
    fn every_adapter_renders_its_candidates() {
        for source in [Source::G2, Source::Capterra, Source::Trustpilot] {
            let adapter = adapter_for(source);
            assert_eq!(adapter.source(), source);
            let candidates = adapter.candidates(&request(source));
            assert!(!candidates.is_empty());
            for url in &candidates {
                assert!(url.contains("render_js=true"), "missing render flag: {url}");
                assert!(url.contains("acme-widgets"), "missing slug: {url}");
            }
        }
    }

    #[test]
    fn explicit_product_url_is_sole_g2_candidate() {
        let mut req = request(Source::G2);
        req.product_url = Some("https://www.g2.com/products/acme/reviews".into());
        let candidates = adapter_for(Source::G2).candidates(&req);
        assert_eq!(
            candidates,
            vec!["https://www.g2.com/products/acme/reviews?render_js=true".to_string()]
        );
    }

    #[test]
    fn slug_override_beats_company_name() {
        let mut req = request(Source::G2);
        req.product_slug = Some("acme-hq".into());
        let candidates = adapter_for(Source::G2).candidates(&req);
        assert!(candidates.iter().all(|u| u.contains("/products/acme-hq/")));
    }
}
