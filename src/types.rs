use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::RevcrawlError;

/// A supported review-hosting site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    G2,
    Capterra,
    Trustpilot,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::G2 => "g2",
            Source::Capterra => "capterra",
            Source::Trustpilot => "trustpilot",
        }
    }

    /// Infer a source from a URL's domain.
    pub fn from_url(url: &str) -> Option<Source> {
        if url.contains("g2.com") {
            Some(Source::G2)
        } else if url.contains("capterra.com") {
            Some(Source::Capterra)
        } else if url.contains("trustpilot.com") {
            Some(Source::Trustpilot)
        } else {
            None
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = RevcrawlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "g2" => Ok(Source::G2),
            "capterra" => Ok(Source::Capterra),
            "trustpilot" => Ok(Source::Trustpilot),
            other => Err(RevcrawlError::UnsupportedSource(other.to_string())),
        }
    }
}

/// Canonical unit of output. Every emitted record has a non-empty body and a
/// `YYYY-MM-DD` date; within one run no two records share an identity key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub source: Source,
    pub company_name: String,
    pub title: String,
    pub review_text: String,
    pub date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewer_name: Option<String>,
    pub scraped_at: DateTime<Utc>,
}

/// Field bag emitted by extractors before normalization. Alternate field
/// names (`product_name`, `review_title`, `review_date`) carry values the
/// pipeline backfills from.
#[derive(Debug, Clone, Default)]
pub struct RawReview {
    pub source: Option<Source>,
    pub company_name: Option<String>,
    pub product_name: Option<String>,
    pub product_url: Option<String>,
    pub title: Option<String>,
    pub review_title: Option<String>,
    pub review_text: Option<String>,
    pub date: Option<String>,
    pub review_date: Option<String>,
    pub rating: Option<String>,
    pub reviewer_name: Option<String>,
}

/// Caller input for one source-run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub source: Source,
    pub company_name: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub product_url: Option<String>,
    pub product_slug: Option<String>,
    pub max_pages: Option<u32>,
}

/// Validated per-run state threaded through probing, extraction and
/// pagination. Date bounds are canonical `YYYY-MM-DD`, inclusive.
#[derive(Debug, Clone)]
pub struct ExtractionContext {
    pub source: Source,
    pub company_name: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub max_pages: Option<u32>,
    pub page: u32,
}

/// One fetch the engine asks the external fetch layer to perform.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    /// Ask the rendering proxy to execute client-side script first.
    pub render_js: bool,
    pub wait_ms: u64,
}

#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    /// Final page URL after redirects; pagination resolves against it.
    pub url: String,
    pub body: String,
}

impl FetchResponse {
    pub fn is_error(&self) -> bool {
        self.status >= 400
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_round_trips_through_str() {
        for s in [Source::G2, Source::Capterra, Source::Trustpilot] {
            assert_eq!(s.as_str().parse::<Source>().unwrap(), s);
        }
    }

    #[test]
    fn source_rejects_unknown_names() {
        let err = "yelp".parse::<Source>().unwrap_err();
        assert!(err.to_string().contains("unsupported source"));
    }

    #[test]
    fn source_inferred_from_url_domain() {
        assert_eq!(
            Source::from_url("https://www.g2.com/products/acme/reviews"),
            Some(Source::G2)
        );
        assert_eq!(
            Source::from_url("https://www.trustpilot.com/review/acme.com"),
            Some(Source::Trustpilot)
        );
        assert_eq!(Source::from_url("https://example.com"), None);
    }

    #[test]
    fn source_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Source::Capterra).unwrap(), "\"capterra\"");
    }
}
