use thiserror::Error;

pub type Result<T> = std::result::Result<T, RevcrawlError>;

#[derive(Debug, Error)]
pub enum RevcrawlError {
    /// Caller asked for a source this crate does not know.
    #[error("unsupported source: {0} (choose from: g2, capterra, trustpilot)")]
    UnsupportedSource(String),

    /// Caller supplied an inverted date window; the run must not start.
    #[error("invalid date range: start_date ({start}) > end_date ({end})")]
    InvalidDateRange { start: String, end: String },

    #[error("fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

/* Conversions so `?` works smoothly */
impl From<reqwest::Error> for RevcrawlError {
    fn from(e: reqwest::Error) -> Self {
        RevcrawlError::Fetch {
            url: e.url().map(|u| u.to_string()).unwrap_or_default(),
            reason: e.to_string(),
        }
    }
}
