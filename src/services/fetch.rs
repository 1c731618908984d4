//! HTTP fetching with polite pacing, browser-shaped headers, bounded
//! retries and optional routing through a JS-rendering proxy.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, CONNECTION, USER_AGENT};
use std::collections::HashMap;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

use crate::engine::Fetcher;
use crate::error::{Result, RevcrawlError};
use crate::types::{FetchRequest, FetchResponse};

/// Statuses worth another attempt. 403 is included because rendering
/// proxies frequently clear bot checks on a later pass.
const RETRY_STATUS: &[u16] = &[408, 429, 403, 500, 502, 503, 504];

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
];

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub timeout_ms: u64,
    /// Minimum spacing between requests to the same host.
    pub delay_ms: u64,
    /// Extra random spacing on top of `delay_ms`.
    pub jitter_ms: u64,
    pub max_retries: u32,
    pub proxy_url: Option<String>,
    pub proxy_api_key: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 20_000,
            delay_ms: 1_000,
            jitter_ms: 2_000,
            max_retries: 3,
            proxy_url: None,
            proxy_api_key: None,
        }
    }
}

impl FetchConfig {
    /// Proxy settings come from the environment so credentials stay out of
    /// the command line.
    pub fn from_env() -> Self {
        Self {
            proxy_url: std::env::var("REVCRAWL_PROXY_URL").ok().filter(|s| !s.is_empty()),
            proxy_api_key: std::env::var("REVCRAWL_PROXY_API_KEY").ok().filter(|s| !s.is_empty()),
            ..Self::default()
        }
    }
}

pub struct ReqwestFetcher {
    client: reqwest::Client,
    cfg: FetchConfig,
    last_request: Mutex<HashMap<String, Instant>>,
}

impl ReqwestFetcher {
    pub fn new(cfg: FetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .redirect(reqwest::redirect::Policy::limited(10))
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(|e| RevcrawlError::Fetch {
                url: String::new(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            client,
            cfg,
            last_request: Mutex::new(HashMap::new()),
        })
    }

    /// Target host of the logical request, never the proxy host, so pacing
    /// follows the site being scraped.
    async fn pace(&self, url: &str) {
        let host = Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default();
        let wait = {
            let last = self.last_request.lock().await;
            last.get(&host).map(|at| {
                let spacing = Duration::from_millis(self.cfg.delay_ms + jitter_ms(self.cfg.jitter_ms));
                spacing.saturating_sub(at.elapsed())
            })
        };
        if let Some(wait) = wait {
            if !wait.is_zero() {
                debug!(host = %host, wait_ms = wait.as_millis() as u64, "pacing request");
                tokio::time::sleep(wait).await;
            }
        }
        self.last_request.lock().await.insert(host, Instant::now());
    }

    /// Wrap the target URL in a proxy call when rendering is requested and
    /// a proxy is configured; otherwise hit the target directly.
    fn request_url(&self, req: &FetchRequest) -> String {
        if !req.render_js {
            return req.url.clone();
        }
        let (Some(proxy), Some(key)) = (&self.cfg.proxy_url, &self.cfg.proxy_api_key) else {
            return req.url.clone();
        };
        let wait = req.wait_ms.to_string();
        match Url::parse_with_params(
            proxy,
            [
                ("api_key", key.as_str()),
                ("url", req.url.as_str()),
                ("render_js", "true"),
                ("wait", wait.as_str()),
            ],
        ) {
            Ok(u) => u.to_string(),
            Err(_) => req.url.clone(),
        }
    }

    async fn try_once(&self, req: &FetchRequest) -> Result<FetchResponse> {
        let target = self.request_url(req);
        let response = self
            .client
            .get(&target)
            .headers(default_headers(pick_user_agent()))
            .send()
            .await?;
        let status = response.status().as_u16();
        let url = response.url().to_string();
        let body = response.text().await?;
        Ok(FetchResponse { status, url, body })
    }
}

#[async_trait]
impl Fetcher for ReqwestFetcher {
    fn name(&self) -> &'static str {
        "reqwest"
    }

    /// Error statuses are returned to the caller, not converted to `Err`;
    /// the prober treats them as signal. Only transport failures that
    /// survive all retries become errors.
    async fn fetch(&self, req: &FetchRequest) -> Result<FetchResponse> {
        let mut attempt = 0;
        loop {
            self.pace(&req.url).await;
            match self.try_once(req).await {
                Ok(resp) if RETRY_STATUS.contains(&resp.status) && attempt < self.cfg.max_retries => {
                    attempt += 1;
                    warn!(status = resp.status, attempt, url = %req.url, "retryable status");
                }
                Ok(mut resp) => {
                    // Report the logical URL when the proxy answered.
                    if self.cfg.proxy_url.is_some() && req.render_js {
                        resp.url = req.url.clone();
                    }
                    return Ok(resp);
                }
                Err(e) if attempt < self.cfg.max_retries => {
                    attempt += 1;
                    warn!(error = %e, attempt, url = %req.url, "fetch attempt failed");
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn default_headers(ua: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_str(ua).unwrap_or(HeaderValue::from_static("Mozilla/5.0")));
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
    headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip, deflate, br"));
    headers.insert(HeaderName::from_static("dnt"), HeaderValue::from_static("1"));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(
        HeaderName::from_static("upgrade-insecure-requests"),
        HeaderValue::from_static("1"),
    );
    headers
}

fn pick_user_agent() -> &'static str {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as usize)
        .unwrap_or(0);
    USER_AGENTS[nanos % USER_AGENTS.len()]
}

fn jitter_ms(range: u64) -> u64 {
    if range == 0 {
        return 0;
    }
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    (now.subsec_nanos() as u64 ^ ((now.as_micros() as u64) << 5)) % range
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jitter_stays_in_range() {
        for _ in 0..100 {
            assert!(jitter_ms(2_000) < 2_000);
        }
        assert_eq!(jitter_ms(0), 0);
    }

    #[test]
    fn render_requests_route_through_the_proxy() {
        let fetcher = ReqwestFetcher::new(FetchConfig {
            proxy_url: Some("https://proxy.example.com/v1/".into()),
            proxy_api_key: Some("k3y".into()),
            ..FetchConfig::default()
        })
        .unwrap();
        let wrapped = fetcher.request_url(&FetchRequest {
            url: "https://www.g2.com/products/acme/reviews?page=1".into(),
            render_js: true,
            wait_ms: 4_000,
        });
        assert!(wrapped.starts_with("https://proxy.example.com/v1/?api_key=k3y"));
        assert!(wrapped.contains("render_js=true"));
        assert!(wrapped.contains("wait=4000"));
        assert!(wrapped.contains("url=https%3A%2F%2Fwww.g2.com"));
    }

    #[test]
    fn unrendered_or_unproxied_requests_hit_the_target() {
        let fetcher = ReqwestFetcher::new(FetchConfig::default()).unwrap();
        let direct = fetcher.request_url(&FetchRequest {
            url: "https://www.g2.com/products/acme/reviews".into(),
            render_js: true,
            wait_ms: 4_000,
        });
        assert_eq!(direct, "https://www.g2.com/products/acme/reviews");
    }

    #[test]
    fn every_user_agent_is_a_desktop_browser() {
        for ua in USER_AGENTS {
            assert!(ua.starts_with("Mozilla/5.0"));
        }
    }
}
