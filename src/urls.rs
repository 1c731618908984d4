//! URL annotations shared by candidate resolution and pagination.

use url::Url;

pub const RENDER_PARAM: &str = "render_js";
pub const PAGE_PARAM: &str = "page";

/// Append `render_js=true` unless the URL already carries a render flag.
pub fn ensure_render_flag(url: &str) -> String {
    append_param_if_missing(url, RENDER_PARAM, "true")
}

/// Append `page=1` when missing so pagination can advance by parameter.
pub fn ensure_page_param(url: &str) -> String {
    append_param_if_missing(url, PAGE_PARAM, "1")
}

fn append_param_if_missing(url: &str, key: &str, value: &str) -> String {
    match Url::parse(url) {
        Ok(mut u) => {
            if u.query_pairs().any(|(k, _)| k == key) {
                return u.into();
            }
            u.query_pairs_mut().append_pair(key, value);
            u.into()
        }
        Err(_) => url.to_string(),
    }
}

/// Rewrite the `page` query parameter to its current value plus one,
/// preserving every other parameter. `None` when the URL has no `page`
/// parameter to increment, which ends pagination.
pub fn increment_page_param(url: &str) -> Option<String> {
    let u = Url::parse(url).ok()?;
    let pairs: Vec<(String, String)> = u
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    let current: u32 = pairs
        .iter()
        .find(|(k, _)| k == PAGE_PARAM)
        .map(|(_, v)| v.parse().unwrap_or(1))?;

    let mut next = u;
    {
        let mut qp = next.query_pairs_mut();
        qp.clear();
        for (k, v) in &pairs {
            if k == PAGE_PARAM {
                qp.append_pair(k, &(current + 1).to_string());
            } else {
                qp.append_pair(k, v);
            }
        }
    }
    Some(next.into())
}

/// Resolve a possibly relative href against the page it appeared on.
pub fn resolve(base: &str, href: &str) -> Option<String> {
    Url::parse(base).ok()?.join(href).ok().map(Into::into)
}
