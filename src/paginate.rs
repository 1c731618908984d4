//! Next listing-page derivation.

use scraper::{Html, Selector};

use crate::urls;

/// Explicit next link first (resolved against the current page URL), then a
/// `page` query-parameter bump. `None` means pagination is exhausted: no
/// link and no parameter to increment.
pub fn next_page_url(current_url: &str, html: &str, next_selectors: &[&str]) -> Option<String> {
    let doc = Html::parse_document(html);
    for q in next_selectors {
        if let Ok(sel) = Selector::parse(q) {
            if let Some(href) = doc.select(&sel).next().and_then(|el| el.value().attr("href")) {
                if let Some(abs) = urls::resolve(current_url, href) {
                    return Some(abs);
                }
            }
        }
    }
    urls::increment_page_param(current_url)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NEXT_SELECTORS: &[&str] = &[r#"a[rel="next"]"#, ".pagination-next"];

    #[test]
    fn explicit_next_link_wins_and_resolves() {
        let html = r#"<html><body>
            <a rel="next" href="/products/acme/reviews?page=2">Next</a>
        </body></html>"#;
        let next = next_page_url("https://example.com/products/acme/reviews?page=1", html, NEXT_SELECTORS);
        assert_eq!(
            next.unwrap(),
            "https://example.com/products/acme/reviews?page=2"
        );
    }

    #[test]
    fn falls_back_to_page_param_increment() {
        let html = "<html><body><p>no pagination markup</p></body></html>";
        let next = next_page_url("https://example.com/r?render_js=true&page=2", html, NEXT_SELECTORS);
        assert_eq!(next.unwrap(), "https://example.com/r?render_js=true&page=3");
    }

    #[test]
    fn no_link_and_no_page_param_terminates() {
        let html = "<html><body><p>last page</p></body></html>";
        assert_eq!(
            next_page_url("https://example.com/r?render_js=true", html, NEXT_SELECTORS),
            None
        );
    }
}
