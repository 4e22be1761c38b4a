//! Contact-page link discovery.

use scraper::{Html, Selector};
use url::Url;

const LINK_TEXT_HINTS: &[&str] = &["contact", "get in touch", "reach out"];
const HREF_HINTS: &[&str] = &["contact", "about"];
const SKIPPED_SCHEMES: &[&str] = &["mailto:", "tel:", "javascript:", "#"];

/// Resolve `href` against the scheme and host of `base`.
///
/// Absolute `http(s)` links are kept; `/path` and `path` both resolve
/// from the site root.
pub fn resolve_url(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    if href.starts_with("http://") || href.starts_with("https://") {
        return Url::parse(href).ok();
    }

    let host = base.host_str()?;
    let origin = match base.port() {
        Some(port) => format!("{}://{host}:{port}", base.scheme()),
        None => format!("{}://{host}", base.scheme()),
    };
    let path = href.trim_start_matches('/');
    Url::parse(&format!("{origin}/{path}")).ok()
}

/// First link on the page that looks like a contact or about page.
pub fn find_contact_link(html: &str, base: &Url) -> Option<Url> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("a[href]").ok()?;

    document.select(&selector).find_map(|anchor| {
        let href = anchor.value().attr("href")?;
        let href_lower = href.trim().to_lowercase();
        if SKIPPED_SCHEMES.iter().any(|s| href_lower.starts_with(s)) {
            return None;
        }

        let text = anchor.text().collect::<String>().to_lowercase();
        let looks_like_contact = LINK_TEXT_HINTS.iter().any(|h| text.contains(h))
            || HREF_HINTS.iter().any(|h| href_lower.contains(h));
        if !looks_like_contact {
            return None;
        }

        resolve_url(base, href).filter(|url| url != base)
    })
}
