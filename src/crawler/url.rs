//! URL scoping and normalization for discovered links
//!
//! Links are kept only when they start with the crawl's base URL and are then
//! cut down to `scheme://host/segment1/segment2`, which keeps reviews, tabs and
//! other deep sub-pages of a product from being crawled as separate targets.

use url::Url;

/// Normalize a discovered URL to at most two path segments
///
/// # Returns
///
/// The normalized URL, or `None` when a deep URL has an empty first or second
/// path segment (e.g. `https://host//a/b`).
///
/// # Examples
///
/// ```
/// use clipscout::crawler::url::normalize_url;
///
/// assert_eq!(
///     normalize_url("https://www.tokopedia.com/shop/item/review/2").as_deref(),
///     Some("https://www.tokopedia.com/shop/item")
/// );
/// assert_eq!(
///     normalize_url("https://www.tokopedia.com/shop").as_deref(),
///     Some("https://www.tokopedia.com/shop")
/// );
/// ```
pub fn normalize_url(url: &str) -> Option<String> {
    let parts: Vec<&str> = url.split('/').collect();

    if parts.len() >= 5 && !parts[3].is_empty() && !parts[4].is_empty() {
        return Some(format!(
            "{}//{}{}/{}/{}",
            parts[0], parts[1], parts[2], parts[3], parts[4]
        ));
    }

    if parts.len() > 5 {
        return None;
    }

    Some(url.to_string())
}

/// Accepts links inside the crawl's base URL and normalizes them
#[derive(Debug, Clone)]
pub struct LinkScope {
    base: String,
}

impl LinkScope {
    /// Create a scope rooted at `base`, compared as a plain string prefix
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }

    /// Whether `href` is inside the crawl's domain
    #[must_use]
    pub fn contains(&self, href: &str) -> bool {
        href.starts_with(&self.base)
    }

    /// Scope-check and normalize an `href` attribute value
    pub fn accept(&self, href: &str) -> Option<String> {
        if !self.contains(href) {
            return None;
        }
        normalize_url(href).filter(|u| !u.is_empty())
    }
}

/// Derive the short domain label used for output file names
///
/// `https://www.tokopedia.com/` becomes `tokopedia`.
pub fn domain_label(seed: &str) -> Option<String> {
    let parsed = Url::parse(seed).ok()?;
    let host = parsed.host_str()?;
    let host = host.strip_prefix("www.").unwrap_or(host);
    let label = host.split('.').next()?;

    if label.is_empty() {
        None
    } else {
        Some(label.to_string())
    }
}
