//! Video link extraction from the widget's nested document
//!
//! The widget iframe lists its videos as YouTube thumbnails
//! (`src="//i.ytimg.com/vi/<id>/hqdefault.jpg"`). Each thumbnail is turned into a
//! watch URL. Order follows the markup and repeats are kept.

/// Substring identifying a thumbnail reference
const THUMBNAIL_MARKER: &str = "i.ytimg.com/vi/";

/// Prefixes stripped before the video id, as serialized by the browser and as plain markup
const THUMBNAIL_PREFIXES: &[&str] = &["src=\\\"//i.ytimg.com/vi/", "src=\"//i.ytimg.com/vi/"];

/// Canonical watch URL prefix
pub const WATCH_URL_PREFIX: &str = "https://www.youtube.com/watch?v=";

/// Extract watch URLs from the nested document markup
///
/// # Examples
///
/// ```
/// use clipscout::extract::video::parse_video_links;
///
/// let html = r#"<img src="//i.ytimg.com/vi/abc123/hqdefault.jpg">"#;
/// assert_eq!(
///     parse_video_links(html),
///     vec!["https://www.youtube.com/watch?v=abc123".to_string()]
/// );
/// ```
pub fn parse_video_links(markup: &str) -> Vec<String> {
    markup
        .split_whitespace()
        .filter(|token| token.contains(THUMBNAIL_MARKER))
        .filter_map(video_id)
        .map(|id| format!("{WATCH_URL_PREFIX}{id}"))
        .collect()
}

/// Join watch URLs with commas, without a trailing separator
pub fn join_video_links(links: &[String]) -> String {
    links.join(",")
}

fn video_id(token: &str) -> Option<&str> {
    let rest = THUMBNAIL_PREFIXES
        .iter()
        .find_map(|prefix| token.strip_prefix(prefix))
        .unwrap_or(token);

    rest.split('/').next().filter(|id| !id.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiple_matches_in_order() {
        let markup = r#"<div class="thumbs"> <img src="//i.ytimg.com/vi/abc123/hq.jpg" alt=""> <span>x</span> <img src="//i.ytimg.com/vi/xyz789/hq.jpg" alt=""> </div>"#;

        let links = parse_video_links(markup);
        assert_eq!(
            join_video_links(&links),
            "https://www.youtube.com/watch?v=abc123,https://www.youtube.com/watch?v=xyz789"
        );
    }

    #[test]
    fn test_escaped_quotes_from_script_result() {
        let markup = r#"<img src=\"//i.ytimg.com/vi/abc123/hq.jpg\" width=\"120\">"#;
        assert_eq!(
            parse_video_links(markup),
            vec!["https://www.youtube.com/watch?v=abc123".to_string()]
        );
    }

    #[test]
    fn test_no_matches_yields_empty() {
        let links = parse_video_links("<body><p>no videos here</p></body>");
        assert!(links.is_empty());
        assert_eq!(join_video_links(&links), "");
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_video_links("").is_empty());
        assert!(parse_video_links("   \n\t ").is_empty());
    }

    #[test]
    fn test_duplicates_kept() {
        let markup = r#"<img src="//i.ytimg.com/vi/abc123/1.jpg"> <img src="//i.ytimg.com/vi/abc123/2.jpg">"#;
        assert_eq!(parse_video_links(markup).len(), 2);
    }
}
