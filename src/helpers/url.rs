//! URL helper functions

use crate::config::SiteConfig;

/// Generate a URL with the root path
///
/// # Examples
/// ```ignore
/// url_for(&config, "/style.css") // -> "/blog/style.css"
/// ```
pub fn url_for(config: &SiteConfig, path: &str) -> String {
    let root = config.root.trim_end_matches('/');
    let path = path.trim_start_matches('/');

    if path.is_empty() {
        format!("{}/", root)
    } else {
        format!("{}/{}", root, path)
    }
}

/// Generate a full URL including the domain
///
/// # Examples
/// ```ignore
/// full_url_for(&config, "/post/hello/") // -> "https://example.com/blog/post/hello/"
/// ```
pub fn full_url_for(config: &SiteConfig, path: &str) -> String {
    let base = config.url.trim_end_matches('/');
    format!("{}{}", base, url_for(config, path))
}

/// Link to a post detail page
pub fn post_path(config: &SiteConfig, uid: &str) -> String {
    url_for(config, &format!("post/{}", encode_segment(uid)))
}

/// Server-side "load more" link showing the first `pages` pages
pub fn listing_path(config: &SiteConfig, pages: usize) -> String {
    if pages <= 1 {
        url_for(config, "")
    } else {
        url_for(config, &format!("?pages={}", pages))
    }
}

/// Static "load more" link, `page/N/` under the public directory
pub fn static_listing_path(config: &SiteConfig, pages: usize) -> String {
    if pages <= 1 {
        url_for(config, "")
    } else {
        url_for(config, &format!("page/{}/", pages))
    }
}

/// Percent-encode a single path segment
pub fn encode_segment(segment: &str) -> String {
    ::url::form_urlencoded::byte_serialize(segment.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}
