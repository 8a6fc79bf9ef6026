// TikTok URL validation and identifier extraction

use lazy_static::lazy_static;
use regex::Regex;
use url::Url;

use super::models::UrlCheck;

/// Domain marker the host must contain
const PLATFORM_DOMAIN: &str = "tiktok.com";

lazy_static! {
    // Recognized URL shapes, tried in order. Anchored at the start only.
    static ref VALID_PATTERNS: Vec<Regex> = [
        r"(?i)^https?://(?:www\.)?tiktok\.com/@[\w.-]+/video/\d+",
        r"(?i)^https?://(?:www\.)?tiktok\.com/.*?/video/\d+",
        r"(?i)^https?://vm\.tiktok\.com/\w+",
        r"(?i)^https?://(?:www\.)?tiktok\.com/t/\w+",
        r"(?i)^https?://m\.tiktok\.com/.*",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid URL pattern"))
    .collect();

    // Narrower set with a capture group for the identifier. The mobile wildcard
    // has no counterpart here, so some valid URLs yield no identifier.
    static ref ID_PATTERNS: Vec<Regex> = [
        r"(?i)tiktok\.com/@[\w.-]+/video/(\d+)",
        r"(?i)tiktok\.com/.*?/video/(\d+)",
        r"(?i)vm\.tiktok\.com/(\w+)",
        r"(?i)tiktok\.com/t/(\w+)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid id pattern"))
    .collect();
}

/// Pattern-based gate applied before any engine sees a URL
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlValidator;

impl UrlValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, url: &str) -> UrlCheck {
        if url.trim().is_empty() {
            return UrlCheck::invalid("URL is empty or invalid");
        }

        let host = match Url::parse(url) {
            Ok(parsed) => match parsed.host_str() {
                Some(host) if !host.is_empty() => host.to_lowercase(),
                _ => return UrlCheck::invalid("Invalid URL format"),
            },
            Err(_) => return UrlCheck::invalid("Invalid URL format"),
        };

        if !host.contains(PLATFORM_DOMAIN) {
            return UrlCheck::invalid("URL is not from TikTok");
        }

        if VALID_PATTERNS.iter().any(|re| re.is_match(url)) {
            UrlCheck::valid("Valid TikTok URL detected")
        } else {
            UrlCheck::invalid("URL format not recognized")
        }
    }

    /// Pull the numeric/alphanumeric content identifier out of a URL
    pub fn extract_id(&self, url: &str) -> Option<String> {
        ID_PATTERNS
            .iter()
            .find_map(|re| re.captures(url))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }

    /// Prefix `https://` when no scheme is present
    pub fn normalize(&self, url: &str) -> String {
        if url.is_empty() || url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("https://{}", url)
        }
    }
}
