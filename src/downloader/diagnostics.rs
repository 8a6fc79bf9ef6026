// Failure diagnostics for library-backed downloads
//
// yt-dlp reports everything as free text on stderr. Classifying it lets the
// user tell a transient network hiccup from a video that will never download.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureHint {
    /// Connection timed out, refused or reset
    NetworkTimeout,

    /// HTTP 429 or similar throttling
    RateLimited,

    /// Account or video is private
    PrivateVideo,

    /// Deleted, removed or otherwise gone
    VideoUnavailable,

    /// Not available in the user's region
    GeoBlocked,

    /// Needs a logged-in session (age gate, sensitive content)
    LoginRequired,

    /// The extractor does not understand the URL
    UnsupportedUrl,

    Unknown,
}

impl FailureHint {
    /// Trying again later might succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::NetworkTimeout | Self::RateLimited | Self::Unknown)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::NetworkTimeout => "Network timeout or connection problem",
            Self::RateLimited => "Rate limited by TikTok",
            Self::PrivateVideo => "Private video",
            Self::VideoUnavailable => "Video unavailable",
            Self::GeoBlocked => "Not available in your region",
            Self::LoginRequired => "Login required",
            Self::UnsupportedUrl => "Unsupported URL",
            Self::Unknown => "Unknown error",
        }
    }

    /// Short advice appended to the failure message
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::NetworkTimeout => "Check your internet connection and try again.",
            Self::RateLimited => "Wait a few minutes before trying again.",
            Self::PrivateVideo => "Only the owner's followers can see this video.",
            Self::VideoUnavailable => "The video may have been deleted.",
            Self::GeoBlocked => "Try again from a different network.",
            Self::LoginRequired => "This video cannot be downloaded anonymously.",
            Self::UnsupportedUrl => "Copy the link again from the TikTok share menu.",
            Self::Unknown => "Try again, or update yt-dlp.",
        }
    }
}

/// Classify an error message. `None` for empty input.
pub fn diagnose_error(error: &str) -> Option<FailureHint> {
    let lower = error.to_lowercase();

    if lower.trim().is_empty() {
        return None;
    }

    if lower.contains("unsupported url") || lower.contains("is not a valid url") {
        return Some(FailureHint::UnsupportedUrl);
    }

    if lower.contains("private") {
        return Some(FailureHint::PrivateVideo);
    }

    if lower.contains("log in")
        || lower.contains("login")
        || lower.contains("sign in")
        || lower.contains("age-restricted")
        || lower.contains("cookies")
    {
        return Some(FailureHint::LoginRequired);
    }

    if lower.contains("not available in your")
        || lower.contains("geo restriction")
        || lower.contains("geo-restricted")
        || lower.contains("blocked in your country")
    {
        return Some(FailureHint::GeoBlocked);
    }

    if lower.contains("video unavailable")
        || lower.contains("video is unavailable")
        || lower.contains("has been removed")
        || lower.contains("not available")
        || lower.contains("404")
    {
        return Some(FailureHint::VideoUnavailable);
    }

    if lower.contains("429") || lower.contains("too many requests") || lower.contains("rate limit") {
        return Some(FailureHint::RateLimited);
    }

    if lower.contains("timeout")
        || lower.contains("timed out")
        || lower.contains("connection refused")
        || lower.contains("connection reset")
        || lower.contains("network is unreachable")
        || lower.contains("name or service not known")
        || lower.contains("failed to resolve")
    {
        return Some(FailureHint::NetworkTimeout);
    }

    Some(FailureHint::Unknown)
}
