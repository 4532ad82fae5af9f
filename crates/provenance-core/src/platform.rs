//! Platform identifier parsing.
//!
//! Maps a raw URL from a hosting platform (video, microblogging, code
//! hosting, short video, professional network) to a canonical
//! `(platform, platform_id)` pair. Parsing is pure: no network access, and
//! the same URL always yields the same result.
//!
//! Each matcher is a regular expression over `host/path?query` with the
//! host lowercased. Matchers are tried from most to least specific; when
//! two platforms' patterns both accept a URL, the more specific one wins.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::crypto::keccak256;
use crate::error::ValidationError;

/// A canonical platform identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlatformId {
    pub platform: String,
    pub platform_id: String,
}

impl PlatformId {
    /// Create an identifier, rejecting empty components.
    pub fn new(
        platform: impl Into<String>,
        platform_id: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let platform = platform.into();
        let platform_id = platform_id.into();
        if platform.is_empty() {
            return Err(ValidationError::EmptyPlatformComponent("platform"));
        }
        if platform_id.is_empty() {
            return Err(ValidationError::EmptyPlatformComponent("platform_id"));
        }
        Ok(Self {
            platform,
            platform_id,
        })
    }

    /// The ledger key this identifier binds under.
    pub fn key(&self) -> [u8; 32] {
        platform_key(&self.platform, &self.platform_id)
    }
}

impl fmt::Display for PlatformId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.platform, self.platform_id)
    }
}

/// `keccak256(platform || ":" || platform_id)`.
pub fn platform_key(platform: &str, platform_id: &str) -> [u8; 32] {
    let mut preimage = Vec::with_capacity(platform.len() + 1 + platform_id.len());
    preimage.extend_from_slice(platform.as_bytes());
    preimage.push(b':');
    preimage.extend_from_slice(platform_id.as_bytes());
    keccak256(&preimage)
}

/// One URL shape for one platform.
#[derive(Debug, Clone)]
pub struct PlatformMatcher {
    platform: String,
    pattern: Regex,
    specificity: u32,
    transform: fn(&str) -> String,
}

impl PlatformMatcher {
    /// Build a matcher. The pattern runs against `host/path?query` and the
    /// first capture group is the platform identifier.
    pub fn new(
        platform: impl Into<String>,
        pattern: &str,
        specificity: u32,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            platform: platform.into(),
            pattern: Regex::new(pattern)?,
            specificity,
            transform: identity,
        })
    }

    fn with_transform(mut self, transform: fn(&str) -> String) -> Self {
        self.transform = transform;
        self
    }

    pub fn platform(&self) -> &str {
        &self.platform
    }

    pub fn specificity(&self) -> u32 {
        self.specificity
    }

    fn extract(&self, subject: &str) -> Option<PlatformId> {
        let caps = self.pattern.captures(subject)?;
        let id = (self.transform)(caps.get(1)?.as_str());
        PlatformId::new(self.platform.clone(), id).ok()
    }
}

fn identity(s: &str) -> String {
    s.to_string()
}

fn strip_git_suffix(s: &str) -> String {
    s.strip_suffix(".git").unwrap_or(s).to_string()
}

/// Specificity tiers for the built-in matchers.
mod tier {
    /// Host pattern accepts any subdomain.
    pub const BROAD: u32 = 10;
    /// Host pattern names a fixed host, optionally `www.`.
    pub const HOST: u32 = 20;
    /// Host pattern names a dedicated subdomain of another platform's host.
    pub const SUBDOMAIN: u32 = 30;
}

// Every identifier capture ends at a delimiter or the end of the subject,
// so a longer or differently shaped segment is rejected, never truncated.
// Path identifiers end at `(?:[/?#&]|$)`, query identifiers at `(?:&|#|$)`.
const BUILTIN_MATCHERS: &[(&str, &str, u32)] = &[
    // Video hosting.
    (
        "youtube",
        r"^(?:[\w-]+\.)?youtube\.com/watch\?(?:[^#]*&)?v=([\w-]{11})(?:&|#|$)",
        tier::BROAD,
    ),
    (
        "youtube",
        r"^(?:[\w-]+\.)?youtube\.com/(?:embed|shorts|live|v)/([\w-]{11})(?:[/?#&]|$)",
        tier::BROAD,
    ),
    ("youtube", r"^youtu\.be/([\w-]{11})(?:[/?#&]|$)", tier::HOST),
    (
        "youtube",
        r"^(?:www\.)?youtube-nocookie\.com/embed/([\w-]{11})(?:[/?#&]|$)",
        tier::HOST,
    ),
    ("vimeo", r"^(?:www\.)?vimeo\.com/(\d+)(?:[/?#&]|$)", tier::HOST),
    (
        "vimeo",
        r"^player\.vimeo\.com/video/(\d+)(?:[/?#&]|$)",
        tier::SUBDOMAIN,
    ),
    // Microblogging.
    (
        "twitter",
        r"^(?:(?:www|mobile)\.)?(?:twitter|x)\.com/(?:\w{1,15}|i/web|i)/status(?:es)?/(\d+)(?:[/?#&]|$)",
        tier::HOST,
    ),
    // Code hosting. Gist ids are at least 20 hex digits, which keeps a
    // bare username from being read as one.
    (
        "gist",
        r"^gist\.github\.com/(?:[\w-]+/)?([0-9a-fA-F]{20,})(?:[/?#&]|$)",
        tier::SUBDOMAIN,
    ),
    (
        "github",
        r"^(?:[\w-]+\.)?github\.com/([\w.-]+/[\w.-]+)(?:[/?#&]|$)",
        tier::BROAD,
    ),
    // Short video.
    (
        "tiktok",
        r"^(?:(?:www|m)\.)?tiktok\.com/@[\w.-]+/video/(\d+)(?:[/?#&]|$)",
        tier::HOST,
    ),
    (
        "tiktok",
        r"^(?:www\.)?tiktok\.com/embed(?:/v2)?/(\d+)(?:[/?#&]|$)",
        tier::HOST,
    ),
    (
        "tiktok",
        r"^(?:vm|vt)\.tiktok\.com/(\w+)(?:[/?#&]|$)",
        tier::SUBDOMAIN,
    ),
    (
        "instagram",
        r"^(?:www\.)?instagram\.com/(?:p|reel|reels|tv)/([\w-]+)(?:[/?#&]|$)",
        tier::HOST,
    ),
    // Professional network. Post slugs continue after the id with `-`.
    (
        "linkedin",
        r"^(?:[\w-]+\.)?linkedin\.com/posts/[^/?#]*activity-(\d+)(?:[-/?#&]|$)",
        tier::BROAD,
    ),
    (
        "linkedin",
        r"^(?:[\w-]+\.)?linkedin\.com/(?:embed/)?feed/update/urn:li:(?:activity|share|ugcPost):(\d+)(?:[/?#&]|$)",
        tier::BROAD,
    ),
];

/// An ordered set of platform matchers.
#[derive(Debug, Clone)]
pub struct PlatformParser {
    matchers: Vec<PlatformMatcher>,
}

impl PlatformParser {
    /// A parser with the built-in matchers.
    pub fn new() -> Self {
        let mut parser = Self::empty();
        for (platform, pattern, specificity) in BUILTIN_MATCHERS {
            if let Ok(matcher) = PlatformMatcher::new(*platform, pattern, *specificity) {
                let matcher = if *platform == "github" {
                    matcher.with_transform(strip_git_suffix)
                } else {
                    matcher
                };
                parser.insert(matcher);
            }
        }
        parser
    }

    /// A parser that matches nothing until matchers are added.
    pub fn empty() -> Self {
        Self {
            matchers: Vec::new(),
        }
    }

    /// Add a matcher, keeping the set ordered by descending specificity.
    /// Among equal specificity, earlier matchers win.
    pub fn with_matcher(mut self, matcher: PlatformMatcher) -> Self {
        self.insert(matcher);
        self
    }

    fn insert(&mut self, matcher: PlatformMatcher) {
        let pos = self
            .matchers
            .iter()
            .position(|m| m.specificity < matcher.specificity)
            .unwrap_or(self.matchers.len());
        self.matchers.insert(pos, matcher);
    }

    pub fn matchers(&self) -> &[PlatformMatcher] {
        &self.matchers
    }

    /// Extract the platform identifier from a URL.
    ///
    /// Returns `None` when no matcher applies; callers treat that as an
    /// unsupported platform, not a failure.
    pub fn parse(&self, raw: &str) -> Option<PlatformId> {
        let subject = normalize(raw)?;
        self.matchers.iter().find_map(|m| m.extract(&subject))
    }
}

impl Default for PlatformParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Reduce a URL to `host/path?query`, host lowercased.
fn normalize(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };
    let url = Url::parse(&with_scheme).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    let host = url.host_str()?.to_ascii_lowercase();
    let mut subject = format!("{host}{}", url.path());
    if let Some(query) = url.query() {
        subject.push('?');
        subject.push_str(query);
    }
    Some(subject)
}

/// Parse with the built-in matcher set.
pub fn parse_platform_url(url: &str) -> Option<PlatformId> {
    static PARSER: OnceLock<PlatformParser> = OnceLock::new();
    PARSER.get_or_init(PlatformParser::new).parse(url)
}
