//! Shared types used across v2mine.
//!
//! This module defines the share-link scheme tag, the scraped entry newtype
//! and the timestamp wrapper used in run reports.

use crate::error::CoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of characters of an entry echoed back in error messages.
const ENTRY_PREVIEW_CHARS: usize = 80;

/// Share-link schemes understood by the harvester.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scheme {
    /// `vmess://` (base64 JSON payload)
    Vmess,
    /// `vless://` (userinfo + query parameters)
    Vless,
    /// `trojan://` (password + query parameters)
    Trojan,
    /// `ss://` (Shadowsocks, SIP002 or legacy base64 form)
    Shadowsocks,
}

impl Scheme {
    /// All supported schemes, in the order they are documented.
    pub const ALL: [Scheme; 4] = [
        Scheme::Vmess,
        Scheme::Vless,
        Scheme::Trojan,
        Scheme::Shadowsocks,
    ];

    /// URI prefix (without `://`).
    #[must_use]
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Vmess => "vmess",
            Self::Vless => "vless",
            Self::Trojan => "trojan",
            Self::Shadowsocks => "ss",
        }
    }

    /// Detect the scheme of a share link, case-insensitively.
    ///
    /// Returns `None` when the string has no `scheme://` prefix or the
    /// scheme is not supported.
    #[must_use]
    pub fn detect(uri: &str) -> Option<Self> {
        let (prefix, _) = uri.split_once("://")?;
        Self::ALL
            .into_iter()
            .find(|scheme| scheme.prefix().eq_ignore_ascii_case(prefix))
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// A cleaned, scheme-tagged share link exactly as scraped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawEntry {
    scheme: Scheme,
    text: String,
}

impl RawEntry {
    /// Clean a scraped match and tag it with its scheme.
    ///
    /// # Errors
    /// Returns error if the entry is empty after cleaning or its scheme is
    /// not supported.
    pub fn new(text: impl AsRef<str>) -> Result<Self, CoreError> {
        let text = clean_uri(text.as_ref());
        if text.is_empty() {
            return Err(CoreError::EmptyEntry);
        }
        let scheme = Scheme::detect(&text).ok_or_else(|| CoreError::UnsupportedScheme {
            entry: preview(&text),
        })?;
        Ok(Self { scheme, text })
    }

    /// Scheme of this entry.
    #[must_use]
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// The cleaned link text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Consume the entry, returning the link text.
    #[must_use]
    pub fn into_string(self) -> String {
        self.text
    }
}

impl fmt::Display for RawEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Strip whitespace, quotes, wrapping parentheses and trailing punctuation
/// that page markup tends to glue onto a link.
#[must_use]
pub fn clean_uri(raw: &str) -> String {
    let mut uri = raw.trim().trim_matches(|c: char| c.is_whitespace() || c == '"' || c == '\'');
    while uri.starts_with('(') && uri.ends_with(')') && uri.len() >= 2 {
        uri = uri[1..uri.len() - 1].trim();
    }
    uri.trim_end_matches(['.', ',', ';', ':', '!', '?', ')', '"', '\''])
        .to_string()
}

/// Shorten an entry for use in log lines and error messages.
#[must_use]
pub fn preview(text: &str) -> String {
    if text.chars().count() <= ENTRY_PREVIEW_CHARS {
        text.to_string()
    } else {
        let head: String = text.chars().take(ENTRY_PREVIEW_CHARS).collect();
        format!("{head}...")
    }
}

/// Wrapper around `chrono::DateTime<Utc>` for consistent timestamp handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create a timestamp representing the current moment.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Get the inner `DateTime<Utc>`.
    #[must_use]
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Format as RFC3339 string.
    #[must_use]
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_rfc3339())
    }
}
