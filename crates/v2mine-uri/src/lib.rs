//! Share-link parsing for the v2mine pipeline.
//!
//! Turns one scraped [`RawEntry`] into a normalized [`ParsedConfig`] whose
//! [`DedupKey`] decides whether two links describe the same server. Each
//! scheme has its own decoder, selected by an exhaustive match on
//! [`Scheme`]:
//!
//! - `vmess://` carries a base64-encoded JSON object
//! - `vless://` and `trojan://` use URL userinfo and query parameters
//! - `ss://` accepts the SIP002 form as well as the legacy all-base64 form
//!
//! # Example
//!
//! ```rust
//! use v2mine_uri::parse_str;
//!
//! let config = parse_str("vless://id@host:443?security=tls#Node").unwrap();
//! assert_eq!(config.host, "host");
//! assert_eq!(config.port, 443);
//! assert_eq!(config.identifier, "id");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

mod encoding;
#[allow(missing_docs)]
pub mod error;
pub mod parsed;
mod shadowsocks;
mod url_form;
mod vmess;

pub use error::{ParseError, Result};
pub use parsed::{DedupKey, ParsedConfig};

use v2mine_core::{CoreError, RawEntry, Scheme};

/// Parse a scraped entry into its normalized form.
pub fn parse(entry: &RawEntry) -> Result<ParsedConfig> {
    let mut config = match entry.scheme() {
        Scheme::Vmess => vmess::parse(entry.as_str())?,
        Scheme::Vless | Scheme::Trojan => url_form::parse(entry.scheme(), entry.as_str())?,
        Scheme::Shadowsocks => shadowsocks::parse(entry.as_str())?,
    };
    config.raw = entry.as_str().to_string();
    Ok(config)
}

/// Clean and parse a plain string, e.g. a line read back from the output list.
pub fn parse_str(text: &str) -> Result<ParsedConfig> {
    let entry = RawEntry::new(text).map_err(|e| match e {
        CoreError::UnsupportedScheme { entry } => ParseError::UnsupportedScheme { entry },
        _ => ParseError::Empty,
    })?;
    parse(&entry)
}
