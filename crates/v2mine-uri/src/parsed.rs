//! The normalized record every share link is decoded into.

use crate::{shadowsocks, url_form, vmess};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use v2mine_core::Scheme;

/// A share link decoded into the shape common to every scheme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedConfig {
    /// Link scheme
    pub scheme: Scheme,
    /// Server host, lowercased; IPv6 literals keep their brackets
    pub host: String,
    /// Server port
    pub port: u16,
    /// User id (vmess, vless), password (trojan) or `method:password` (ss)
    pub identifier: String,
    /// Transport / security parameters; ignored for deduplication
    pub params: BTreeMap<String, String>,
    /// Display label taken from the fragment or the vmess `ps` field
    pub name: Option<String>,
    /// The link text this record was parsed from
    pub raw: String,
}

impl ParsedConfig {
    pub(crate) fn new(
        scheme: Scheme,
        host: &str,
        port: u16,
        identifier: impl Into<String>,
    ) -> Self {
        Self {
            scheme,
            host: host.to_ascii_lowercase(),
            port,
            identifier: identifier.into(),
            params: BTreeMap::new(),
            name: None,
            raw: String::new(),
        }
    }

    /// Identity used for deduplication.
    #[must_use]
    pub fn key(&self) -> DedupKey {
        DedupKey {
            scheme: self.scheme,
            host: self.host.clone(),
            port: self.port,
            identifier: self.identifier.clone(),
        }
    }

    /// Encode this record as a canonical share link of the same scheme.
    ///
    /// The result re-parses to a record with the same key, params and name,
    /// though it need not be byte-identical to [`ParsedConfig::raw`].
    #[must_use]
    pub fn to_uri(&self) -> String {
        match self.scheme {
            Scheme::Vmess => vmess::encode(self),
            Scheme::Vless | Scheme::Trojan => url_form::encode(self),
            Scheme::Shadowsocks => shadowsocks::encode(self),
        }
    }
}

/// Two configs are duplicates iff their keys are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[allow(missing_docs)]
pub struct DedupKey {
    pub scheme: Scheme,
    pub host: String,
    pub port: u16,
    pub identifier: String,
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.scheme, self.host, self.port)
    }
}
