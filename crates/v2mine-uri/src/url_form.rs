//! `vless://` and `trojan://` links, which share the URL layout
//! `scheme://userinfo@host:port?query#name`.

use crate::encoding::{fragment_name, percent_decode, COMPONENT};
use crate::error::{ParseError, Result};
use crate::parsed::ParsedConfig;
use percent_encoding::utf8_percent_encode;
use url::{form_urlencoded, Url};
use v2mine_core::Scheme;

pub(crate) fn parse(scheme: Scheme, uri: &str) -> Result<ParsedConfig> {
    let url = Url::parse(uri).map_err(|e| match e {
        url::ParseError::InvalidPort => ParseError::InvalidPort {
            scheme,
            value: port_text(uri),
        },
        url::ParseError::EmptyHost => ParseError::MissingHost { scheme },
        other => ParseError::encoding(scheme, other),
    })?;

    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or(ParseError::MissingHost { scheme })?;
    let port = url.port().ok_or(ParseError::MissingPort { scheme })?;
    if port == 0 {
        return Err(ParseError::InvalidPort {
            scheme,
            value: "0".to_string(),
        });
    }

    let identifier = percent_decode(url.username());
    if identifier.trim().is_empty() {
        return Err(ParseError::MissingIdentifier { scheme });
    }

    let mut config = ParsedConfig::new(scheme, host, port, identifier);
    for (key, value) in url.query_pairs() {
        config.params.insert(key.into_owned(), value.into_owned());
    }
    config.name = fragment_name(url.fragment());

    Ok(config)
}

pub(crate) fn encode(config: &ParsedConfig) -> String {
    let mut uri = format!(
        "{}://{}@{}:{}",
        config.scheme.prefix(),
        utf8_percent_encode(&config.identifier, COMPONENT),
        config.host,
        config.port
    );
    if !config.params.is_empty() {
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&config.params)
            .finish();
        uri.push('?');
        uri.push_str(&query);
    }
    if let Some(name) = &config.name {
        uri.push('#');
        uri.push_str(&utf8_percent_encode(name, COMPONENT).to_string());
    }
    uri
}

/// Best-effort extraction of the port text for error messages.
fn port_text(uri: &str) -> String {
    let authority = uri
        .split_once("://")
        .map_or(uri, |(_, rest)| rest)
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    authority
        .rsplit_once(':')
        .map_or_else(String::new, |(_, port)| port.to_string())
}
