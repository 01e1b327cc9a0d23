//! `ss://` links.
//!
//! Accepted layouts:
//! - SIP002: `ss://base64(method:password)@host:port[/][?plugin=...][#name]`
//! - SIP002 with plain userinfo: `ss://method:password@host:port`
//! - legacy: `ss://base64(method:password@host:port)[#name]`

use crate::encoding::{decode_base64_text, fragment_name, percent_decode};
use crate::error::{ParseError, Result};
use crate::parsed::ParsedConfig;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use percent_encoding::utf8_percent_encode;
use url::form_urlencoded;
use v2mine_core::Scheme;

const SCHEME: Scheme = Scheme::Shadowsocks;

pub(crate) fn parse(uri: &str) -> Result<ParsedConfig> {
    let body = &uri[SCHEME.prefix().len() + 3..];
    let (body, fragment) = match body.split_once('#') {
        Some((body, fragment)) => (body, Some(fragment)),
        None => (body, None),
    };
    let (body, query) = match body.split_once('?') {
        Some((body, query)) => (body, Some(query)),
        None => (body, None),
    };

    let (credentials, host_port) = match body.rsplit_once('@') {
        Some((userinfo, host_port)) => {
            let userinfo = percent_decode(userinfo);
            let credentials = if userinfo.contains(':') {
                userinfo
            } else {
                decode_base64_text(&userinfo).ok_or_else(|| {
                    ParseError::encoding(SCHEME, "userinfo is neither method:password nor base64")
                })?
            };
            (credentials, host_port.trim_end_matches('/').to_string())
        }
        None => {
            let decoded = decode_base64_text(body)
                .ok_or_else(|| ParseError::encoding(SCHEME, "payload is not base64 text"))?;
            let (credentials, host_port) = decoded
                .rsplit_once('@')
                .ok_or_else(|| ParseError::encoding(SCHEME, "decoded payload has no '@'"))?;
            (credentials.to_string(), host_port.trim().to_string())
        }
    };

    let (method, password) = credentials
        .split_once(':')
        .filter(|(method, password)| !method.trim().is_empty() && !password.is_empty())
        .ok_or(ParseError::MissingIdentifier { scheme: SCHEME })?;
    let (host, port) = split_host_port(&host_port)?;

    let mut config = ParsedConfig::new(
        SCHEME,
        host,
        port,
        format!("{}:{password}", method.trim().to_ascii_lowercase()),
    );
    if let Some(query) = query {
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            config.params.insert(key.into_owned(), value.into_owned());
        }
    }
    config.name = fragment_name(fragment);

    Ok(config)
}

pub(crate) fn encode(config: &ParsedConfig) -> String {
    let mut uri = format!(
        "{}://{}@{}:{}",
        SCHEME.prefix(),
        URL_SAFE_NO_PAD.encode(&config.identifier),
        config.host,
        config.port
    );
    if !config.params.is_empty() {
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&config.params)
            .finish();
        uri.push_str("/?");
        uri.push_str(&query);
    }
    if let Some(name) = &config.name {
        uri.push('#');
        uri.push_str(&utf8_percent_encode(name, crate::encoding::COMPONENT).to_string());
    }
    uri
}

/// Split `host:port`, keeping brackets around IPv6 literals.
fn split_host_port(host_port: &str) -> Result<(&str, u16)> {
    let (host, port) = if host_port.starts_with('[') {
        match host_port.find(']') {
            Some(end) => {
                let rest = &host_port[end + 1..];
                (&host_port[..=end], rest.strip_prefix(':'))
            }
            None => return Err(ParseError::encoding(SCHEME, "unterminated IPv6 literal")),
        }
    } else {
        match host_port.rsplit_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (host_port, None),
        }
    };

    if host.is_empty() || host == "[]" {
        return Err(ParseError::MissingHost { scheme: SCHEME });
    }
    let port = port
        .filter(|p| !p.is_empty())
        .ok_or(ParseError::MissingPort { scheme: SCHEME })?;
    let port = port
        .parse::<u16>()
        .ok()
        .filter(|&p| p != 0)
        .ok_or_else(|| ParseError::InvalidPort {
            scheme: SCHEME,
            value: port.to_string(),
        })?;
    Ok((host, port))
}

#[cfg(test)]
mod tests {
    use crate::{parse_str, ParseError};
    use v2mine_core::Scheme;

    #[test]
    fn test_parse_sip002() {
        let config = parse_str(
            "ss://YWVzLTI1Ni1nY206c2VjcmV0@ss.example.com:8388/?plugin=obfs-local%3Bobfs%3Dhttp#SS%20One",
        )
        .expect("parse sip002");

        assert_eq!(config.scheme, Scheme::Shadowsocks);
        assert_eq!(config.host, "ss.example.com");
        assert_eq!(config.port, 8388);
        assert_eq!(config.identifier, "aes-256-gcm:secret");
        assert_eq!(
            config.params.get("plugin").map(String::as_str),
            Some("obfs-local;obfs=http")
        );
        assert_eq!(config.name.as_deref(), Some("SS One"));
    }

    #[test]
    fn test_parse_plain_userinfo() {
        let config = parse_str("ss://chacha20-ietf-poly1305:pa%3Ass@1.2.3.4:443").expect("parse");
        assert_eq!(config.identifier, "chacha20-ietf-poly1305:pa:ss");
        assert_eq!(config.host, "1.2.3.4");
    }

    #[test]
    fn test_parse_legacy() {
        // base64("chacha20-ietf-poly1305:pw@h.example:443")
        let config = parse_str("ss://Y2hhY2hhMjAtaWV0Zi1wb2x5MTMwNTpwd0BoLmV4YW1wbGU6NDQz#legacy")
            .expect("parse legacy");
        assert_eq!(config.host, "h.example");
        assert_eq!(config.port, 443);
        assert_eq!(config.identifier, "chacha20-ietf-poly1305:pw");
        assert_eq!(config.name.as_deref(), Some("legacy"));
    }

    #[test]
    fn test_parse_ipv6_host() {
        let config = parse_str("ss://YWVzLTI1Ni1nY206c2VjcmV0@[2001:db8::1]:8388").expect("parse");
        assert_eq!(config.host, "[2001:db8::1]");
        assert_eq!(config.port, 8388);
    }

    #[test]
    fn test_shadowsocks_errors() {
        let err = parse_str("ss://YWVzLTI1Ni1nY206c2VjcmV0@ss.example.com").unwrap_err();
        assert_eq!(
            err,
            ParseError::MissingPort {
                scheme: Scheme::Shadowsocks
            }
        );

        let err = parse_str("ss://YWVzLTI1Ni1nY206c2VjcmV0@ss.example.com:abc").unwrap_err();
        assert!(matches!(err, ParseError::InvalidPort { .. }));

        let err = parse_str("ss://YWVzLTI1Ni1nY206c2VjcmV0@:8388").unwrap_err();
        assert_eq!(
            err,
            ParseError::MissingHost {
                scheme: Scheme::Shadowsocks
            }
        );

        // base64("nocolon")
        let err = parse_str("ss://bm9jb2xvbg@h.example:1").unwrap_err();
        assert_eq!(
            err,
            ParseError::MissingIdentifier {
                scheme: Scheme::Shadowsocks
            }
        );

        let err = parse_str("ss://%%%").unwrap_err();
        assert!(matches!(err, ParseError::Encoding { .. }));
    }
}
