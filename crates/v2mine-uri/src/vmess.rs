//! `vmess://` links: base64-encoded JSON in the v2rayN share format.

use crate::encoding::{decode_base64_text, fragment_name};
use crate::error::{ParseError, Result};
use crate::parsed::ParsedConfig;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{Map, Value};
use v2mine_core::Scheme;

const SCHEME: Scheme = Scheme::Vmess;

/// Fields that map onto the common record rather than into `params`.
const STRUCTURAL_FIELDS: [&str; 5] = ["v", "add", "port", "id", "ps"];

pub(crate) fn parse(uri: &str) -> Result<ParsedConfig> {
    let body = &uri[SCHEME.prefix().len() + 3..];
    let (payload, fragment) = match body.split_once('#') {
        Some((payload, fragment)) => (payload, Some(fragment)),
        None => (body, None),
    };

    let json = decode_base64_text(payload)
        .ok_or_else(|| ParseError::encoding(SCHEME, "payload is not base64 text"))?;
    let value: Value =
        serde_json::from_str(&json).map_err(|e| ParseError::encoding(SCHEME, e))?;
    let object = value
        .as_object()
        .ok_or_else(|| ParseError::encoding(SCHEME, "payload is not a JSON object"))?;

    let host = scalar(object, "add")
        .filter(|s| !s.is_empty())
        .ok_or(ParseError::MissingHost { scheme: SCHEME })?;
    let port = port(object)?;
    let id = scalar(object, "id")
        .filter(|s| !s.is_empty())
        .ok_or(ParseError::MissingIdentifier { scheme: SCHEME })?;

    let mut config = ParsedConfig::new(SCHEME, &host, port, id);
    config.name = scalar(object, "ps")
        .filter(|s| !s.is_empty())
        .or_else(|| fragment_name(fragment));

    for (key, value) in object {
        if STRUCTURAL_FIELDS.contains(&key.as_str()) {
            continue;
        }
        if let Some(text) = scalar_value(value) {
            config.params.insert(key.clone(), text);
        }
    }

    Ok(config)
}

pub(crate) fn encode(config: &ParsedConfig) -> String {
    let mut object = Map::new();
    for (key, value) in &config.params {
        object.insert(key.clone(), Value::String(value.clone()));
    }
    object.insert("v".to_string(), Value::String("2".to_string()));
    object.insert(
        "ps".to_string(),
        Value::String(config.name.clone().unwrap_or_default()),
    );
    object.insert("add".to_string(), Value::String(config.host.clone()));
    object.insert("port".to_string(), Value::String(config.port.to_string()));
    object.insert("id".to_string(), Value::String(config.identifier.clone()));

    format!(
        "{}://{}",
        SCHEME.prefix(),
        STANDARD.encode(Value::Object(object).to_string())
    )
}

fn port(object: &Map<String, Value>) -> Result<u16> {
    match object.get("port") {
        None | Some(Value::Null) => Err(ParseError::MissingPort { scheme: SCHEME }),
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|n| u16::try_from(n).ok())
            .filter(|&n| n != 0)
            .ok_or_else(|| ParseError::InvalidPort {
                scheme: SCHEME,
                value: n.to_string(),
            }),
        Some(Value::String(s)) if s.trim().is_empty() => {
            Err(ParseError::MissingPort { scheme: SCHEME })
        }
        Some(Value::String(s)) => s
            .trim()
            .parse::<u16>()
            .ok()
            .filter(|&n| n != 0)
            .ok_or_else(|| ParseError::InvalidPort {
                scheme: SCHEME,
                value: s.clone(),
            }),
        Some(other) => Err(ParseError::InvalidPort {
            scheme: SCHEME,
            value: other.to_string(),
        }),
    }
}

fn scalar(object: &Map<String, Value>, key: &str) -> Option<String> {
    object.get(key).and_then(scalar_value)
}

fn scalar_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
