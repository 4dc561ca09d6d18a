//! Access token validation
//!
//! Checks run in a fixed order and the first failure wins: structure, issuer,
//! token class, signature and validity window, then the claims CouchDB needs.
//! The issuer and class checks read the unverified payload so obviously foreign
//! tokens are turned away before any cryptography runs.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::{DecodingKey, Validation, decode, decode_header};
use serde_json::{Map, Value};

use crate::config::JwtSettings;
use crate::error::{Rejection, Result};

/// Claim carrying the token class
const TOKEN_USE_CLAIM: &str = "token_use";

/// Only access tokens may reach the database
const ACCESS_TOKEN_USE: &str = "access";

/// Claims extracted from a verified access token
#[derive(Debug, Clone, PartialEq)]
pub struct Claims {
    /// Issuer
    pub issuer: String,

    /// Token class (always `access` once verified)
    pub token_use: String,

    /// Value of the configured subject claim
    pub subject: String,

    /// Value of the configured roles claim, empty unless it was a list of strings
    pub roles: Vec<String>,

    /// Full verified payload
    pub raw: Map<String, Value>,
}

/// Validate `token` and return its claims
pub fn validate(token: &str, jwt: &JwtSettings) -> Result<Claims> {
    let unverified = decode_unverified(token)?;

    if unverified.get("iss").and_then(Value::as_str) != Some(jwt.issuer.as_str()) {
        return Err(Rejection::IssuerMismatch);
    }

    if unverified.get(TOKEN_USE_CLAIM).and_then(Value::as_str) != Some(ACCESS_TOKEN_USE) {
        return Err(Rejection::WrongTokenClass);
    }

    let payload = verify(token, jwt)?;

    let roles = payload
        .get(&jwt.roles_field)
        .filter(|value| is_truthy(value))
        .map(normalize_roles)
        .ok_or_else(|| Rejection::MissingRolesClaim(jwt.roles_field.clone()))?;

    let subject = extract_subject(&payload, &jwt.subject_field)?;

    Ok(Claims {
        issuer: jwt.issuer.clone(),
        token_use: ACCESS_TOKEN_USE.to_string(),
        subject,
        roles,
        raw: payload,
    })
}

/// Decode header and payload without checking the signature
fn decode_unverified(token: &str) -> Result<Map<String, Value>> {
    let segments: Vec<&str> = token.split('.').collect();
    let [_, payload, _] = segments.as_slice() else {
        return Err(Rejection::InvalidTokenStructure(format!(
            "expected 3 segments, found {}",
            segments.len()
        )));
    };

    decode_header(token)
        .map_err(|e| Rejection::InvalidTokenStructure(format!("header: {e}")))?;

    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| Rejection::InvalidTokenStructure(format!("payload encoding: {e}")))?;

    serde_json::from_slice(&bytes)
        .map_err(|e| Rejection::InvalidTokenStructure(format!("payload: {e}")))
}

/// Check signature, issuer binding, audience and validity window
fn verify(token: &str, jwt: &JwtSettings) -> Result<Map<String, Value>> {
    let mut validation = Validation::default();
    validation.algorithms.clone_from(&jwt.algorithms);
    validation.leeway = jwt.leeway_seconds;
    validation.validate_nbf = true;
    validation.set_issuer(&[jwt.issuer.as_str()]);

    if let Some(audiences) = &jwt.audience {
        validation.set_audience(audiences.as_slice());
    } else {
        validation.validate_aud = false;
    }

    let mut required = vec!["iss"];
    if jwt.require_exp {
        required.push("exp");
    }
    validation.set_required_spec_claims(required.as_slice());

    let key = DecodingKey::from_secret(jwt.secret.expose().as_bytes());
    let data = decode::<Map<String, Value>>(token, &key, &validation)?;
    Ok(data.claims)
}

/// Anything but `null`, `false`, `""` and `0` counts as present
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f.abs() > 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn normalize_roles(value: &Value) -> Vec<String> {
    value
        .as_array()
        .and_then(|items| {
            items
                .iter()
                .map(|item| item.as_str().map(String::from))
                .collect::<Option<Vec<_>>>()
        })
        .unwrap_or_default()
}

/// Only a non-empty string can be signed as a CouchDB username
fn extract_subject(payload: &Map<String, Value>, field: &str) -> Result<String> {
    match payload.get(field) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        _ => Err(Rejection::MissingSubjectClaim(field.to_string())),
    }
}
