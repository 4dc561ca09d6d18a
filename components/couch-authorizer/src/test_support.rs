//! Shared fixtures for unit tests

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::HashMap;

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::{Value, json};

use crate::config::{Config, Variables};

pub const JWT_SECRET: &str = "iamveryscrecet";
pub const COUCHDB_SECRET: &str = "couch-shared-secret";
pub const ISSUER: &str = "https://api.mydomain.com";

/// In-memory variable source
#[derive(Debug, Clone, Default)]
pub struct MapVariables(HashMap<String, String>);

impl MapVariables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, pairs: &[(&str, &str)]) {
        for (name, value) in pairs {
            self.0.insert((*name).to_string(), (*value).to_string());
        }
    }

    pub fn remove(&mut self, name: &str) {
        self.0.remove(name);
    }
}

impl Variables for MapVariables {
    fn get(&self, name: &str) -> Option<String> {
        self.0.get(name).filter(|s| !s.is_empty()).cloned()
    }
}

/// Minimal valid deployment
pub fn base_variables() -> MapVariables {
    let mut vars = MapVariables::new();
    vars.extend(&[
        ("jwt_secret", JWT_SECRET),
        ("jwt_issuer", ISSUER),
        ("couchdb_secret", COUCHDB_SECRET),
        ("origin_url", "https://couch.example.com"),
    ]);
    vars
}

pub fn test_config() -> Config {
    config_with(&[])
}

pub fn config_with(overrides: &[(&str, &str)]) -> Config {
    let mut vars = base_variables();
    vars.extend(overrides);
    Config::from_variables(&vars).expect("test configuration should load")
}

/// Claims of a valid access token for `subject`, expiring in an hour
pub fn access_claims(subject: &str, roles: &[&str]) -> Value {
    let now = Utc::now();
    json!({
        "iss": ISSUER,
        "token_use": "access",
        "sub": subject,
        "roles": roles,
        "iat": now.timestamp(),
        "exp": (now + Duration::hours(1)).timestamp(),
    })
}

/// Sign `claims` with the test secret using HS256
pub fn mint(claims: &Value) -> String {
    mint_with(Algorithm::HS256, JWT_SECRET, claims)
}

pub fn mint_with(algorithm: Algorithm, secret: &str, claims: &Value) -> String {
    jsonwebtoken::encode(
        &Header::new(algorithm),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("token should encode")
}

/// Copy of `claims` with `name` set to `value`, or removed when `value` is null
pub fn with_claim(claims: &Value, name: &str, value: Value) -> Value {
    let mut claims = claims.clone();
    let object = claims.as_object_mut().expect("claims should be an object");
    if value.is_null() {
        object.remove(name);
    } else {
        object.insert(name.to_string(), value);
    }
    claims
}
