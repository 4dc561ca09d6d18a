use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};

use crate::test_setup::{ISSUER, JWT_SECRET};

/// Claims of a well-formed access token for `sub`
pub fn access_claims(sub: &str, roles: &[&str]) -> Value {
    let now = chrono::Utc::now();
    json!({
        "iss": ISSUER,
        "token_use": "access",
        "sub": sub,
        "roles": roles,
        "iat": now.timestamp(),
        "exp": (now + chrono::Duration::hours(1)).timestamp(),
    })
}

/// Sign claims with HS256 and the configured secret
pub fn create_test_token(claims: &Value) -> String {
    create_token_with_secret(claims, JWT_SECRET)
}

pub fn create_token_with_secret(claims: &Value, secret: &str) -> String {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}
