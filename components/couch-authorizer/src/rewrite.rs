//! CouchDB proxy-authentication headers
//!
//! CouchDB's proxy authentication trusts three headers: the username, a
//! comma-separated role list and `hex(HMAC-SHA1(secret, username))`. These are
//! the only place identity reaches the origin, so they are either written here
//! from validated claims or removed.

use std::fmt;

use anyhow::anyhow;
use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::config::CouchDbSettings;
use crate::request::Headers;
use crate::token::Claims;

type HmacSha1 = Hmac<Sha1>;

/// Prefix of the per-user role CouchDB uses for ownership checks
const USER_ROLE_PREFIX: &str = "user:";

/// HMAC-SHA1 keyed with the CouchDB shared secret
#[derive(Clone)]
pub struct ProxySigner {
    mac: HmacSha1,
}

impl ProxySigner {
    pub fn new(secret: &[u8]) -> anyhow::Result<Self> {
        let mac = HmacSha1::new_from_slice(secret).map_err(|e| anyhow!("Invalid CouchDB secret: {e}"))?;
        Ok(Self { mac })
    }

    /// Lowercase hex proxy token for `username`
    pub fn sign(&self, username: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(username.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

impl fmt::Debug for ProxySigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ProxySigner(<redacted>)")
    }
}

/// Identity asserted to CouchDB
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub username: String,
    /// Token roles followed by `user:<username>`
    pub roles: Vec<String>,
    pub proxy_token: String,
}

impl Identity {
    pub fn from_claims(claims: &Claims, signer: &ProxySigner) -> Self {
        let mut roles = claims.roles.clone();
        roles.push(format!("{USER_ROLE_PREFIX}{}", claims.subject));

        Self {
            username: claims.subject.clone(),
            roles,
            proxy_token: signer.sign(&claims.subject),
        }
    }
}

/// Write the three identity headers, replacing whatever the client sent
pub fn apply_identity(headers: &mut Headers, identity: &Identity, couchdb: &CouchDbSettings) {
    headers.set(&couchdb.username_header, &identity.username);
    headers.set(&couchdb.roles_header, &identity.roles.join(","));
    headers.set(&couchdb.token_header, &identity.proxy_token);
}

/// Drop every header a client could use to claim an identity
pub fn strip_untrusted(headers: &mut Headers, couchdb: &CouchDbSettings) {
    headers.remove("authorization");
    for name in couchdb.identity_headers() {
        headers.remove(name);
    }
}
