//! Configuration management for the CouchDB authorizer

use std::fmt;

use anyhow::{Context, Result, anyhow};
use jsonwebtoken::Algorithm;
use spin_sdk::variables;
use url::Url;

use crate::rewrite::ProxySigner;

const DEFAULT_SUBJECT_FIELD: &str = "sub";
const DEFAULT_ROLES_FIELD: &str = "roles";
const DEFAULT_ALGORITHMS: &str = "HS256,HS384,HS512";
const DEFAULT_USERNAME_HEADER: &str = "X-Auth-CouchDB-UserName";
const DEFAULT_ROLES_HEADER: &str = "X-Auth-CouchDB-Roles";
const DEFAULT_TOKEN_HEADER: &str = "X-Auth-CouchDB-Token";
const DEFAULT_LOG_LEVEL: &str = "info";
const MAX_LEEWAY_SECONDS: u64 = 86_400;

/// Source of raw configuration values
pub trait Variables {
    /// Value for `name`, or `None` when unset or empty
    fn get(&self, name: &str) -> Option<String>;
}

/// Spin application variables
pub struct SpinVariables;

impl Variables for SpinVariables {
    fn get(&self, name: &str) -> Option<String> {
        variables::get(name).ok().filter(|s| !s.is_empty())
    }
}

/// String that never shows up in `Debug` output
#[derive(Clone)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

/// Main configuration structure
#[derive(Debug, Clone)]
pub struct Config {
    /// Identity provider token settings
    pub jwt: JwtSettings,

    /// CouchDB proxy-authentication settings
    pub couchdb: CouchDbSettings,

    /// Which credential sources are switched off
    pub sources: TokenSources,

    /// CouchDB origin requests are forwarded to
    pub origin_url: Url,

    /// `tracing` filter directive
    pub log_level: String,
}

/// Token validation settings
#[derive(Debug, Clone)]
pub struct JwtSettings {
    /// HMAC secret shared with the identity provider
    pub secret: Secret,

    /// Exact expected `iss`
    pub issuer: String,

    /// Claim holding the CouchDB username
    pub subject_field: String,

    /// Claim holding the role list
    pub roles_field: String,

    /// Accepted signing algorithms (HMAC family only)
    pub algorithms: Vec<Algorithm>,

    /// Accepted audiences, `None` disables the audience check
    pub audience: Option<Vec<String>>,

    /// Clock skew tolerance for `exp` and `nbf`
    pub leeway_seconds: u64,

    /// Reject tokens that carry no `exp`
    pub require_exp: bool,
}

/// CouchDB proxy-authentication settings
#[derive(Debug, Clone)]
pub struct CouchDbSettings {
    /// Keyed HMAC for `X-Auth-CouchDB-Token`
    pub signer: ProxySigner,
    pub username_header: String,
    pub roles_header: String,
    pub token_header: String,
}

impl CouchDbSettings {
    /// The three header names the authorizer owns
    pub fn identity_headers(&self) -> [&str; 3] {
        [
            self.username_header.as_str(),
            self.roles_header.as_str(),
            self.token_header.as_str(),
        ]
    }
}

/// Credential source toggles
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenSources {
    pub disable_auth_header: bool,
    pub disable_cookie: bool,
    pub disable_query_string: bool,
}

impl Config {
    /// Load configuration from Spin variables
    pub fn load() -> Result<Self> {
        Self::from_variables(&SpinVariables)
    }

    /// Load and validate configuration from any variable source
    pub fn from_variables(vars: &impl Variables) -> Result<Self> {
        // Secrets first so a bare deployment fails with the most useful message
        let jwt_secret = require(vars, "jwt_secret")?;
        let couchdb_secret = require(vars, "couchdb_secret")?;
        let issuer = require(vars, "jwt_issuer")?.trim().to_string();

        let jwt = JwtSettings {
            secret: Secret::new(jwt_secret),
            issuer,
            subject_field: field_name(vars, "jwt_subject_field", DEFAULT_SUBJECT_FIELD),
            roles_field: field_name(vars, "jwt_roles_field", DEFAULT_ROLES_FIELD),
            algorithms: parse_algorithms(
                &vars
                    .get("jwt_algorithms")
                    .unwrap_or_else(|| DEFAULT_ALGORITHMS.to_string()),
            )?,
            audience: vars.get("jwt_audience").map(|s| split_list(&s)).filter(|list| !list.is_empty()),
            leeway_seconds: parse_leeway(vars)?,
            require_exp: parse_flag(vars, "jwt_require_exp", true)?,
        };

        let couchdb = CouchDbSettings {
            signer: ProxySigner::new(couchdb_secret.as_bytes())?,
            username_header: header_name(vars, "couchdb_username_header", DEFAULT_USERNAME_HEADER)?,
            roles_header: header_name(vars, "couchdb_roles_header", DEFAULT_ROLES_HEADER)?,
            token_header: header_name(vars, "couchdb_token_header", DEFAULT_TOKEN_HEADER)?,
        };
        validate_identity_headers(&couchdb)?;

        let sources = TokenSources {
            disable_auth_header: parse_flag(vars, "disable_auth_header", false)?,
            disable_cookie: parse_flag(vars, "disable_cookie", false)?,
            disable_query_string: parse_flag(vars, "disable_query_string", false)?,
        };

        let origin_url = parse_origin(&require(vars, "origin_url")?)?;

        let log_level = vars
            .get("log_level")
            .map_or_else(|| DEFAULT_LOG_LEVEL.to_string(), |s| s.trim().to_string());

        Ok(Self {
            jwt,
            couchdb,
            sources,
            origin_url,
            log_level,
        })
    }
}

fn require(vars: &impl Variables, name: &str) -> Result<String> {
    vars.get(name)
        .ok_or_else(|| anyhow!("{name} is required and must not be empty"))
}

fn field_name(vars: &impl Variables, name: &str, default: &str) -> String {
    vars.get(name)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

/// Parse a comma-separated algorithm list, HMAC algorithms only
fn parse_algorithms(value: &str) -> Result<Vec<Algorithm>> {
    let algorithms = split_list(value)
        .iter()
        .map(|name| match name.to_ascii_uppercase().as_str() {
            "HS256" => Ok(Algorithm::HS256),
            "HS384" => Ok(Algorithm::HS384),
            "HS512" => Ok(Algorithm::HS512),
            _ => Err(anyhow!(
                "Unsupported algorithm: {name} (jwt_secret is a shared secret, use HS256/HS384/HS512)"
            )),
        })
        .collect::<Result<Vec<_>>>()?;

    if algorithms.is_empty() {
        return Err(anyhow!("jwt_algorithms must list at least one algorithm"));
    }
    Ok(algorithms)
}

/// Capped so `now - leeway` stays far from underflowing
fn parse_leeway(vars: &impl Variables) -> Result<u64> {
    let Some(raw) = vars.get("jwt_leeway_seconds") else {
        return Ok(0);
    };
    let leeway = raw
        .trim()
        .parse::<u64>()
        .context("jwt_leeway_seconds must be a non-negative integer")?;
    if leeway > MAX_LEEWAY_SECONDS {
        return Err(anyhow!(
            "jwt_leeway_seconds must be at most {MAX_LEEWAY_SECONDS}, got {leeway}"
        ));
    }
    Ok(leeway)
}

fn parse_flag(vars: &impl Variables, name: &str, default: bool) -> Result<bool> {
    let Some(raw) = vars.get(name) else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(anyhow!("{name} must be a boolean, got '{other}'")),
    }
}

fn header_name(vars: &impl Variables, name: &str, default: &str) -> Result<String> {
    let value = field_name(vars, name, default);
    let valid = value.bytes().all(|b| {
        b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
    });
    if !valid {
        return Err(anyhow!("{name} is not a valid header name: '{value}'"));
    }
    Ok(value)
}

fn validate_identity_headers(couchdb: &CouchDbSettings) -> Result<()> {
    let names = couchdb.identity_headers().map(str::to_ascii_lowercase);
    for (i, name) in names.iter().enumerate() {
        if name == "authorization" || name == "cookie" {
            return Err(anyhow!("CouchDB header name '{name}' is reserved"));
        }
        if names.iter().skip(i + 1).any(|other| other == name) {
            return Err(anyhow!("CouchDB header names must be distinct, '{name}' is repeated"));
        }
    }
    Ok(())
}

fn parse_origin(value: &str) -> Result<Url> {
    let url = Url::parse(value.trim()).with_context(|| format!("origin_url is not a valid URL: {value}"))?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(url),
        _ => Err(anyhow!("origin_url must be an http(s) URL with a host: {value}")),
    }
}
