//! Credential location
//!
//! Sources are tried in a fixed order: `Authorization: Bearer`, then the
//! `jwt_token` cookie. A `token` query parameter overrides both and is always
//! removed from the forwarded query string so it never reaches the origin.
//!
//! A present but malformed `Authorization` header does not fall through to the
//! cookie. The query parameter is still consulted.

use std::fmt;

use crate::config::TokenSources;
use crate::request::EdgeRequest;

/// Cookie carrying the token
pub const TOKEN_COOKIE: &str = "jwt_token";

/// Query parameter carrying the token
pub const TOKEN_QUERY_PARAM: &str = "token";

/// Where a token was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    AuthorizationHeader,
    Cookie,
    QueryString,
}

impl fmt::Display for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AuthorizationHeader => "header",
            Self::Cookie => "cookie",
            Self::QueryString => "query",
        })
    }
}

/// A candidate credential, not yet validated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedToken {
    pub token: String,
    pub source: TokenSource,
}

/// Find the request's token, stripping it from the query string when present there
pub fn locate_token(req: &mut EdgeRequest, sources: TokenSources) -> Option<LocatedToken> {
    let mut found = if req.headers.contains("authorization") && !sources.disable_auth_header {
        let located = req
            .headers
            .first("authorization")
            .and_then(parse_bearer)
            .map(|token| LocatedToken {
                token: token.to_string(),
                source: TokenSource::AuthorizationHeader,
            });
        if located.is_none() {
            tracing::debug!("authorization header is not a bearer credential");
        }
        located
    } else if req.headers.contains("cookie") && !sources.disable_cookie {
        req.cookies()
            .into_iter()
            .find(|(name, _)| name == TOKEN_COOKIE)
            .map(|(_, token)| LocatedToken {
                token,
                source: TokenSource::Cookie,
            })
    } else {
        None
    };

    // Stripped even when the source is disabled so tokens never reach origin logs
    if let Some(token) = req.take_query_param(TOKEN_QUERY_PARAM)
        && !sources.disable_query_string
        && !token.is_empty()
    {
        found = Some(LocatedToken {
            token,
            source: TokenSource::QueryString,
        });
    }

    found.filter(|located| !located.token.is_empty())
}

/// `Bearer <token>`, exactly two space-separated parts, scheme case-insensitive
fn parse_bearer(value: &str) -> Option<&str> {
    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => Some(token),
        _ => None,
    }
}
