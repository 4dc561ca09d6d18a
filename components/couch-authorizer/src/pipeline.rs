//! Request authorization pipeline
//!
//! Authentication failures never produce a response here. The request always
//! continues to the origin, either carrying CouchDB identity headers or with
//! every client-supplied identity header removed, and CouchDB makes its own
//! access decision.

use crate::auth::{self, TokenSource};
use crate::config::Config;
use crate::error::Rejection;
use crate::preflight::{self, SyntheticResponse};
use crate::request::EdgeRequest;
use crate::rewrite::{self, Identity};
use crate::token;

/// What the handler should do with the request
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Answer directly without contacting the origin
    Respond(SyntheticResponse),
    /// Forward the (rewritten) request to the origin
    Forward(Outcome),
}

/// Result of authorizing a forwarded request
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Identity headers were written
    Authenticated {
        identity: Identity,
        source: TokenSource,
    },
    /// Request continues without identity
    Anonymous(Rejection),
}

impl Outcome {
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }
}

/// Entry point for one invocation
pub fn process(req: &mut EdgeRequest, config: &Config) -> Decision {
    if req.is_preflight() {
        return Decision::Respond(preflight::respond(req));
    }
    Decision::Forward(authorize(req, config))
}

/// Locate and validate a token, then rewrite headers in place
pub fn authorize(req: &mut EdgeRequest, config: &Config) -> Outcome {
    let Some(located) = auth::locate_token(req, config.sources) else {
        rewrite::strip_untrusted(&mut req.headers, &config.couchdb);
        tracing::debug!(reason = Rejection::NoTokenFound.kind(), "no token, forwarding unauthenticated");
        return Outcome::Anonymous(Rejection::NoTokenFound);
    };

    match token::validate(&located.token, &config.jwt) {
        Ok(claims) => {
            let identity = Identity::from_claims(&claims, &config.couchdb.signer);
            rewrite::apply_identity(&mut req.headers, &identity, &config.couchdb);
            tracing::info!(
                username = %identity.username,
                roles = identity.roles.len(),
                source = %located.source,
                "request authenticated"
            );
            Outcome::Authenticated {
                identity,
                source: located.source,
            }
        }
        Err(rejection) => {
            rewrite::strip_untrusted(&mut req.headers, &config.couchdb);
            tracing::warn!(
                reason = rejection.kind(),
                source = %located.source,
                error = %rejection,
                "token rejected, forwarding unauthenticated"
            );
            Outcome::Anonymous(rejection)
        }
    }
}
