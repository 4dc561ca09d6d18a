//! CouchDB Authorizer - edge JWT authentication for CouchDB proxy authentication
//!
//! Every request is inspected for an access token (bearer header, `jwt_token`
//! cookie or `token` query parameter). A valid token is turned into the
//! `X-Auth-CouchDB-*` headers CouchDB trusts; anything else is forwarded
//! without identity so CouchDB treats it as anonymous.

use anyhow::anyhow;
use spin_sdk::http::{IncomingRequest, IntoResponse, Response};

pub mod auth;
pub mod config;
pub mod error;
mod forwarding;
mod logging;
pub mod pipeline;
pub mod preflight;
pub mod request;
pub mod rewrite;
pub mod token;

#[cfg(test)]
mod test_support;

use config::Config;
use pipeline::Decision;
use preflight::SyntheticResponse;
use request::EdgeRequest;

/// Main HTTP component handler
#[spin_sdk::http_component]
async fn handle_request(req: IncomingRequest) -> anyhow::Result<impl IntoResponse> {
    // Nothing is served, not even preflight, without the required secrets
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            logging::init("error");
            tracing::error!(error = %format!("{e:#}"), "invalid configuration, refusing to serve");
            return Err(e);
        }
    };
    logging::init(&config.log_level);

    let method = req.method();
    let mut edge = EdgeRequest::from(&req);

    match pipeline::process(&mut edge, &config) {
        Decision::Respond(response) => Ok(into_response(response)),
        Decision::Forward(_) => {
            let body = req
                .into_body()
                .await
                .map_err(|e| anyhow!("Failed to read request body: {e:?}"))?;
            forwarding::forward_to_origin(&method, body, &edge, &config).await
        }
    }
}

fn into_response(synthetic: SyntheticResponse) -> Response {
    let mut binding = Response::builder();
    let mut builder = binding.status(synthetic.status);

    for (key, value) in &synthetic.headers {
        builder = builder.header(key, value);
    }

    match synthetic.body {
        Some(body) => builder.body(body).build(),
        None => builder.build(),
    }
}
