//! Request forwarding to the CouchDB origin

use anyhow::anyhow;
use futures::SinkExt;
use spin_sdk::http::{Headers, Method, OutgoingRequest, Response, Scheme};

use crate::config::Config;
use crate::request::EdgeRequest;

/// Connection-level headers that must not be copied between hops
const HOP_BY_HOP_HEADERS: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "host",
];

fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP_HEADERS
        .iter()
        .any(|hop| hop.eq_ignore_ascii_case(name))
}

/// Send the rewritten request to the origin and relay its response
pub async fn forward_to_origin(
    method: &Method,
    body: Vec<u8>,
    edge: &EdgeRequest,
    config: &Config,
) -> anyhow::Result<Response> {
    let origin = &config.origin_url;

    let outgoing = OutgoingRequest::new(build_forwarding_headers(edge)?);

    outgoing
        .set_method(method)
        .map_err(|()| anyhow!("Failed to set method"))?;

    let scheme = if origin.scheme() == "https" {
        Scheme::Https
    } else {
        Scheme::Http
    };
    outgoing
        .set_scheme(Some(&scheme))
        .map_err(|()| anyhow!("Failed to set scheme"))?;

    if let Some(host) = origin.host_str() {
        let authority = origin
            .port()
            .map_or_else(|| host.to_string(), |port| format!("{host}:{port}"));
        outgoing
            .set_authority(Some(&authority))
            .map_err(|()| anyhow!("Failed to set authority"))?;
    }

    let path_with_query = join_path(origin.path(), &edge.path, &edge.querystring);
    outgoing
        .set_path_with_query(Some(&path_with_query))
        .map_err(|()| anyhow!("Failed to set path"))?;

    if !body.is_empty() {
        let mut outgoing_body = outgoing.take_body();
        outgoing_body
            .send(body)
            .await
            .map_err(|e| anyhow!("Failed to send body: {e:?}"))?;
    }

    tracing::debug!(path = %path_with_query, "forwarding to origin");
    let response: Response = spin_sdk::http::send(outgoing).await.map_err(|e| {
        tracing::error!(error = %e, "origin request failed");
        anyhow!("Failed to reach origin: {e}")
    })?;

    let status = *response.status();
    tracing::debug!(status, "origin responded");
    let headers: Vec<(String, String)> = response
        .headers()
        .filter(|(name, _)| !is_hop_by_hop(name))
        .filter_map(|(name, value)| {
            std::str::from_utf8(value.as_bytes())
                .ok()
                .map(|value| (name.to_string(), value.to_string()))
        })
        .collect();

    Ok(build_origin_response(status, headers, response.into_body()))
}

/// Copy the rewritten request headers onto the outbound request
fn build_forwarding_headers(edge: &EdgeRequest) -> anyhow::Result<Headers> {
    let headers = Headers::new();

    for entry in edge.headers.iter().filter(|entry| !is_hop_by_hop(&entry.key)) {
        headers.append(&entry.key, &entry.value.as_bytes().to_vec())?;
    }

    Ok(headers)
}

/// Append the request path to the origin's base path, then the query string
fn join_path(base: &str, path: &str, query: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.strip_prefix('/').unwrap_or(path);
    let combined = format!("{base}/{path}");

    if query.is_empty() {
        combined
    } else {
        format!("{combined}?{query}")
    }
}

fn build_origin_response(status: u16, headers: Vec<(String, String)>, body: Vec<u8>) -> Response {
    let mut binding = Response::builder();
    let mut builder = binding.status(status);

    for (name, value) in headers {
        builder = builder.header(&name, &value);
    }

    builder.body(body).build()
}
