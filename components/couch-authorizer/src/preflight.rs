//! CORS preflight responses

use crate::request::EdgeRequest;

const ALLOWED_METHODS: &str = "GET,HEAD,PUT,PATCH,POST,DELETE";
const DEFAULT_ALLOWED_HEADERS: &str = "Authorization, Content-Type";

/// Response produced without contacting the origin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheticResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl SyntheticResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Answer an OPTIONS request, echoing the caller's origin and requested headers
pub fn respond(req: &EdgeRequest) -> SyntheticResponse {
    let origin = req.headers.first("origin").unwrap_or("*");
    let allow_headers = req
        .headers
        .first("access-control-request-headers")
        .unwrap_or(DEFAULT_ALLOWED_HEADERS);

    let headers = [
        ("Access-Control-Allow-Origin", origin),
        ("Access-Control-Allow-Credentials", "true"),
        ("Access-Control-Allow-Methods", ALLOWED_METHODS),
        ("Access-Control-Allow-Headers", allow_headers),
    ];

    SyntheticResponse {
        status: 204,
        headers: headers
            .into_iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect(),
        body: None,
    }
}
