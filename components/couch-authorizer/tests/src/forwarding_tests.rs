use spin_test_sdk::{
    bindings::{fermyon::spin_wasi_virt::http_handler, wasi::http},
    spin_test,
};

use crate::{
    request_helpers::{get, get_with_bearer},
    test_setup::{setup_default_test_config, ORIGIN},
    test_token_utils::{access_claims, create_test_token, create_token_with_secret},
    ResponseData,
};

/// Mock the origin at `path_with_query` with a fixed response
fn mock_origin(path_with_query: &str, status: u16, body: &[u8]) {
    let headers = http::types::Headers::new();
    headers.append("content-type", b"application/json").unwrap();
    headers.append("x-couchdb-body-time", b"0").unwrap();

    let response = http::types::OutgoingResponse::new(headers);
    response.set_status_code(status).unwrap();

    let outgoing_body = response.body().unwrap();
    outgoing_body.write_bytes(body);

    http_handler::set_response(
        &format!("{ORIGIN}{path_with_query}"),
        http_handler::ResponseHandler::Response(response),
    );
}

#[spin_test]
fn test_authenticated_request_passes_origin_response_through() {
    setup_default_test_config();
    mock_origin("/db/doc", 200, br#"{"_id":"doc"}"#);

    let token = create_test_token(&access_claims("alice", &["editor"]));
    let response =
        ResponseData::from_response(spin_test_sdk::perform_request(get_with_bearer("/db/doc", &token)));

    assert_eq!(response.status, 200);
    assert_eq!(response.body_text(), r#"{"_id":"doc"}"#);
    assert_eq!(
        response.find_header("x-couchdb-body-time").as_deref(),
        Some("0")
    );
}

// Anonymous requests are forwarded and CouchDB decides
#[spin_test]
fn test_request_without_token_is_forwarded() {
    setup_default_test_config();
    mock_origin(
        "/private",
        401,
        br#"{"error":"unauthorized","reason":"You are not authorized to access this db."}"#,
    );

    let response = ResponseData::from_response(spin_test_sdk::perform_request(get("/private", &[])));

    assert_eq!(response.status, 401);
    assert!(response.body_text().contains("unauthorized"));
}

#[spin_test]
fn test_forged_token_fails_open() {
    setup_default_test_config();
    mock_origin("/db", 200, br#"{"db_name":"db"}"#);

    let token = create_token_with_secret(&access_claims("mallory", &["_admin"]), "wrong-secret");
    let response =
        ResponseData::from_response(spin_test_sdk::perform_request(get_with_bearer("/db", &token)));

    // Forwarded rather than rejected at the edge
    assert_eq!(response.status, 200);
}

#[spin_test]
fn test_malformed_authorization_header_fails_open() {
    setup_default_test_config();
    mock_origin("/db", 200, br#"{"db_name":"db"}"#);

    let response = ResponseData::from_response(spin_test_sdk::perform_request(get(
        "/db",
        &[("authorization", b"Basic YWxpY2U6c2VjcmV0")],
    )));

    assert_eq!(response.status, 200);
}

// Only the stripped URL is mocked, so a leaked token would miss the mock
#[spin_test]
fn test_query_token_is_stripped_before_forwarding() {
    setup_default_test_config();
    mock_origin("/db/_changes?feed=longpoll", 200, br#"{"results":[]}"#);

    let token = create_test_token(&access_claims("alice", &["reader"]));
    let path = format!("/db/_changes?token={token}&feed=longpoll");
    let response = ResponseData::from_response(spin_test_sdk::perform_request(get(&path, &[])));

    assert_eq!(response.status, 200);
    assert_eq!(response.body_text(), r#"{"results":[]}"#);
}

#[spin_test]
fn test_cookie_token_is_accepted() {
    setup_default_test_config();
    mock_origin("/_session", 200, br#"{"ok":true}"#);

    let token = create_test_token(&access_claims("alice", &["reader"]));
    let cookie = format!("theme=dark; jwt_token={token}");
    let response = ResponseData::from_response(spin_test_sdk::perform_request(get(
        "/_session",
        &[("cookie", cookie.as_bytes())],
    )));

    assert_eq!(response.status, 200);
}
