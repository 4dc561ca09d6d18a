use spin_test_sdk::{bindings::wasi::http, spin_test};

use crate::{test_setup::setup_default_test_config, ResponseData};

#[spin_test]
fn test_preflight_echoes_origin() {
    setup_default_test_config();

    let headers = http::types::Headers::new();
    headers.append("origin", b"https://app.example.com").unwrap();
    headers
        .append("access-control-request-headers", b"X-Requested-With")
        .unwrap();
    let request = http::types::OutgoingRequest::new(headers);
    request.set_method(&http::types::Method::Options).unwrap();
    request.set_path_with_query(Some("/db/doc")).unwrap();

    let response = ResponseData::from_response(spin_test_sdk::perform_request(request));

    assert_eq!(response.status, 204);
    assert_eq!(
        response.find_header("access-control-allow-origin").as_deref(),
        Some("https://app.example.com")
    );
    assert_eq!(
        response.find_header("access-control-allow-credentials").as_deref(),
        Some("true")
    );
    assert_eq!(
        response.find_header("access-control-allow-methods").as_deref(),
        Some("GET,HEAD,PUT,PATCH,POST,DELETE")
    );
    assert_eq!(
        response.find_header("access-control-allow-headers").as_deref(),
        Some("X-Requested-With")
    );
}

#[spin_test]
fn test_preflight_without_origin_allows_any() {
    setup_default_test_config();

    let request = http::types::OutgoingRequest::new(http::types::Headers::new());
    request.set_method(&http::types::Method::Options).unwrap();
    request.set_path_with_query(Some("/")).unwrap();

    let response = ResponseData::from_response(spin_test_sdk::perform_request(request));

    assert_eq!(response.status, 204);
    assert_eq!(
        response.find_header("access-control-allow-origin").as_deref(),
        Some("*")
    );
    assert_eq!(
        response.find_header("access-control-allow-headers").as_deref(),
        Some("Authorization, Content-Type")
    );
}

// Preflight is answered at the edge even with a bearer token attached
#[spin_test]
fn test_preflight_never_reaches_origin() {
    setup_default_test_config();

    let headers = http::types::Headers::new();
    headers.append("authorization", b"Bearer whatever").unwrap();
    let request = http::types::OutgoingRequest::new(headers);
    request.set_method(&http::types::Method::Options).unwrap();
    request.set_path_with_query(Some("/db")).unwrap();

    let response = ResponseData::from_response(spin_test_sdk::perform_request(request));

    assert_eq!(response.status, 204);
    assert!(response.body.is_empty());
}
