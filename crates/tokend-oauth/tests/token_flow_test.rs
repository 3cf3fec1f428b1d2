//! End-to-end token endpoint tests.

mod common;

use axum::http::StatusCode;
use tokend_oauth::flows::ClientVerification;
use tokend_oauth::mtls::MtlsHeaderNames;

use common::{app, body_json, decode_id_token, expect_error, post_token, test_state};

const VERIFIED_CERT_HEADERS: &[(&str, &str)] = &[
    ("X-Client-Cert-Present", "true"),
    ("X-Client-Cert-Chain-Verified", "true"),
    ("X-Client-Cert-Spiffe", "spiffe://prod/payments"),
    ("X-Client-Cert-Hash", "dGVzdC1maW5nZXJwcmludA"),
];

fn xlb_state() -> tokend_oauth::OAuthState {
    test_state(
        vec![ClientVerification::XlbMtls(MtlsHeaderNames::default())],
        &["svc-payments"],
    )
}

#[tokio::test]
async fn mtls_client_receives_an_id_token() {
    let response = post_token(
        app(xlb_state()),
        "grant_type=client_credentials&client_id=svc-payments",
        VERIFIED_CERT_HEADERS,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["token_type"], "Bearer");
    assert!(body.get("expires_in").is_none());
    assert!(body.get("access_token").is_none());
    assert!(body.get("scope").is_none());

    let claims = decode_id_token(body["id_token"].as_str().unwrap(), "svc-payments");
    assert_eq!(claims["amr"], "xlb-mtls-client-credentials");
    assert_eq!(claims["client_id"], "svc-payments");
    assert!(claims["auth_time"].as_i64().is_some());
    assert_eq!(claims["client"]["x5_spiffe"], "spiffe://prod/payments");
    assert_eq!(claims["client"]["x5_sha256"], "dGVzdC1maW5nZXJwcmludA");
}

#[tokio::test]
async fn scope_parameter_adds_an_access_token() {
    let response = post_token(
        app(xlb_state()),
        "grant_type=client_credentials&client_id=svc-payments&scope=read",
        VERIFIED_CERT_HEADERS,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["access_token"], "federated-access-token");
    assert_eq!(body["scope"], "read");
    assert_eq!(body["expires_in"], 3600);
    assert!(body["id_token"].as_str().is_some());
}

#[tokio::test]
async fn provider_without_scope_defaults_to_cloud_platform() {
    let response = post_token(
        app(xlb_state()),
        "grant_type=client_credentials&client_id=svc-payments&provider=prod-pool",
        VERIFIED_CERT_HEADERS,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["scope"], "https://www.googleapis.com/auth/cloud-platform");
    assert_eq!(body["access_token"], "federated-access-token");
}

#[tokio::test]
async fn blank_scope_means_no_access_token() {
    let response = post_token(
        app(xlb_state()),
        "grant_type=client_credentials&client_id=svc-payments&scope=",
        VERIFIED_CERT_HEADERS,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body.get("access_token").is_none());
    assert!(body.get("expires_in").is_none());
    assert!(body.get("scope").is_none());
}

#[tokio::test]
async fn impersonation_caps_lifetime_to_id_token_validity() {
    let response = post_token(
        app(xlb_state()),
        "grant_type=client_credentials&client_id=svc-payments&scope=read\
         &impersonate_service_account=robot%40example.iam.gserviceaccount.com",
        VERIFIED_CERT_HEADERS,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(
        body["access_token"],
        "impersonated:robot@example.iam.gserviceaccount.com"
    );
    let expires_in = body["expires_in"].as_i64().unwrap();
    assert!(expires_in > 0 && expires_in <= 300, "expires_in was {expires_in}");
}

#[tokio::test]
async fn service_account_without_at_sign_is_ignored() {
    let response = post_token(
        app(xlb_state()),
        "grant_type=client_credentials&client_id=svc-payments&scope=read&service_account=robot",
        VERIFIED_CERT_HEADERS,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["access_token"], "federated-access-token");
}

#[tokio::test]
async fn unverified_certificate_chain_is_denied() {
    let response = post_token(
        app(xlb_state()),
        "grant_type=client_credentials&client_id=svc-payments",
        &[
            ("X-Client-Cert-Present", "true"),
            ("X-Client-Cert-Chain-Verified", "false"),
            ("X-Client-Cert-Error", "unknown issuer"),
        ],
    )
    .await;
    expect_error(response, StatusCode::FORBIDDEN, "access_denied").await;
}

#[tokio::test]
async fn policy_rejection_is_denied() {
    let response = post_token(
        app(xlb_state()),
        "grant_type=client_credentials&client_id=svc-unknown",
        VERIFIED_CERT_HEADERS,
    )
    .await;
    expect_error(response, StatusCode::FORBIDDEN, "access_denied").await;
}

#[tokio::test]
async fn missing_grant_type_is_invalid_request() {
    let response = post_token(app(xlb_state()), "client_id=svc-payments", VERIFIED_CERT_HEADERS).await;
    expect_error(response, StatusCode::BAD_REQUEST, "invalid_request").await;
}

#[tokio::test]
async fn unknown_grant_type_is_invalid_request() {
    let response = post_token(
        app(xlb_state()),
        "grant_type=authorization_code&client_id=svc-payments",
        VERIFIED_CERT_HEADERS,
    )
    .await;
    expect_error(response, StatusCode::BAD_REQUEST, "invalid_request").await;
}

#[tokio::test]
async fn no_applicable_flow_without_certificate_headers() {
    let response = post_token(
        app(xlb_state()),
        "grant_type=client_credentials&client_id=svc-payments",
        &[],
    )
    .await;
    expect_error(response, StatusCode::BAD_REQUEST, "invalid_request").await;
}

#[tokio::test]
async fn first_parameter_value_wins() {
    let response = post_token(
        app(xlb_state()),
        "grant_type=client_credentials&client_id=svc-payments&scope=read&scope=write",
        VERIFIED_CERT_HEADERS,
    )
    .await;
    let body = body_json(response).await;
    assert_eq!(body["scope"], "read");
}

#[tokio::test]
async fn dispatcher_picks_the_first_applicable_flow() {
    let state = test_state(
        vec![
            ClientVerification::XlbMtls(MtlsHeaderNames::default()),
            ClientVerification::Direct,
        ],
        &["svc-payments"],
    );

    // Certificate headers present: the mTLS flow registered first wins.
    let response = post_token(
        app(state.clone()),
        "grant_type=client_credentials&client_id=svc-payments",
        VERIFIED_CERT_HEADERS,
    )
    .await;
    let body = body_json(response).await;
    let claims = decode_id_token(body["id_token"].as_str().unwrap(), "svc-payments");
    assert_eq!(claims["amr"], "xlb-mtls-client-credentials");

    // No certificate headers: the request falls through to the direct flow.
    let response = post_token(
        app(state),
        "grant_type=client_credentials&client_id=svc-payments",
        &[],
    )
    .await;
    let body = body_json(response).await;
    let claims = decode_id_token(body["id_token"].as_str().unwrap(), "svc-payments");
    assert_eq!(claims["amr"], "client-credentials");
    assert!(claims.get("client").is_none());
}
