//! Integration tests for ARM long-running operations using wiremock.
//!
//! Each test drives `LroReconciler` with `ArmClient` as the poller, covering
//! the three ARM polling protocols, terminal failures, rejection, transient
//! poll errors and cancellation.

mod common;

use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use azad_provision::azure::ResourceId;
use azad_provision::error::{AzadError, OperationError};
use azad_provision::lro::OperationContext;
use tokio_util::sync::CancellationToken;

use common::{SUBSCRIPTION, TOKEN};

const API_VERSION: &str = "2017-01-01";

fn resource_id() -> ResourceId {
    ResourceId::in_resource_group(SUBSCRIPTION, "identity-rg", "Microsoft.AAD", "domainServices", "corp.example.com")
}

fn context() -> OperationContext {
    OperationContext::new("Creating/Updating", "AAD Domain Services \"corp.example.com\"")
}

// =============================================================================
// Azure-AsyncOperation
// =============================================================================

#[tokio::test]
async fn test_async_operation_header_is_polled_until_succeeded() {
    let server = MockServer::start().await;
    let id = resource_id();
    let monitor = format!("{}/operations/op-1", server.uri());

    Mock::given(method("PUT"))
        .and(path(id.path()))
        .and(query_param("api-version", API_VERSION))
        .and(header("Authorization", format!("Bearer {TOKEN}").as_str()))
        .respond_with(
            ResponseTemplate::new(201)
                .insert_header("Azure-AsyncOperation", monitor.as_str())
                .set_body_json(json!({ "properties": { "provisioningState": "Creating" } })),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/operations/op-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "InProgress" })))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/operations/op-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "Succeeded" })))
        .expect(1)
        .mount(&server)
        .await;

    let arm = common::arm(&server);
    let reconciler = common::reconciler(CancellationToken::new());
    let body = json!({ "properties": { "domainName": "corp.example.com" } });

    let result = reconciler
        .reconcile(&context(), || arm.begin_put(&id, API_VERSION, &body), &arm)
        .await
        .expect("operation succeeds");

    assert_eq!(result, Some(json!({ "status": "Succeeded" })));
}

#[tokio::test]
async fn test_async_operation_failure_carries_remote_code() {
    let server = MockServer::start().await;
    let id = resource_id();
    let monitor = format!("{}/operations/op-2", server.uri());

    Mock::given(method("PUT"))
        .and(path(id.path()))
        .respond_with(ResponseTemplate::new(201).insert_header("Azure-AsyncOperation", monitor.as_str()))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/operations/op-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "Failed",
            "error": {
                "code": "SubnetNotDelegated",
                "message": "The subnet is not available for Domain Services"
            }
        })))
        .mount(&server)
        .await;

    let arm = common::arm(&server);
    let reconciler = common::reconciler(CancellationToken::new());
    let body = json!({});

    let err = reconciler
        .reconcile(&context(), || arm.begin_put(&id, API_VERSION, &body), &arm)
        .await
        .unwrap_err();

    match err {
        AzadError::Operation(OperationError::OperationFailed { code, message, .. }) => {
            assert_eq!(code, "SubnetNotDelegated");
            assert_eq!(message, "The subnet is not available for Domain Services");
        }
        other => panic!("unexpected error: {other}"),
    }
}

// =============================================================================
// Location header
// =============================================================================

#[tokio::test]
async fn test_location_header_delete_completes_on_200() {
    let server = MockServer::start().await;
    let id = resource_id();
    let location = format!("{}/operationResults/del-1", server.uri());

    Mock::given(method("DELETE"))
        .and(path(id.path()))
        .respond_with(
            ResponseTemplate::new(202)
                .insert_header("Location", location.as_str())
                .insert_header("Retry-After", "0"),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/operationResults/del-1"))
        .respond_with(ResponseTemplate::new(202))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/operationResults/del-1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let arm = common::arm(&server);
    let reconciler = common::reconciler(CancellationToken::new());

    let result = reconciler
        .reconcile(
            &OperationContext::new("Deleting", "AAD Domain Services \"corp.example.com\""),
            || arm.begin_delete(&id, API_VERSION),
            &arm,
        )
        .await
        .expect("delete succeeds");

    assert_eq!(result, None);
}

#[tokio::test]
async fn test_delete_of_missing_resource_needs_no_polling() {
    let server = MockServer::start().await;
    let id = resource_id();

    Mock::given(method("DELETE"))
        .and(path(id.path()))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": { "code": "ResourceNotFound", "message": "gone" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let arm = common::arm(&server);
    let reconciler = common::reconciler(CancellationToken::new());

    reconciler
        .reconcile(&context(), || arm.begin_delete(&id, API_VERSION), &arm)
        .await
        .expect("already deleted");
}

// =============================================================================
// provisioningState on the resource
// =============================================================================

#[tokio::test]
async fn test_provisioning_state_is_polled_on_resource_url() {
    let server = MockServer::start().await;
    let id = resource_id();

    Mock::given(method("PUT"))
        .and(path(id.path()))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({ "properties": { "provisioningState": "Creating" } })),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(id.path()))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "properties": { "provisioningState": "Updating" } })),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(id.path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": id.to_string(),
            "properties": { "provisioningState": "Succeeded" }
        })))
        .mount(&server)
        .await;

    let arm = common::arm(&server);
    let reconciler = common::reconciler(CancellationToken::new());
    let body = json!({});

    let result = reconciler
        .reconcile(&context(), || arm.begin_put(&id, API_VERSION, &body), &arm)
        .await
        .expect("operation succeeds");

    let result = result.expect("final resource body");
    assert_eq!(result["id"], json!(id.to_string()));
}

#[tokio::test]
async fn test_synchronous_200_completes_without_polling() {
    let server = MockServer::start().await;
    let id = resource_id();

    Mock::given(method("PUT"))
        .and(path(id.path()))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "properties": { "provisioningState": "Succeeded" } })),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let arm = common::arm(&server);
    let reconciler = common::reconciler(CancellationToken::new());
    let body = json!({});

    reconciler
        .reconcile(&context(), || arm.begin_put(&id, API_VERSION, &body), &arm)
        .await
        .expect("operation succeeds");
}

// =============================================================================
// Rejection, transient errors, cancellation
// =============================================================================

#[tokio::test]
async fn test_rejected_request_is_not_polled() {
    let server = MockServer::start().await;
    let id = resource_id();

    Mock::given(method("PUT"))
        .and(path(id.path()))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "code": "InvalidDomainName", "message": "The domain name is not routable" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let arm = common::arm(&server);
    let reconciler = common::reconciler(CancellationToken::new());
    let body = json!({});

    let err = reconciler
        .reconcile(&context(), || arm.begin_put(&id, API_VERSION, &body), &arm)
        .await
        .unwrap_err();

    assert!(matches!(err, AzadError::Operation(OperationError::RequestRejected { .. })));
    assert!(err.to_string().contains("InvalidDomainName"), "{err}");
}

#[tokio::test]
async fn test_transient_poll_error_is_retried() {
    let server = MockServer::start().await;
    let id = resource_id();
    let monitor = format!("{}/operations/op-3", server.uri());

    Mock::given(method("PUT"))
        .and(path(id.path()))
        .respond_with(ResponseTemplate::new(201).insert_header("Azure-AsyncOperation", monitor.as_str()))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/operations/op-3"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/operations/op-3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "Succeeded" })))
        .mount(&server)
        .await;

    let arm = common::arm(&server);
    let reconciler = common::reconciler(CancellationToken::new());
    let body = json!({});

    reconciler
        .reconcile(&context(), || arm.begin_put(&id, API_VERSION, &body), &arm)
        .await
        .expect("transient failure is absorbed");
}

#[tokio::test]
async fn test_throttled_initiation_waits_for_retry_after() {
    let server = MockServer::start().await;
    let id = resource_id();

    Mock::given(method("PUT"))
        .and(path(id.path()))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "1"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path(id.path()))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "properties": { "provisioningState": "Succeeded" } })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let arm = common::arm(&server);
    let reconciler = common::reconciler(CancellationToken::new());
    let body = json!({});
    let started = std::time::Instant::now();

    reconciler
        .reconcile(&context(), || arm.begin_put(&id, API_VERSION, &body), &arm)
        .await
        .expect("throttled request is retried");

    assert!(started.elapsed() >= std::time::Duration::from_secs(1));
}

#[tokio::test]
async fn test_missing_status_monitor_fails_the_poll() {
    let server = MockServer::start().await;
    let id = resource_id();
    let monitor = format!("{}/operations/vanished", server.uri());

    Mock::given(method("PUT"))
        .and(path(id.path()))
        .respond_with(ResponseTemplate::new(201).insert_header("Azure-AsyncOperation", monitor.as_str()))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/operations/vanished"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let arm = common::arm(&server);
    let reconciler = common::reconciler(CancellationToken::new());
    let body = json!({});

    let err = reconciler
        .reconcile(&context(), || arm.begin_put(&id, API_VERSION, &body), &arm)
        .await
        .unwrap_err();

    assert!(matches!(err, AzadError::Operation(OperationError::PollFailed { .. })));
}

#[tokio::test]
async fn test_cancelled_token_sends_nothing() {
    let server = MockServer::start().await;
    let id = resource_id();
    let monitor = format!("{}/operations/op-4", server.uri());

    Mock::given(method("PUT"))
        .and(path(id.path()))
        .respond_with(ResponseTemplate::new(201).insert_header("Azure-AsyncOperation", monitor.as_str()))
        .expect(0)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/operations/op-4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "InProgress" })))
        .expect(0)
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    cancel.cancel();

    let arm = common::arm(&server);
    let reconciler = common::reconciler(cancel);
    let body = json!({});

    let err = reconciler
        .reconcile(&context(), || arm.begin_put(&id, API_VERSION, &body), &arm)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AzadError::Operation(OperationError::Timeout { cancelled: true, .. })
    ));
}
