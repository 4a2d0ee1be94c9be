//! End-to-end workflow tests against a mock API server

use cloudctl_core::attachment::{AttachmentMode, AttachmentRecord};
use cloudctl_core::operation::Poller;
use cloudctl_core::testing::ManualClock;
use cloudctl_core::workflows::{
    CreateDiskParams, create_disk_and_wait, delete_disk_and_wait, find_disk,
    update_instance_disks_and_wait,
};
use cloudctl_core::{ApiClient, CoreError, Mutation, PollConfig};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PROJECT: &str = "proj-1";

fn poller() -> Poller<ManualClock> {
    Poller::with_clock(PollConfig::default(), ManualClock::new())
}

fn operation(id: &str, state: &str, result: Value) -> Value {
    json!({"operation_id": id, "state": state, "metadata": {}, "result": result})
}

fn submitted(id: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "operation": operation(id, "IN_PROGRESS", Value::Null)
    }))
}

fn disk_json(id: &str) -> Value {
    json!({
        "id": id,
        "name": "data",
        "location": "us-east1-a",
        "type": "persistent-ssd",
        "size": "200GiB",
        "serial_number": "SN-1",
        "block_size": 4096
    })
}

async fn mount_instance(server: &MockServer, disks: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/projects/{PROJECT}/compute/vms/instances/vm-1")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "vm-1",
            "name": "trainer",
            "project_id": PROJECT,
            "location": "us-east1-a",
            "type": "a100.8x",
            "disks": disks
        })))
        .mount(server)
        .await;
}

async fn mount_instance_operation(server: &MockServer, id: &str, state: &str, result: Value) {
    Mock::given(method("GET"))
        .and(path(format!(
            "/projects/{PROJECT}/compute/vms/instances/operations/{id}"
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(operation(id, state, result)))
        .mount(server)
        .await;
}

fn rw(id: &str) -> AttachmentRecord {
    AttachmentRecord::data(id, AttachmentMode::ReadWrite)
}

fn ro(id: &str) -> AttachmentRecord {
    AttachmentRecord::data(id, AttachmentMode::ReadOnly)
}

#[tokio::test]
async fn create_disk_waits_and_resolves_disk() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/projects/{PROJECT}/storage/disks")))
        .and(body_json(json!({
            "name": "data",
            "location": "us-east1-a",
            "type": "persistent-ssd",
            "size": "200GiB",
            "block_size": 4096
        })))
        .respond_with(submitted("op-1"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/projects/{PROJECT}/storage/disks/operations/op-1")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(operation("op-1", "SUCCEEDED", disk_json("disk-1"))),
        )
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri(), "token").unwrap();
    let disk = create_disk_and_wait(
        &client,
        &poller(),
        PROJECT,
        CreateDiskParams::new("data", "us-east1-a", "200GiB"),
    )
    .await
    .unwrap();

    assert_eq!(disk.id, "disk-1");
    assert_eq!(disk.block_size, 4096);
}

#[tokio::test]
async fn delete_disk_surfaces_domain_failure() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(format!("/projects/{PROJECT}/storage/disks/disk-1")))
        .respond_with(submitted("op-del"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/projects/{PROJECT}/storage/disks/operations/op-del")))
        .respond_with(ResponseTemplate::new(200).set_body_json(operation(
            "op-del",
            "FAILED",
            json!({"code": "disk_attached", "message": "disk is attached to a VM"}),
        )))
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri(), "token").unwrap();
    let err = delete_disk_and_wait(&client, &poller(), PROJECT, "disk-1")
        .await
        .unwrap_err();

    match err {
        CoreError::OperationFailed { operation_id, cause } => {
            assert_eq!(operation_id, "op-del");
            assert_eq!(cause.code.as_deref(), Some("disk_attached"));
            assert_eq!(cause.message, "disk is attached to a VM");
        }
        other => panic!("expected operation failure, got {other:?}"),
    }
}

#[tokio::test]
async fn find_disk_returns_none_when_deleted_out_of_band() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/projects/{PROJECT}/storage/disks")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"items": [disk_json("disk-2")]})),
        )
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri(), "token").unwrap();

    assert!(find_disk(&client, PROJECT, "disk-1").await.unwrap().is_none());
    let found = find_disk(&client, PROJECT, "disk-2").await.unwrap();
    assert_eq!(found.map(|d| d.id), Some("disk-2".to_string()));
}

#[tokio::test]
async fn update_instance_disks_detaches_then_attaches() {
    let server = MockServer::start().await;
    mount_instance(
        &server,
        json!([
            {"id": "boot", "attachment_type": "os", "mode": "read-write"},
            {"id": "disk-a", "attachment_type": "data", "mode": "read-write"}
        ]),
    )
    .await;
    Mock::given(method("POST"))
        .and(path(format!(
            "/projects/{PROJECT}/compute/vms/instances/vm-1/detach-disks"
        )))
        .and(body_json(json!({"detach_disks": ["disk-a"]})))
        .respond_with(submitted("op-detach"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!(
            "/projects/{PROJECT}/compute/vms/instances/vm-1/attach-disks"
        )))
        .and(body_json(json!({"attach_disks": [
            {"disk_id": "disk-a", "attachment_type": "data", "mode": "read-only"}
        ]})))
        .respond_with(submitted("op-attach"))
        .expect(1)
        .mount(&server)
        .await;
    mount_instance_operation(&server, "op-detach", "SUCCEEDED", Value::Null).await;
    mount_instance_operation(&server, "op-attach", "SUCCEEDED", Value::Null).await;

    let client = ApiClient::new(&server.uri(), "token").unwrap();
    let outcome = update_instance_disks_and_wait(&client, &poller(), PROJECT, "vm-1", &[ro("disk-a")])
        .await
        .unwrap();

    assert_eq!(outcome.detached, vec![rw("disk-a")]);
    assert_eq!(outcome.attached, vec![ro("disk-a")]);
    assert_eq!(outcome.attachments, vec![ro("disk-a")]);

    // The detach operation is awaited before the attach is submitted
    let requests = server.received_requests().await.unwrap();
    let paths: Vec<String> = requests.iter().map(|r| r.url.path().to_string()).collect();
    let detach_done = paths
        .iter()
        .position(|p| p.ends_with("/operations/op-detach"))
        .unwrap();
    let attach_submitted = paths.iter().position(|p| p.ends_with("/attach-disks")).unwrap();
    assert!(detach_done < attach_submitted, "order was {paths:?}");
}

#[tokio::test]
async fn update_instance_disks_without_changes_makes_no_mutations() {
    let server = MockServer::start().await;
    mount_instance(
        &server,
        json!([{"id": "disk-a", "attachment_type": "data", "mode": "read-only"}]),
    )
    .await;

    let client = ApiClient::new(&server.uri(), "token").unwrap();
    let outcome = update_instance_disks_and_wait(&client, &poller(), PROJECT, "vm-1", &[ro("disk-a")])
        .await
        .unwrap();

    assert!(outcome.is_noop());
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
}

#[tokio::test]
async fn update_instance_disks_reports_partial_progress() {
    let server = MockServer::start().await;
    mount_instance(&server, json!([])).await;
    Mock::given(method("POST"))
        .and(path(format!(
            "/projects/{PROJECT}/compute/vms/instances/vm-1/attach-disks"
        )))
        .and(body_json(json!({"attach_disks": [
            {"disk_id": "disk-a", "attachment_type": "data", "mode": "read-write"}
        ]})))
        .respond_with(submitted("op-1"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!(
            "/projects/{PROJECT}/compute/vms/instances/vm-1/attach-disks"
        )))
        .and(body_json(json!({"attach_disks": [
            {"disk_id": "disk-b", "attachment_type": "data", "mode": "read-write"}
        ]})))
        .respond_with(submitted("op-2"))
        .mount(&server)
        .await;
    mount_instance_operation(&server, "op-1", "SUCCEEDED", Value::Null).await;
    mount_instance_operation(
        &server,
        "op-2",
        "FAILED",
        json!({"code": "quota", "message": "too many disks"}),
    )
    .await;

    let client = ApiClient::new(&server.uri(), "token").unwrap();
    let err = update_instance_disks_and_wait(
        &client,
        &poller(),
        PROJECT,
        "vm-1",
        &[rw("disk-a"), rw("disk-b"), rw("disk-c")],
    )
    .await
    .unwrap_err();

    assert_eq!(err.applied_mutations(), &[Mutation::Attach(rw("disk-a"))]);
    match err {
        CoreError::PartialReconcile { failed, source, .. } => {
            assert_eq!(failed, Mutation::Attach(rw("disk-b")));
            assert!(source.to_string().contains("too many disks"));
        }
        other => panic!("expected partial reconcile, got {other:?}"),
    }
}

#[tokio::test]
async fn update_instance_disks_rejects_repeated_disk_before_any_request() {
    let server = MockServer::start().await;
    mount_instance(&server, json!([])).await;

    let client = ApiClient::new(&server.uri(), "token").unwrap();
    let err = update_instance_disks_and_wait(
        &client,
        &poller(),
        PROJECT,
        "vm-1",
        &[rw("disk-a"), ro("disk-a")],
    )
    .await
    .unwrap_err();

    assert!(err.is_invalid_input(), "got {err:?}");
    assert!(server.received_requests().await.unwrap().is_empty());
}
