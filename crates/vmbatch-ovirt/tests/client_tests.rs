use serde_json::json;
use vmbatch_core::{
    build_descriptor, ManagementApi, RemoteError, TemplateDefaults, VmId, WorkflowConfig,
};
use vmbatch_ovirt::{ConnectionConfig, OvirtClient};
use vmbatch_test_utils::data_generators::request;
use wiremock::matchers::{
    body_partial_json, body_string_contains, header, method, path, query_param,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "tok-123";

fn config_for(server: &MockServer) -> ConnectionConfig {
    ConnectionConfig::new(
        format!("{}/ovirt-engine/api", server.uri()),
        "admin@internal",
        "secret",
    )
}

async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/ovirt-engine/sso/oauth/token"))
        .and(body_string_contains("grant_type=password"))
        .and(body_string_contains("scope=ovirt-app-api"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": TOKEN,
            "token_type": "bearer"
        })))
        .expect(1)
        .mount(server)
        .await;
}

async fn connected(server: &MockServer) -> OvirtClient {
    mount_token(server).await;
    OvirtClient::connect(&config_for(server)).await.unwrap()
}

#[tokio::test]
async fn test_connect_rejected_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ovirt-engine/sso/oauth/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "access_denied",
            "error_description": "Cannot authenticate user"
        })))
        .mount(&server)
        .await;

    let err = OvirtClient::connect(&config_for(&server)).await.unwrap_err();
    match err {
        RemoteError::Connection(message) => {
            assert!(message.contains("Cannot authenticate user"), "{}", message)
        }
        other => panic!("Expected connection error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_connect_unreachable_engine() {
    // Nothing listens on the discard port.
    let config = ConnectionConfig::new("http://127.0.0.1:9/ovirt-engine/api", "admin", "x");
    let err = OvirtClient::connect(&config).await.unwrap_err();
    assert!(matches!(err, RemoteError::Connection(_)));
}

#[tokio::test]
async fn test_list_templates_filters_exact_name() {
    let server = MockServer::start().await;
    let client = connected(&server).await;

    Mock::given(method("GET"))
        .and(path("/ovirt-engine/api/templates"))
        .and(query_param("search", "name=rhel9"))
        .and(query_param("follow", "disk_attachments.disk,nics"))
        .and(header("authorization", format!("Bearer {}", TOKEN).as_str()))
        .and(header("version", "4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "template": [
                {
                    "id": "t-1",
                    "name": "rhel9",
                    "disk_attachments": {"disk_attachment": [{"disk": {"name": "rhel9_disk"}}]},
                    "nics": {"nic": [{"name": "nic1"}]}
                },
                {"id": "t-2", "name": "rhel9-old"}
            ]
        })))
        .mount(&server)
        .await;

    let templates = client.list_templates_by_name("rhel9").await.unwrap();
    assert_eq!(templates.len(), 1);
    assert_eq!(templates[0].id, "t-1");
    assert_eq!(templates[0].first_disk_name(), Some("rhel9_disk"));
    assert_eq!(templates[0].first_nic_name(), Some("nic1"));
}

#[tokio::test]
async fn test_list_templates_none_found() {
    let server = MockServer::start().await;
    let client = connected(&server).await;

    Mock::given(method("GET"))
        .and(path("/ovirt-engine/api/templates"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    assert!(client.list_templates_by_name("ghost").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_and_start_vm() {
    let server = MockServer::start().await;
    let client = connected(&server).await;

    let defaults = TemplateDefaults {
        disk_name: "rhel9_disk".to_string(),
        nic_name: "nic1".to_string(),
    };
    let descriptor = build_descriptor(
        &request("web01", "rhel9"),
        &defaults,
        &WorkflowConfig::default(),
    );

    Mock::given(method("POST"))
        .and(path("/ovirt-engine/api/vms"))
        .and(body_partial_json(json!({
            "name": "web01",
            "template": {"name": "rhel9"},
            "cpu": {"topology": {"cores": 2, "sockets": 1}}
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "vm-42",
            "name": "web01"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/ovirt-engine/api/vms/vm-42/start"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "complete"})))
        .expect(1)
        .mount(&server)
        .await;

    let vm_id = client.create_vm(&descriptor).await.unwrap();
    assert_eq!(vm_id, VmId("vm-42".to_string()));
    client.start_vm(&vm_id).await.unwrap();
}

#[tokio::test]
async fn test_fault_becomes_rejected() {
    let server = MockServer::start().await;
    let client = connected(&server).await;

    Mock::given(method("POST"))
        .and(path("/ovirt-engine/api/vms/vm-42/start"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "reason": "Operation Failed",
            "detail": "[Cannot run VM. There is no host that satisfies current scheduling constraints.]"
        })))
        .mount(&server)
        .await;

    let err = client.start_vm(&VmId("vm-42".to_string())).await.unwrap_err();
    match err {
        RemoteError::Rejected { status, reason } => {
            assert_eq!(status, 409);
            assert!(reason.starts_with("Operation Failed: [Cannot run VM."), "{}", reason);
        }
        other => panic!("Expected rejection, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unparseable_create_response() {
    let server = MockServer::start().await;
    let client = connected(&server).await;

    Mock::given(method("POST"))
        .and(path("/ovirt-engine/api/vms"))
        .respond_with(ResponseTemplate::new(201).set_body_string("<vm/>"))
        .mount(&server)
        .await;

    let defaults = TemplateDefaults {
        disk_name: "d".to_string(),
        nic_name: "n".to_string(),
    };
    let descriptor = build_descriptor(
        &request("web01", "rhel9"),
        &defaults,
        &WorkflowConfig::default(),
    );
    assert!(matches!(
        client.create_vm(&descriptor).await,
        Err(RemoteError::InvalidResponse(_))
    ));
}

#[tokio::test]
async fn test_close_revokes_token_once() {
    let server = MockServer::start().await;
    let client = connected(&server).await;

    Mock::given(method("GET"))
        .and(path("/ovirt-engine/services/sso-logout"))
        .and(query_param("token", TOKEN))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client.close().await.unwrap();
    assert!(client.is_closed().await);
    client.close().await.unwrap();

    assert_eq!(
        client.list_templates_by_name("rhel9").await.unwrap_err(),
        RemoteError::Closed
    );
}
