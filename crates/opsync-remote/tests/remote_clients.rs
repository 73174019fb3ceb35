//! ---
//! opsync_section: "03-remote-service"
//! opsync_subsection: "tests"
//! opsync_type: "source"
//! opsync_scope: "test"
//! opsync_description: "HTTP contract tests for the remote clients."
//! opsync_version: "v0.1.0"
//! opsync_owner: "tbd"
//! ---
use opsync_remote::{
    AckError, FetchError, RemoteConfigClient, RemoteTriggerClient, Resource, ServiceEndpoint,
};
use serde_json::json;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CLUSTER: &str = "cluster-a";

fn endpoint(server: &MockServer) -> ServiceEndpoint {
    let base: Url = server.uri().parse().unwrap();
    ServiceEndpoint::new(base).unwrap()
}

#[tokio::test]
async fn fetch_configuration_decodes_object() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/operator/configuration/cluster-a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "no_op": "X",
            "watch": ["a", "b"],
            "interval": 30
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = RemoteConfigClient::new(endpoint(&server));
    let delta = client.fetch(CLUSTER).await.unwrap();

    assert_eq!(delta.len(), 3);
    assert_eq!(delta.get("watch"), Some(&json!(["a", "b"])));
}

#[tokio::test]
async fn fetch_configuration_rejects_non_200() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/operator/configuration/cluster-a"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = RemoteConfigClient::new(endpoint(&server))
        .fetch(CLUSTER)
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::UnexpectedStatus { .. }));
    assert_eq!(err.status().map(|s| s.as_u16()), Some(500));
    assert_eq!(err.resource(), Resource::Configuration);
    assert_eq!(err.cluster(), CLUSTER);
    assert_eq!(err.url().path(), "/api/v1/operator/configuration/cluster-a");
    assert!(!err.is_decode());
}

#[tokio::test]
async fn fetch_configuration_treats_204_as_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let err = RemoteConfigClient::new(endpoint(&server))
        .fetch(CLUSTER)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "status");
}

#[tokio::test]
async fn fetch_configuration_reports_malformed_body_as_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/operator/configuration/cluster-a"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[1, 2, 3]"))
        .mount(&server)
        .await;

    let err = RemoteConfigClient::new(endpoint(&server))
        .fetch(CLUSTER)
        .await
        .unwrap_err();
    assert!(err.is_decode());
    assert_eq!(err.kind(), "decode");
}

#[tokio::test]
async fn fetch_configuration_accepts_empty_and_null_bodies() {
    for body in ["", "null"] {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/operator/configuration/cluster-a"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let delta = RemoteConfigClient::new(endpoint(&server))
            .fetch(CLUSTER)
            .await
            .unwrap();
        assert!(delta.is_empty(), "body {body:?} should decode to an empty delta");
    }
}

#[tokio::test]
async fn fetch_configuration_reports_unreachable_service() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let base: Url = format!("http://127.0.0.1:{port}").parse().unwrap();
    let client = RemoteConfigClient::new(ServiceEndpoint::new(base).unwrap());

    let err = client.fetch(CLUSTER).await.unwrap_err();
    assert_eq!(err.kind(), "transport");
}

#[tokio::test]
async fn cluster_is_sent_as_one_encoded_segment() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/operator/configuration/team%20a%2Fprod"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"k": 1})))
        .expect(1)
        .mount(&server)
        .await;

    let delta = RemoteConfigClient::new(endpoint(&server))
        .fetch("team a/prod")
        .await
        .unwrap();
    assert_eq!(delta.len(), 1);
}

#[tokio::test]
async fn fetch_triggers_preserves_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/operator/triggers/cluster-a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 3, "type": "must-gather", "reason": "r3"},
            {"id": 1, "type": "restart"},
            {"id": 2, "active": 1}
        ])))
        .mount(&server)
        .await;

    let triggers = RemoteTriggerClient::new(endpoint(&server))
        .fetch_triggers(CLUSTER)
        .await
        .unwrap();

    assert_eq!(triggers.iter().map(|t| t.id).collect::<Vec<_>>(), vec![3, 1, 2]);
    assert_eq!(triggers[0].kind, "must-gather");
    assert_eq!(triggers[0].reason, "r3");
    assert!(triggers[2].is_active());
}

#[tokio::test]
async fn fetch_triggers_handles_null_and_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/operator/triggers/cluster-a"))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/operator/triggers/cluster-b"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1})))
        .mount(&server)
        .await;

    let client = RemoteTriggerClient::new(endpoint(&server));
    assert!(client.fetch_triggers(CLUSTER).await.unwrap().is_empty());

    let err = client.fetch_triggers("cluster-b").await.unwrap_err();
    assert!(err.is_decode());
    assert_eq!(err.resource(), Resource::Triggers);
}

#[tokio::test]
async fn null_trigger_fields_do_not_drop_the_batch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/operator/triggers/cluster-a"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"[{"id":1,"type":"must-gather","cluster":null,"reason":"disk","link":null,"triggered_at":null,"triggered_by":"ops","parameters":null,"active":1},{"id":2,"type":null,"active":null}]"#,
        ))
        .mount(&server)
        .await;
    for id in [1, 2] {
        Mock::given(method("PUT"))
            .and(path(format!("/api/v1/operator/trigger/cluster-a/ack/{id}")))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
    }

    let client = RemoteTriggerClient::new(endpoint(&server));
    let triggers = client.fetch_triggers(CLUSTER).await.unwrap();

    assert_eq!(triggers.iter().map(|t| t.id).collect::<Vec<_>>(), vec![1, 2]);
    assert_eq!(triggers[0].kind, "must-gather");
    assert_eq!(triggers[0].link, "");
    assert_eq!(triggers[0].parameters, "");
    assert!(triggers[0].is_active());
    assert_eq!(triggers[1].kind, "");
    assert!(!triggers[1].is_active());

    for trigger in &triggers {
        client.acknowledge(CLUSTER, trigger.id).await.unwrap();
    }
}

#[tokio::test]
async fn acknowledge_accepts_200_201_202() {
    for (id, status) in [(1_i64, 200_u16), (2, 201), (3, 202)] {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path(format!("/api/v1/operator/trigger/cluster-a/ack/{id}")))
            .respond_with(ResponseTemplate::new(status))
            .expect(1)
            .mount(&server)
            .await;

        RemoteTriggerClient::new(endpoint(&server))
            .acknowledge(CLUSTER, id)
            .await
            .unwrap_or_else(|err| panic!("status {status} should be accepted: {err}"));

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].body.is_empty());
    }
}

#[tokio::test]
async fn acknowledge_rejects_other_statuses() {
    for status in [204_u16, 404, 500] {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/v1/operator/trigger/cluster-a/ack/42"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;

        let err = RemoteTriggerClient::new(endpoint(&server))
            .acknowledge(CLUSTER, 42)
            .await
            .unwrap_err();

        assert!(matches!(err, AckError::UnexpectedStatus { .. }));
        assert_eq!(err.trigger_id(), 42);
        assert_eq!(err.status().map(|s| s.as_u16()), Some(status));
    }
}
