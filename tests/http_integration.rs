//! Integration tests for the Leshan REST client using wiremock
//!
//! These tests drive the real reqwest transport against mocked server
//! endpoints, covering every verb, error propagation and discovery.

use leshan_rest::topology::StaticSource;
use leshan_rest::{Client, ClientAddress, Error, HttpTransport, Query, Server, Topology, TopologySource};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TIMEOUT: Duration = Duration::from_secs(2);

fn topology() -> Topology {
    let mut topology = Topology::new();
    topology.insert("Temperature", "0", "Sensor Value", "/3303/0/5700").unwrap();
    topology.insert("Temperature", "0", "Sensor Units", "/3303/0/5701").unwrap();
    topology.insert("Device", "0", "Reboot", "/3/0/4").unwrap();
    topology.insert("Device", "0", "Battery Level", "/3/0/9").unwrap();
    topology.insert("Connectivity Monitoring", "0", "Battery Level", "/4/0/9").unwrap();
    topology
}

fn client_for(server: &MockServer) -> Client {
    let address = ClientAddress::parse(&format!("{}/#/clients/sensor-1", server.uri())).unwrap();
    Client::with_transport(address, topology(), HttpTransport::new().unwrap())
}

/// Test module for the client facade
mod client_tests {
    use super::*;

    /// Read returns `content.value` of the response
    #[tokio::test]
    async fn test_read_returns_value() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/clients/sensor-1/3303/0/5700"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "CONTENT",
                "valid": true,
                "success": true,
                "content": {"id": 5700, "value": 21.5}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let value = client_for(&server)
            .read("sensor value", TIMEOUT)
            .await
            .expect("read should succeed");
        assert_eq!(value, json!(21.5));
    }

    /// A device-level failure reported with 200 has no content
    #[tokio::test]
    async fn test_read_without_content_is_missing_field() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/clients/sensor-1/3303/0/5701"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "NOT_FOUND",
                "valid": false
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .read("Sensor Units", TIMEOUT)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingField { .. }), "{err:?}");
    }

    /// Write issues PUT with id and value
    #[tokio::test]
    async fn test_write_puts_id_and_value() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/api/clients/sensor-1/3303/0/5701"))
            .and(body_json(json!({"id": 5701, "value": "Cel"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "CHANGED"})))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server)
            .write("sensor units", "Cel", TIMEOUT)
            .await
            .expect("write should succeed");
    }

    /// Observe, discover, execute and delete hit their own targets
    #[tokio::test]
    async fn test_other_verbs() {
        let server = MockServer::start().await;

        for (verb, target) in [
            ("POST", "/api/clients/sensor-1/3303/0/5700/observe"),
            ("GET", "/api/clients/sensor-1/3303/0/5700/discover"),
            ("POST", "/api/clients/sensor-1/3/0/4"),
            ("DELETE", "/api/clients/sensor-1/3303/0/5700"),
        ] {
            Mock::given(method(verb))
                .and(path(target))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "CHANGED"})))
                .expect(1)
                .mount(&server)
                .await;
        }

        let client = client_for(&server);
        client.observe("Sensor Value", TIMEOUT).await.unwrap();
        client.discover("Sensor Value", TIMEOUT).await.unwrap();
        client.execute("reboot", TIMEOUT).await.unwrap();
        client.delete("Sensor Value", TIMEOUT).await.unwrap();
    }

    /// Empty success bodies are fine for non-read verbs
    #[tokio::test]
    async fn test_empty_response() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/clients/sensor-1/3/0/4"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        client_for(&server)
            .execute(Query::new("Reboot").object("device").instance(0), TIMEOUT)
            .await
            .expect("execute should succeed");
    }

    /// Non-success status propagates unchanged
    #[tokio::test]
    async fn test_error_status_propagates() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/clients/sensor-1/3/0/9"))
            .respond_with(ResponseTemplate::new(500).set_body_string("Internal error"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server)
            .read(Query::new("battery level").object("Device"), TIMEOUT)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Status { status: 500, .. }), "{err:?}");
        assert!(err.is_transport_failure());
    }

    /// Slow responses surface as a distinct timeout error
    #[tokio::test]
    async fn test_timeout_is_distinct() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/clients/sensor-1/3303/0/5700"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"content": {"value": 1}}))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let err = client_for(&server)
            .read("Sensor Value", Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(err.is_timeout(), "{err:?}");
    }

    /// Ambiguous queries never reach the server
    #[tokio::test]
    async fn test_ambiguous_query_sends_nothing() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = client_for(&server)
            .read("Battery Level", TIMEOUT)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AmbiguousMatch { .. }), "{err:?}");
    }

    /// assert_read compares the read value
    #[tokio::test]
    async fn test_assert_read() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/clients/sensor-1/3303/0/5701"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"content": {"value": "Cel"}})))
            .mount(&server)
            .await;

        let client = client_for(&server);
        client.assert_read("Sensor Units", "Cel", TIMEOUT).await.unwrap();
        let err = client.assert_read("Sensor Units", "Far", TIMEOUT).await.unwrap_err();
        assert!(matches!(err, Error::AssertionFailed { .. }));
    }
}

/// Test module for server-level calls and discovery
mod server_tests {
    use super::*;

    async fn mount_registrations(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/api/clients"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"endpoint": "sensor-1", "registrationId": "a1", "lifetime": 300},
                {"endpoint": "sensor-2", "registrationId": "b2", "lifetime": 300}
            ])))
            .mount(server)
            .await;
    }

    /// Client listing returns endpoint names
    #[tokio::test]
    async fn test_list_clients() {
        let server = MockServer::start().await;
        mount_registrations(&server).await;

        let leshan = Server::new(&format!("{}/#/clients", server.uri())).unwrap();
        let clients = leshan.clients(TIMEOUT).await.unwrap();
        assert_eq!(clients, vec!["sensor-1", "sensor-2"]);
    }

    /// Connect every registered client with a shared topology source
    #[tokio::test]
    async fn test_connect_all() {
        let server = MockServer::start().await;
        mount_registrations(&server).await;

        let leshan = Server::new(&server.uri()).unwrap();
        let source = StaticSource::new(topology());
        let clients = leshan.connect_all(&source, false, TIMEOUT).await.unwrap();

        assert_eq!(clients.len(), 2);
        assert_eq!(clients[1].endpoint(), "sensor-2");
        assert_eq!(
            clients[1].address().rest_base(),
            format!("{}/api/clients/sensor-2", server.uri())
        );
    }

    /// The API source combines object links with object specs
    #[tokio::test]
    async fn test_api_source_discovers_topology() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/clients/sensor-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "endpoint": "sensor-1",
                "rootPath": "/",
                "objectLinks": [
                    {"url": "/", "attributes": {"rt": "oma.lwm2m"}},
                    {"url": "/3/0", "attributes": {}},
                    {"url": "/3303/0", "attributes": {}},
                    {"url": "/3303/1", "attributes": {}},
                    {"url": "/9999/0", "attributes": {}}
                ]
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/objectspecs/sensor-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {
                    "name": "Device", "id": 3, "instancetype": "single",
                    "resourcedefs": [
                        {"id": 4, "name": "Reboot", "operations": "E"},
                        {"id": 9, "name": "Battery Level", "operations": "R"}
                    ]
                },
                {
                    "name": "Temperature", "id": 3303, "instancetype": "multiple",
                    "resourcedefs": [{"id": 5700, "name": "Sensor Value", "operations": "R"}]
                }
            ])))
            .mount(&server)
            .await;

        let leshan = Server::new(&server.uri()).unwrap();
        let topology = leshan
            .api_source(TIMEOUT)
            .fetch_topology("sensor-1", true)
            .await
            .unwrap();

        assert_eq!(topology.len(), 2);
        assert_eq!(topology.resource_count(), 4);
        let path = leshan_rest::resolve(&topology, &Query::new("sensor value").instance(1)).unwrap();
        assert_eq!(path.as_str(), "/3303/1/5700");
    }

    /// A client with no known objects is a structural error
    #[tokio::test]
    async fn test_api_source_rejects_empty_topology() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/clients/sensor-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"objectLinks": []})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/objectspecs/sensor-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let leshan = Server::new(&server.uri()).unwrap();
        let err = leshan
            .api_source(TIMEOUT)
            .fetch_topology("sensor-1", true)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::EmptyTopology { .. }), "{err:?}");
    }

    /// 404 on listing clients surfaces as status error
    #[tokio::test]
    async fn test_list_clients_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/clients"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let leshan = Server::new(&server.uri()).unwrap();
        let err = leshan.clients(TIMEOUT).await.unwrap_err();
        assert!(matches!(err, Error::Status { status: 404, .. }), "{err:?}");
    }
}
