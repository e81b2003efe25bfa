//! HTTP transport tests against a local mock server.

#![cfg(feature = "remote")]

use axl_client::{
    ConnectionConfig, DocumentOwner, DocumentStore, HttpService, Page, RawQuery, Record,
    RemoteService, ResourceClient, ResourceSchema, ServiceError, TransportError, UpsertAction,
};
use mockito::{Matcher, Server};
use serde_json::{json, Value};

// admin:secret
const AUTH: &str = "Basic YWRtaW46c2VjcmV0";

fn service(server: &Server) -> HttpService {
    HttpService::new(ConnectionConfig::new(server.url()).credentials("admin", "secret")).unwrap()
}

fn record(value: Value) -> Record {
    value.as_object().cloned().unwrap()
}

mod typed_channel {
    use super::*;

    #[test]
    fn fetch_unwraps_resource_payload() {
        let mut server = Server::new();
        let mock = server
            .mock("POST", "/getPhone")
            .match_header("authorization", AUTH)
            .match_body(Matcher::Json(json!({
                "name": "SEP001122334455",
                "returnedTags": { "name": "" }
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"return": {"phone": {"name": "SEP001122334455", "uuid": "{P1}"}}}"#)
            .create();

        let found = service(&server)
            .fetch(
                "phone",
                &record(json!({ "name": "SEP001122334455" })),
                Some(&record(json!({ "name": "" }))),
            )
            .unwrap();

        mock.assert();
        assert_eq!(found["uuid"], json!("{P1}"));
    }

    #[test]
    fn create_wraps_fields_under_resource() {
        let mut server = Server::new();
        let mock = server
            .mock("POST", "/addDateTimeGroup")
            .match_body(Matcher::Json(json!({
                "dateTimeGroup": { "name": "ABC", "timeZone": "Europe/London" }
            })))
            .with_status(200)
            .with_body(r#"{"return": "{D1}"}"#)
            .create();

        let reference = service(&server)
            .create(
                "dateTimeGroup",
                &record(json!({ "name": "ABC", "timeZone": "Europe/London" })),
            )
            .unwrap();

        mock.assert();
        assert_eq!(reference, "{D1}");
    }

    #[test]
    fn fault_body_is_remote_fault() {
        let mut server = Server::new();
        server
            .mock("POST", "/getPhone")
            .with_status(500)
            .with_body(r#"{"fault": {"message": "Item not valid: The specified Phone was not found"}}"#)
            .create();

        let err = service(&server)
            .fetch("phone", &record(json!({ "name": "missing" })), None)
            .unwrap_err();

        let fault = err.fault().expect("remote fault");
        assert!(fault.message.contains("not found"));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn other_errors_are_transport() {
        let mut server = Server::new();
        server.mock("POST", "/getPhone").with_status(401).create();

        let err = service(&server)
            .fetch("phone", &record(json!({ "name": "x" })), None)
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Transport(TransportError::Status { status: 401, .. })
        ));
    }

    #[test]
    fn server_error_without_fault_is_transport() {
        let mut server = Server::new();
        server
            .mock("POST", "/getPhone")
            .with_status(500)
            .with_body("<html>Internal Server Error</html>")
            .create();

        let err = service(&server)
            .fetch("phone", &record(json!({ "name": "x" })), None)
            .unwrap_err();
        assert!(err.fault().is_none());
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn missing_return_is_malformed() {
        let mut server = Server::new();
        server
            .mock("POST", "/updatePhone")
            .with_status(200)
            .with_body(r#"{"result": "{P1}"}"#)
            .create();

        let err = service(&server)
            .update("phone", &record(json!({ "name": "x" })))
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Transport(TransportError::Malformed { .. })
        ));
    }

    #[test]
    fn list_sends_paging() {
        let mut server = Server::new();
        let mock = server
            .mock("POST", "/listPhone")
            .match_body(Matcher::Json(json!({
                "searchCriteria": { "name": "%" },
                "returnedTags": { "name": "" },
                "skip": 20,
                "first": 10
            })))
            .with_status(200)
            .with_body(r#"{"return": {"phone": [{"name": "SEP1"}, {"name": "SEP2"}]}}"#)
            .create();

        let rows = service(&server)
            .list(
                "phone",
                &record(json!({ "name": "%" })),
                &record(json!({ "name": "" })),
                Page::new(Some(20), Some(10)),
            )
            .unwrap();

        mock.assert();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["name"], json!("SEP2"));
    }

    #[test]
    fn empty_list_return() {
        let mut server = Server::new();
        server
            .mock("POST", "/listPhone")
            .with_status(200)
            .with_body(r#"{"return": null}"#)
            .create();

        let rows = service(&server)
            .list("phone", &Record::new(), &Record::new(), Page::default())
            .unwrap();
        assert!(rows.is_empty());
    }
}

mod device_actions {
    use super::*;

    #[test]
    fn reset_posts_identity_to_action_method() {
        let mut server = Server::new();
        let mock = server
            .mock("POST", "/resetPhone")
            .match_header("authorization", AUTH)
            .match_body(Matcher::Json(json!({ "name": "SEP001122334455" })))
            .with_status(200)
            .with_body(r#"{"return": "{P1}"}"#)
            .create();

        let schema = ResourceSchema::from_value(&json!({
            "resource": "phone",
            "fetchRequest": { "choice": [ { "element": "name" }, { "element": "uuid" } ] },
            "actions": ["reset"]
        }))
        .unwrap();
        let http = service(&server);
        let reference = ResourceClient::new(&http, &schema)
            .reset(&record(json!({ "name": "SEP001122334455" })))
            .unwrap();

        mock.assert();
        assert_eq!(reference, "{P1}");
    }
}

mod upsert {
    use super::*;

    #[test]
    fn not_found_probe_then_create() {
        let mut server = Server::new();
        let probe = server
            .mock("POST", "/getDateTimeGroup")
            .match_body(Matcher::PartialJson(json!({ "name": "ABC" })))
            .with_status(500)
            .with_body(r#"{"fault": {"message": "Item not valid"}}"#)
            .expect(1)
            .create();
        let create = server
            .mock("POST", "/addDateTimeGroup")
            .match_body(Matcher::Json(json!({ "dateTimeGroup": { "name": "ABC" } })))
            .with_status(200)
            .with_body(r#"{"return": "{D1}"}"#)
            .expect(1)
            .create();
        let update = server.mock("POST", "/updateDateTimeGroup").expect(0).create();

        let schema = ResourceSchema::from_value(&json!({
            "resource": "dateTimeGroup",
            "create": { "name": "String" },
            "fetchRequest": { "choice": [ { "element": "name" }, { "element": "uuid" } ] },
            "update": { "name": "String", "newName": "String" }
        }))
        .unwrap();
        let http = service(&server);
        let outcome = ResourceClient::new(&http, &schema)
            .upsert(&record(json!({ "name": "ABC", "uuid": null })))
            .unwrap();

        probe.assert();
        create.assert();
        update.assert();
        assert_eq!(outcome.action, UpsertAction::Created);
        assert_eq!(outcome.reference, "{D1}");
    }
}

mod raw_query {
    use super::*;

    #[test]
    fn query_returns_rows() {
        let mut server = Server::new();
        server
            .mock("POST", "/executeSQLQuery")
            .match_body(Matcher::Json(json!({ "sql": "select pkid from device" })))
            .with_status(200)
            .with_body(r#"{"return": {"rows": [{"pkid": "d1"}]}}"#)
            .create();

        let rows = service(&server).query("select pkid from device").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["pkid"], json!("d1"));
    }

    #[test]
    fn store_patch_round_trip() {
        let mut server = Server::new();
        server
            .mock("POST", "/executeSQLQuery")
            .with_status(200)
            .with_body(
                r#"{"return": {"rows": [{"pkid": "e1", "xml": "<webAccess>0</webAccess>"}]}}"#,
            )
            .create();
        let write = server
            .mock("POST", "/executeSQLUpdate")
            .match_body(Matcher::Json(json!({
                "sql": "update enterprisephoneconfigxml set xml = '<webAccess>1</webAccess>' where pkid = 'e1'"
            })))
            .with_status(200)
            .with_body(r#"{"return": {"rowsUpdated": 1}}"#)
            .create();

        let http = service(&server);
        let rows = DocumentStore::new(&http)
            .patch(&DocumentOwner::EnterprisePhoneConfig, "webAccess", "1", "/")
            .unwrap();

        write.assert();
        assert_eq!(rows, 1);
    }
}
