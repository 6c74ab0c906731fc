//! HttpProgressStore against a mock progress service.

use breathwork_core::{HttpProgressStore, PersistenceError, ProgressStore, ProgressUpdate};
use mockito::Matcher;
use serde_json::json;

const PATH: &str = "/api/activity/breathing/progress";

#[tokio::test]
async fn get_progress_parses_service_envelope() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", PATH)
        .match_header("authorization", "Bearer secret-token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "success": true,
                "progress": {
                    "_id": "6650",
                    "user": "u1",
                    "streak": 3,
                    "totalSessions": 12,
                    "techniques": [
                        {"techniqueId": "box", "sessions": 7},
                        {"techniqueId": "478", "sessions": 5}
                    ],
                    "lastSelectedTechnique": "478",
                    "lastSelectedDuration": 2,
                    "lastSessionElapsedTime": 41,
                    "lastSessionStartTime": "2026-10-01T08:00:00.000Z",
                    "lastSession": "2026-10-01T08:00:41.000Z",
                    "__v": 0
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let store = HttpProgressStore::new(&server.url(), Some("secret-token".into())).unwrap();
    let record = store.get_progress().await.unwrap().unwrap();

    mock.assert_async().await;
    assert_eq!(record.streak, 3);
    assert_eq!(record.total_sessions, 12);
    assert_eq!(record.technique_sessions("box"), 7);
    assert_eq!(record.last_selected_technique.as_deref(), Some("478"));
    assert_eq!(record.last_session_elapsed_time, 41);
    assert!(record.last_session_start_time.is_some());
}

#[tokio::test]
async fn update_sends_only_present_fields() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", PATH)
        .match_body(Matcher::Json(json!({
            "lastSessionElapsedTime": 12,
            "lastSelectedTechnique": "box"
        })))
        .with_status(200)
        .with_body(r#"{"success": true, "progress": {}}"#)
        .create_async()
        .await;

    let store = HttpProgressStore::new(&server.url(), None).unwrap();
    store
        .update_progress(ProgressUpdate {
            last_session_elapsed_time: Some(12),
            last_selected_technique: Some("box".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn completion_update_uses_technique_list_shape() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", PATH)
        .match_body(Matcher::PartialJson(json!({
            "streak": 2,
            "totalSessions": 4,
            "techniques": [{"techniqueId": "diaphragmatic", "sessions": 4}]
        })))
        .with_status(200)
        .with_body(r#"{"success": true}"#)
        .create_async()
        .await;

    let mut record = breathwork_core::ProgressRecord {
        streak: 2,
        total_sessions: 4,
        ..Default::default()
    };
    record
        .per_technique_sessions
        .insert("diaphragmatic".into(), 4);

    let store = HttpProgressStore::new(&server.url(), None).unwrap();
    store.update_progress(record.to_update()).await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn server_error_carries_status_and_message() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", PATH)
        .with_status(500)
        .with_body(r#"{"success": false, "message": "Error fetching progress"}"#)
        .create_async()
        .await;

    let store = HttpProgressStore::new(&server.url(), None).unwrap();
    match store.get_progress().await {
        Err(PersistenceError::Service { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "Error fetching progress");
        }
        other => panic!("expected service error, got {other:?}"),
    }
}

#[tokio::test]
async fn unsuccessful_envelope_is_an_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", PATH)
        .with_status(200)
        .with_body(r#"{"success": false, "message": "quota"}"#)
        .create_async()
        .await;

    let store = HttpProgressStore::new(&server.url(), None).unwrap();
    let err = store
        .update_progress(ProgressUpdate {
            streak: Some(1),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, PersistenceError::Service { status: 200, .. }));
}

#[tokio::test]
async fn missing_progress_is_none() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", PATH)
        .with_status(200)
        .with_body(r#"{"success": true, "progress": null}"#)
        .create_async()
        .await;

    let store = HttpProgressStore::new(&server.url(), None).unwrap();
    assert!(store.get_progress().await.unwrap().is_none());
}

#[tokio::test]
async fn garbage_body_is_malformed() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", PATH)
        .with_status(200)
        .with_body("<html>gateway</html>")
        .create_async()
        .await;

    let store = HttpProgressStore::new(&server.url(), None).unwrap();
    assert!(matches!(
        store.get_progress().await,
        Err(PersistenceError::Malformed(_))
    ));
}
