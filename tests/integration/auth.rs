//! Integration tests for the session: sign-up, sign-in, sign-out and how the
//! stores behave without a token.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use tasklist::api::memory::InMemoryApi;
use tasklist::api::{ApiError, Method};
use tasklist::client::TodoClient;
use tasklist::session::Session;
use tasklist::store::tasks::NewTask;
use tasklist::store::{FetchOutcome, StoreError};

fn anonymous() -> (TodoClient<InMemoryApi>, InMemoryApi) {
    let session = Session::new();
    let api = InMemoryApi::new(session.clone());
    (TodoClient::new(api.clone(), session), api)
}

#[tokio::test]
async fn fetch_without_session_sends_nothing() {
    let (client, api) = anonymous();

    assert_eq!(client.fetch_lists(false).await.unwrap(), FetchOutcome::NoSession);
    assert_eq!(
        client
            .task_store()
            .fetch_tasks(&tasklist_proto::ListId::new("L1"), true)
            .await
            .unwrap(),
        FetchOutcome::NoSession
    );

    assert_eq!(api.request_count(), 0);
    assert_eq!(client.lists(), None);
    assert!(!client.is_loading());
}

#[tokio::test]
async fn mutation_without_session_is_sent_and_rejected() {
    let (client, api) = anonymous();

    let err = client.create_list("Family", None).await.unwrap_err();

    assert_eq!(err.to_string(), "authentication required");
    assert!(matches!(
        err,
        StoreError::Api(ApiError::Unauthorized { .. })
    ));
    let sent = api.requests();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].method, Method::Post);
    assert_eq!(sent[0].path, "/lists");
    assert!(api.lists_snapshot().is_empty());
}

#[tokio::test]
async fn sign_up_then_work_then_sign_in_again() {
    let (client, api) = anonymous();

    client.sign_up("Ann", "ann@example.com", "pw").await.unwrap();
    assert!(client.session().is_authenticated());
    assert_eq!(client.user().await.unwrap().name, "Ann");

    client.create_list("Family", None).await.unwrap();
    client.fetch_lists(false).await.unwrap();
    client.create_task(NewTask::new("2%").title("Buy milk")).await.unwrap();
    assert_eq!(client.lists().unwrap().len(), 1);

    client.sign_out();
    assert!(!client.session().is_authenticated());
    assert_eq!(client.lists(), None);
    assert_eq!(client.tasks(), None);
    assert_eq!(client.current_list_id(), None);

    client.sign_in("ann@example.com", "pw").await.unwrap();
    assert!(client.session().is_authenticated());
    assert_eq!(client.fetch_lists(false).await.unwrap(), FetchOutcome::Fetched);
    assert_eq!(client.fetch_tasks(false).await.unwrap(), FetchOutcome::Fetched);
    assert_eq!(client.tasks().unwrap()[0].title, "Buy milk");
    assert!(api.request_count() > 0);
}

#[tokio::test]
async fn wrong_password_keeps_session_empty() {
    let (client, _api) = anonymous();
    client.sign_up("Ann", "ann@example.com", "pw").await.unwrap();
    client.sign_out();

    let err = client.sign_in("ann@example.com", "nope").await.unwrap_err();

    assert_eq!(err.to_string(), "invalid email or password");
    assert!(!client.session().is_authenticated());
}

#[tokio::test]
async fn duplicate_sign_up_reports_conflict() {
    let (client, _api) = anonymous();
    client.sign_up("Ann", "ann@example.com", "pw").await.unwrap();

    let err = client
        .sign_up("Ann again", "ann@example.com", "pw2")
        .await
        .unwrap_err();

    assert_eq!(
        err,
        StoreError::Api(ApiError::Status {
            status: 409,
            message: "email already registered".to_string(),
        })
    );
}

#[tokio::test]
async fn signing_in_drops_previous_caches() {
    let session = Session::new();
    let api = InMemoryApi::signed_in(session.clone());
    api.insert_list("Family", None);
    let client = TodoClient::new(api.clone(), session);
    client.fetch_lists(false).await.unwrap();
    client.fetch_tasks(false).await.unwrap();
    client.sign_up("Bob", "bob@example.com", "pw").await.unwrap();

    assert_eq!(client.lists(), None);
    assert_eq!(client.tasks(), None);
    assert_eq!(client.current_list_id(), None);
}

#[tokio::test]
async fn fetch_error_message_comes_from_server() {
    let session = Session::with_token("stale");
    let api = InMemoryApi::new(session.clone());
    let client = TodoClient::new(api, session);

    let err = client.fetch_lists(false).await.unwrap_err();

    assert_eq!(err.to_string(), "authentication required");
    assert_eq!(client.lists(), None);
}
