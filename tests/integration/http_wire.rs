//! End-to-end tests of the reqwest client against the axum server over a
//! real TCP socket.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::time::Duration;

use chrono::{TimeZone, Utc};
use tasklist::api::http::HttpApi;
use tasklist::api::{Api, ApiError};
use tasklist::client::TodoClient;
use tasklist::session::Session;
use tasklist::store::tasks::{NewTask, TaskFilter, TaskUpdate};
use tasklist::store::{FetchOutcome, StoreError};
use tasklist_proto::{ListId, TaskId};

/// Starts a server on an ephemeral port and returns its base URL.
async fn start_server() -> String {
    let (addr, _handle) = tasklist_server::server::start_server("127.0.0.1:0")
        .await
        .expect("failed to start server");
    format!("http://{addr}")
}

fn client(base: &str) -> TodoClient<HttpApi> {
    let session = Session::new();
    let api = HttpApi::with_timeout(base, session.clone(), Duration::from_secs(5)).unwrap();
    TodoClient::new(api, session)
}

#[tokio::test]
async fn full_round_trip() {
    let base = start_server().await;
    let client = client(&base);

    client.sign_up("Ann", "ann@example.com", "pw").await.unwrap();
    assert_eq!(client.user().await.unwrap().name, "Ann");

    // Lists
    assert_eq!(client.fetch_lists(false).await.unwrap(), FetchOutcome::Fetched);
    assert_eq!(client.lists(), Some(Vec::new()));
    let family = client.create_list("Family", Some("home")).await.unwrap();
    let work = client.create_list("Work", None).await.unwrap();
    assert_eq!(client.lists().unwrap().len(), 2);
    client.select_list(family.clone()).await.unwrap();
    assert_eq!(client.tasks(), Some(Vec::new()));

    // Tasks
    let due = Utc.with_ymd_and_hms(2024, 5, 1, 0, 30, 15).unwrap();
    let milk = client
        .create_task(NewTask::new("2%").title("Buy milk").limit(due))
        .await
        .unwrap();
    let bread = client.create_task(NewTask::new("rye")).await.unwrap();

    let merged = client
        .update_task(TaskUpdate::new(milk.clone()).done(true))
        .await
        .unwrap();
    assert_eq!(merged.title, "Buy milk");
    assert_eq!(merged.limit, Some(due));

    let cached = client.tasks().unwrap();
    client.fetch_tasks(true).await.unwrap();
    assert_eq!(client.tasks().unwrap(), cached);

    let done: Vec<TaskId> = client
        .filtered_tasks(TaskFilter::Completed)
        .into_iter()
        .map(|t| t.id)
        .collect();
    assert_eq!(done, vec![milk.clone()]);
    assert_eq!(client.incomplete_count(), 1);

    client.delete_task(&bread).await.unwrap();
    client.fetch_tasks(true).await.unwrap();
    assert_eq!(client.tasks().unwrap().len(), 1);

    // Switching and deleting lists
    client.select_list(work.clone()).await.unwrap();
    assert_eq!(client.tasks(), Some(Vec::new()));
    client.delete_list(&work).await.unwrap();
    assert_eq!(client.current_list_id(), Some(family.clone()));

    client.update_list(&family, "Household", None).await.unwrap();
    client.fetch_lists(true).await.unwrap();
    let list = client.current_list().unwrap();
    assert_eq!(list.title, "Household");
    assert_eq!(list.detail.as_deref(), Some("home"));
}

#[tokio::test]
async fn cleared_limit_reaches_server() {
    let base = start_server().await;
    let client = client(&base);
    client.sign_up("Ann", "ann@example.com", "pw").await.unwrap();
    let family = client.create_list("Family", None).await.unwrap();
    client.select_list(family).await.unwrap();

    let due = Utc.with_ymd_and_hms(2024, 5, 1, 0, 30, 0).unwrap();
    let id = client
        .create_task(NewTask::new("rent").title("Pay rent").limit(due))
        .await
        .unwrap();
    client
        .update_task(TaskUpdate::new(id.clone()).done(true))
        .await
        .unwrap();
    client.fetch_tasks(true).await.unwrap();
    assert_eq!(client.tasks().unwrap()[0].limit, Some(due));

    client
        .update_task(TaskUpdate::new(id).limit(None))
        .await
        .unwrap();
    let cached = client.tasks().unwrap();
    client.fetch_tasks(true).await.unwrap();
    let fetched = client.tasks().unwrap();
    assert_eq!(fetched[0].limit, None);
    assert!(fetched[0].done);
    assert_eq!(fetched, cached);
}

#[tokio::test]
async fn second_account_sees_its_own_lists() {
    let base = start_server().await;
    let ann = client(&base);
    let bob = client(&base);

    ann.sign_up("Ann", "ann@example.com", "pw").await.unwrap();
    ann.create_list("Family", None).await.unwrap();
    bob.sign_up("Bob", "bob@example.com", "pw").await.unwrap();

    bob.fetch_lists(false).await.unwrap();
    assert_eq!(bob.lists(), Some(Vec::new()));

    ann.sign_out();
    ann.sign_in("ann@example.com", "pw").await.unwrap();
    ann.fetch_lists(false).await.unwrap();
    assert_eq!(ann.lists().unwrap().len(), 1);
}

#[tokio::test]
async fn server_messages_reach_the_caller() {
    let base = start_server().await;
    let client = client(&base);

    let err = client.create_list("Family", None).await.unwrap_err();
    assert_eq!(
        err,
        StoreError::Api(ApiError::Unauthorized {
            status: 401,
            message: "authentication required".to_string(),
        })
    );

    let err = client.sign_in("nobody@example.com", "pw").await.unwrap_err();
    assert_eq!(err.to_string(), "invalid email or password");

    client.sign_up("Ann", "ann@example.com", "pw").await.unwrap();
    let err = client.sign_up("Ann", "ann@example.com", "pw").await.unwrap_err();
    assert_eq!(err.to_string(), "email already registered");

    let missing = ListId::new("no-such-list");
    let err = client.delete_list(&missing).await.unwrap_err();
    assert_eq!(err.to_string(), format!("list {missing} not found"));
}

#[tokio::test]
async fn fetch_without_token_never_reaches_server() {
    let base = start_server().await;
    let client = client(&base);

    assert_eq!(client.fetch_lists(true).await.unwrap(), FetchOutcome::NoSession);
}

#[tokio::test]
async fn api_can_be_used_directly() {
    let base = start_server().await;
    let session = Session::new();
    let api = HttpApi::new(&base, session.clone()).unwrap();

    let token = api
        .sign_up(&tasklist_proto::auth::NewUser {
            name: "Ann".to_string(),
            email: "ann@example.com".to_string(),
            password: "pw".to_string(),
        })
        .await
        .unwrap();
    session.set_token(token.token);

    let id = api
        .create_list(&tasklist_proto::ListBody {
            title: "Family".to_string(),
            detail: None,
        })
        .await
        .unwrap();
    let lists = api.lists().await.unwrap();
    assert_eq!(lists.len(), 1);
    assert_eq!(lists[0].id, id);
    assert!(api.tasks(&id).await.unwrap().is_empty());
}
