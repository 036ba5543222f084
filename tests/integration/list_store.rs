//! Integration tests for the list cache: fetch, create, rename, delete and
//! the current-list pointer, driven through `TodoClient` over the fake API.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use tasklist::api::Method;
use tasklist::api::memory::InMemoryApi;
use tasklist::client::TodoClient;
use tasklist::session::Session;
use tasklist::store::{FetchOutcome, StoreError};
use tasklist_proto::{List, ListId};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn signed_in() -> (TodoClient<InMemoryApi>, InMemoryApi) {
    let session = Session::new();
    let api = InMemoryApi::signed_in(session.clone());
    (TodoClient::new(api.clone(), session), api)
}

fn list(id: &str, title: &str, detail: Option<&str>) -> List {
    List {
        id: ListId::new(id),
        title: title.to_string(),
        detail: detail.map(str::to_string),
    }
}

// ---------------------------------------------------------------------------
// Fetch
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fetch_selects_first_list() {
    let (client, api) = signed_in();
    let first = api.insert_list("Family", None);
    api.insert_list("Work", Some("office"));

    let outcome = client.fetch_lists(false).await.unwrap();

    assert_eq!(outcome, FetchOutcome::Fetched);
    assert_eq!(client.lists().unwrap().len(), 2);
    assert_eq!(client.current_list_id(), Some(first));
    assert_eq!(client.current_list().unwrap().title, "Family");
    assert!(!client.is_loading());
}

#[tokio::test]
async fn second_fetch_is_served_from_cache() {
    let (client, api) = signed_in();
    api.insert_list("Family", None);

    client.fetch_lists(false).await.unwrap();
    let outcome = client.fetch_lists(false).await.unwrap();

    assert_eq!(outcome, FetchOutcome::Cached);
    assert!(!outcome.hit_network());
    assert_eq!(api.request_count(), 1);
}

#[tokio::test]
async fn forced_fetch_refreshes_cache() {
    let (client, api) = signed_in();
    api.insert_list("Family", None);
    client.fetch_lists(false).await.unwrap();

    api.insert_list("Work", None);
    let outcome = client.fetch_lists(true).await.unwrap();

    assert_eq!(outcome, FetchOutcome::Fetched);
    assert_eq!(api.request_count(), 2);
    assert_eq!(client.lists().unwrap().len(), 2);
}

#[tokio::test]
async fn empty_server_gives_empty_cache_and_no_current() {
    let (client, _api) = signed_in();

    client.fetch_lists(false).await.unwrap();

    assert_eq!(client.lists(), Some(Vec::new()));
    assert_eq!(client.current_list_id(), None);
}

#[tokio::test]
async fn failed_fetch_leaves_cache_unloaded() {
    let (client, api) = signed_in();
    api.insert_list("Family", None);
    api.fail_next(tasklist::api::ApiError::Status {
        status: 500,
        message: "boom".to_string(),
    });

    let err = client.fetch_lists(false).await.unwrap_err();

    assert_eq!(err.to_string(), "boom");
    assert_eq!(client.lists(), None);
    assert!(!client.is_loading());

    client.fetch_lists(false).await.unwrap();
    assert_eq!(client.lists().unwrap().len(), 1);
}

// ---------------------------------------------------------------------------
// Create / update
// ---------------------------------------------------------------------------

#[tokio::test]
async fn created_list_is_appended_to_loaded_cache() {
    let (client, api) = signed_in();
    client.fetch_lists(false).await.unwrap();

    let id = client.create_list("Family", None).await.unwrap();

    assert_eq!(id, ListId::new("L1"));
    assert_eq!(client.lists().unwrap(), vec![list("L1", "Family", None)]);
    assert_eq!(api.lists_snapshot(), vec![list("L1", "Family", None)]);
    // Creating does not pick a current list.
    assert_eq!(client.current_list_id(), None);
}

#[tokio::test]
async fn create_before_fetch_leaves_cache_unloaded() {
    let (client, api) = signed_in();

    client.create_list("Family", Some("home")).await.unwrap();

    assert_eq!(client.lists(), None);
    assert_eq!(api.lists_snapshot(), vec![list("L1", "Family", Some("home"))]);

    client.fetch_lists(false).await.unwrap();
    assert_eq!(client.lists().unwrap(), vec![list("L1", "Family", Some("home"))]);
}

#[tokio::test]
async fn blank_title_is_rejected_without_request() {
    let (client, api) = signed_in();

    let err = client.create_list("   ", None).await.unwrap_err();

    assert_eq!(err, StoreError::EmptyTitle);
    assert_eq!(api.request_count(), 0);
}

#[tokio::test]
async fn rename_keeps_detail_when_omitted() {
    let (client, api) = signed_in();
    let id = api.insert_list("Family", Some("home"));
    client.fetch_lists(false).await.unwrap();

    client.update_list(&id, "Household", None).await.unwrap();

    assert_eq!(
        client.current_list(),
        Some(list("L1", "Household", Some("home")))
    );
    assert_eq!(api.lists_snapshot(), vec![list("L1", "Household", Some("home"))]);

    let put = api.requests().pop().unwrap();
    assert_eq!(put.method, Method::Put);
    assert_eq!(put.path, "/lists/L1");
    assert_eq!(put.body, Some(serde_json::json!({"title": "Household"})));
}

#[tokio::test]
async fn rename_of_unknown_list_reports_server_message() {
    let (client, _api) = signed_in();
    client.fetch_lists(false).await.unwrap();

    let err = client
        .update_list(&ListId::new("L9"), "Nope", None)
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "list not found");
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

#[tokio::test]
async fn deleting_current_list_moves_to_first_remaining() {
    let (client, api) = signed_in();
    let first = api.insert_list("Family", None);
    let second = api.insert_list("Work", None);
    client.fetch_lists(false).await.unwrap();
    assert_eq!(client.current_list_id(), Some(first.clone()));

    client.delete_list(&first).await.unwrap();

    assert_eq!(client.current_list_id(), Some(second));
    assert_eq!(client.lists().unwrap(), vec![list("L2", "Work", None)]);
}

#[tokio::test]
async fn deleting_last_list_clears_current() {
    let (client, api) = signed_in();
    let only = api.insert_list("Family", None);
    client.fetch_lists(false).await.unwrap();

    client.delete_list(&only).await.unwrap();

    assert_eq!(client.current_list_id(), None);
    assert_eq!(client.lists(), Some(Vec::new()));
}

#[tokio::test]
async fn deleting_other_list_keeps_current() {
    let (client, api) = signed_in();
    let first = api.insert_list("Family", None);
    let second = api.insert_list("Work", None);
    client.fetch_lists(false).await.unwrap();

    client.delete_list(&second).await.unwrap();

    assert_eq!(client.current_list_id(), Some(first));
}

#[tokio::test]
async fn failed_delete_changes_nothing() {
    let (client, api) = signed_in();
    let first = api.insert_list("Family", None);
    client.fetch_lists(false).await.unwrap();
    api.fail_next(tasklist::api::ApiError::Transport("offline".to_string()));

    let err = client.delete_list(&first).await.unwrap_err();

    assert_eq!(err.to_string(), "network error: offline");
    assert_eq!(client.current_list_id(), Some(first));
    assert_eq!(client.lists().unwrap().len(), 1);
}

#[tokio::test]
async fn set_current_list_sends_nothing() {
    let (client, api) = signed_in();
    api.insert_list("Family", None);
    let second = api.insert_list("Work", None);
    client.fetch_lists(false).await.unwrap();
    api.clear_requests();

    client.set_current_list(second.clone());

    assert_eq!(client.current_list_id(), Some(second));
    assert_eq!(api.request_count(), 0);
}
