//! Integration tests for switching lists and for fetches racing each other:
//! deduplication of concurrent fetches, and resets that land while a fetch
//! is still in flight.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use tasklist::api::Method;
use tasklist::api::memory::InMemoryApi;
use tasklist::client::TodoClient;
use tasklist::session::Session;
use tasklist::store::FetchOutcome;
use tasklist::store::tasks::NewTask;
use tasklist_proto::{ListId, TaskBody};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Fixture {
    client: TodoClient<InMemoryApi>,
    api: InMemoryApi,
    family: ListId,
    work: ListId,
}

/// Two lists with one task each; lists fetched, no tasks fetched.
async fn fixture() -> Fixture {
    let session = Session::new();
    let api = InMemoryApi::signed_in(session.clone());
    let family = api.insert_list("Family", None);
    let work = api.insert_list("Work", None);
    api.insert_task(&family, body("Milk")).unwrap();
    api.insert_task(&work, body("Report")).unwrap();
    let client = TodoClient::new(api.clone(), session);
    client.fetch_lists(false).await.unwrap();
    api.clear_requests();
    Fixture {
        client,
        api,
        family,
        work,
    }
}

fn body(title: &str) -> TaskBody {
    TaskBody {
        title: title.to_string(),
        detail: String::new(),
        done: false,
        limit: None,
    }
}

fn titles(client: &TodoClient<InMemoryApi>) -> Option<Vec<String>> {
    client
        .tasks()
        .map(|tasks| tasks.into_iter().map(|t| t.title).collect())
}

/// Yields until the fake server has seen `n` requests.
async fn wait_for_requests(api: &InMemoryApi, n: usize) {
    while api.request_count() < n {
        tokio::task::yield_now().await;
    }
}

// ---------------------------------------------------------------------------
// Switching
// ---------------------------------------------------------------------------

#[tokio::test]
async fn select_list_resets_then_fetches_new_list() {
    let f = fixture().await;
    f.client.fetch_tasks(false).await.unwrap();
    assert_eq!(titles(&f.client), Some(vec!["Milk".to_string()]));

    let outcome = f.client.select_list(f.work.clone()).await.unwrap();

    assert_eq!(outcome, FetchOutcome::Fetched);
    assert_eq!(f.client.current_list_id(), Some(f.work.clone()));
    assert_eq!(titles(&f.client), Some(vec!["Report".to_string()]));
    assert_eq!(f.client.task_store().loaded_for(), Some(f.work));

    let last = f.api.requests().pop().unwrap();
    assert_eq!(last.method, Method::Get);
    assert_eq!(last.path, "/lists/L2/tasks");
}

#[tokio::test]
async fn reselecting_same_list_fetches_again() {
    let f = fixture().await;

    f.client.select_list(f.family.clone()).await.unwrap();
    f.client.select_list(f.family.clone()).await.unwrap();

    assert_eq!(f.api.request_count(), 2);
}

#[tokio::test]
async fn unforced_fetch_refetches_after_switch() {
    let f = fixture().await;
    f.client.fetch_tasks(false).await.unwrap();

    f.client.reset_tasks();
    f.client.set_current_list(f.work.clone());
    let outcome = f.client.fetch_tasks(false).await.unwrap();

    assert_eq!(outcome, FetchOutcome::Fetched);
    assert_eq!(titles(&f.client), Some(vec!["Report".to_string()]));
}

#[tokio::test]
async fn forced_fetch_always_sends() {
    let f = fixture().await;

    for _ in 0..3 {
        let outcome = f.client.fetch_tasks(true).await.unwrap();
        assert_eq!(outcome, FetchOutcome::Fetched);
    }

    assert_eq!(f.api.request_count(), 3);
}

#[tokio::test]
async fn fetch_without_current_list_sends_nothing() {
    let session = Session::new();
    let api = InMemoryApi::signed_in(session.clone());
    let client = TodoClient::new(api.clone(), session);

    let outcome = client.fetch_tasks(true).await.unwrap();

    assert_eq!(outcome, FetchOutcome::NoList);
    assert_eq!(api.request_count(), 0);
}

#[tokio::test]
async fn deleting_current_list_empties_task_cache() {
    let f = fixture().await;
    f.client.fetch_tasks(false).await.unwrap();

    f.client.delete_list(&f.family).await.unwrap();

    assert_eq!(f.client.current_list_id(), Some(f.work));
    assert_eq!(f.client.tasks(), None);
}

#[tokio::test]
async fn create_into_empty_cache_belongs_to_its_list() {
    let f = fixture().await;
    let store = f.client.task_store();

    store
        .create_task(&f.work, NewTask::new("").title("Slides"))
        .await
        .unwrap();

    assert_eq!(store.owner(), Some(f.work.clone()));
    assert_eq!(store.loaded_for(), None);

    let outcome = store.fetch_tasks(&f.family, false).await.unwrap();
    assert_eq!(outcome, FetchOutcome::Fetched);
    assert_eq!(store.owner(), Some(f.family));
    assert_eq!(titles(&f.client), Some(vec!["Milk".to_string()]));
}

// ---------------------------------------------------------------------------
// Concurrent fetches
// ---------------------------------------------------------------------------

#[tokio::test]
async fn concurrent_list_fetches_share_one_request() {
    let f = fixture().await;
    f.api.hold_reads();

    let (a, b, ()) = tokio::join!(f.client.fetch_lists(true), f.client.fetch_lists(true), async {
        wait_for_requests(&f.api, 1).await;
        assert!(f.client.is_loading());
        f.api.release_reads();
    });

    assert_eq!(a.unwrap(), FetchOutcome::Fetched);
    assert_eq!(b.unwrap(), FetchOutcome::Joined);
    assert_eq!(f.api.request_count(), 1);
    assert!(!f.client.is_loading());
}

#[tokio::test]
async fn concurrent_task_fetches_share_one_request() {
    let f = fixture().await;
    f.api.hold_reads();

    let (a, b, c, ()) = tokio::join!(
        f.client.fetch_tasks(false),
        f.client.fetch_tasks(true),
        f.client.fetch_tasks(false),
        async {
            wait_for_requests(&f.api, 1).await;
            f.api.release_reads();
        }
    );

    assert_eq!(a.unwrap(), FetchOutcome::Fetched);
    assert_eq!(b.unwrap(), FetchOutcome::Joined);
    assert_eq!(c.unwrap(), FetchOutcome::Joined);
    assert_eq!(f.api.request_count(), 1);
    assert_eq!(titles(&f.client), Some(vec!["Milk".to_string()]));
}

#[tokio::test]
async fn joined_fetch_sees_the_same_error() {
    let f = fixture().await;
    f.api.hold_reads();
    f.api.fail_next(tasklist::api::ApiError::Transport("offline".to_string()));

    let (a, b, ()) = tokio::join!(f.client.fetch_tasks(true), f.client.fetch_tasks(true), async {
        wait_for_requests(&f.api, 1).await;
        f.api.release_reads();
    });

    assert_eq!(a.unwrap_err().to_string(), "network error: offline");
    assert_eq!(b.unwrap_err().to_string(), "network error: offline");
    assert_eq!(f.client.tasks(), None);
    assert!(!f.client.is_loading());
}

// ---------------------------------------------------------------------------
// Resets during a fetch
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reset_during_fetch_discards_result() {
    let f = fixture().await;
    f.api.hold_reads();

    let client = f.client.clone();
    let fetch = tokio::spawn(async move { client.fetch_tasks(true).await });
    wait_for_requests(&f.api, 1).await;
    assert!(f.client.is_loading());

    f.client.reset_tasks();
    assert!(!f.client.is_loading());
    f.api.release_reads();

    assert_eq!(fetch.await.unwrap().unwrap(), FetchOutcome::Discarded);
    assert_eq!(f.client.tasks(), None);
    assert_eq!(f.client.task_store().loaded_for(), None);
    assert!(!f.client.is_loading());
}

#[tokio::test]
async fn switch_during_fetch_keeps_only_new_list() {
    let f = fixture().await;
    f.api.hold_reads();

    let client = f.client.clone();
    let stale = tokio::spawn(async move { client.fetch_tasks(true).await });
    wait_for_requests(&f.api, 1).await;

    let client = f.client.clone();
    let work = f.work.clone();
    let fresh = tokio::spawn(async move { client.select_list(work).await });
    wait_for_requests(&f.api, 2).await;
    f.api.release_reads();

    assert_eq!(stale.await.unwrap().unwrap(), FetchOutcome::Discarded);
    assert_eq!(fresh.await.unwrap().unwrap(), FetchOutcome::Fetched);
    assert_eq!(f.client.current_list_id(), Some(f.work.clone()));
    assert_eq!(titles(&f.client), Some(vec!["Report".to_string()]));
    assert_eq!(f.client.task_store().loaded_for(), Some(f.work));
}

#[tokio::test]
async fn sign_out_during_list_fetch_leaves_lists_empty() {
    let f = fixture().await;
    f.api.hold_reads();

    let client = f.client.clone();
    let fetch = tokio::spawn(async move { client.fetch_lists(true).await });
    wait_for_requests(&f.api, 1).await;

    f.client.sign_out();
    f.api.release_reads();

    // The fake checks the token once the read is released.
    let err = fetch.await.unwrap().unwrap_err();
    assert_eq!(err.to_string(), "authentication required");
    assert_eq!(f.client.lists(), None);
    assert_eq!(f.client.current_list_id(), None);
}
