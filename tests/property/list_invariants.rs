//! Property-based tests for the list cache.
//!
//! Uses proptest to drive random create / delete / refetch sequences through
//! `ListStore` over the in-memory API and verify after every step:
//! 1. The cache matches the server's lists exactly, in order.
//! 2. The current list is either unset or one of the cached lists.
//! 3. The current list follows a simple model: first list after a fetch,
//!    first remaining list after deleting the current one, unchanged
//!    otherwise.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;

use proptest::prelude::*;
use tasklist::api::memory::InMemoryApi;
use tasklist::session::Session;
use tasklist::store::lists::ListStore;
use tasklist_proto::ListId;

#[derive(Debug, Clone)]
enum Op {
    Create(String),
    /// Deletes the list at this index modulo the list count.
    Delete(usize),
    Refetch,
    Select(usize),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => "[a-zA-Z][a-zA-Z ]{0,15}".prop_map(Op::Create),
        2 => any::<usize>().prop_map(Op::Delete),
        1 => Just(Op::Refetch),
        1 => any::<usize>().prop_map(Op::Select),
    ]
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

/// Runs `ops` and checks the invariants after each one.
async fn check(ops: Vec<Op>) -> Result<(), TestCaseError> {
    let session = Session::new();
    let api = InMemoryApi::signed_in(session.clone());
    let store = ListStore::new(Arc::new(api.clone()), session);
    store.fetch_lists(false).await.unwrap();
    let mut model_current: Option<ListId> = None;

    for op in ops {
        match op {
            Op::Create(title) => {
                let id = store.create_list(&title, None).await.unwrap();
                prop_assert!(store.lists().unwrap().iter().any(|l| l.id == id));
            }
            Op::Delete(i) => {
                let lists = store.lists().unwrap();
                if lists.is_empty() {
                    continue;
                }
                let id = lists[i % lists.len()].id.clone();
                store.delete_list(&id).await.unwrap();
                if model_current.as_ref() == Some(&id) {
                    model_current = store.lists().unwrap().first().map(|l| l.id.clone());
                }
            }
            Op::Refetch => {
                store.fetch_lists(true).await.unwrap();
                model_current = api.lists_snapshot().first().map(|l| l.id.clone());
            }
            Op::Select(i) => {
                let lists = store.lists().unwrap();
                if lists.is_empty() {
                    continue;
                }
                let id = lists[i % lists.len()].id.clone();
                store.set_current_list(id.clone());
                model_current = Some(id);
            }
        }

        let cached = store.lists().unwrap();
        prop_assert_eq!(&cached, &api.lists_snapshot());
        prop_assert_eq!(store.current_list_id(), model_current.clone());
        if let Some(current) = store.current_list_id() {
            prop_assert!(cached.iter().any(|l| l.id == current));
        }
        prop_assert!(!store.is_loading());
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn cache_tracks_server(ops in prop::collection::vec(arb_op(), 0..24)) {
        runtime().block_on(check(ops))?;
    }
}
