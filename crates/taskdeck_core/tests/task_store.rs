mod common;

use common::{ids, task, Call, FakeTaskRepository};
use std::sync::Arc;
use std::time::Duration;
use taskdeck_core::store::task_store::{
    CREATE_FAILED, DELETE_FAILED, DELETE_MANY_FAILED, FETCH_FAILED, UPDATE_FAILED,
};
use taskdeck_core::{StoreState, TaskId, TaskStore};
use tokio::sync::Semaphore;

async fn fetched_store(remote: Vec<taskdeck_core::Task>) -> TaskStore<FakeTaskRepository> {
    let store = TaskStore::new(FakeTaskRepository::new().with_remote(remote));
    store.fetch_all().await;
    store
}

#[tokio::test]
async fn add_on_empty_store_yields_exactly_the_created_task() {
    let repo = FakeTaskRepository::new();
    repo.push_created(task("42", "Buy milk", false));
    let store = TaskStore::new(repo);

    store.add("Buy milk").await;

    assert_eq!(
        store.snapshot(),
        StoreState {
            tasks: vec![task("42", "Buy milk", false)],
            loading: false,
            error: None,
        }
    );
    assert_eq!(
        store.repository().calls(),
        vec![Call::Create("Buy milk".to_string())]
    );
}

#[tokio::test]
async fn successive_adds_are_most_recent_first() {
    let repo = FakeTaskRepository::new();
    repo.push_created(task("1", "first", false));
    repo.push_created(task("2", "second", false));
    repo.push_created(task("3", "third", false));
    let store = TaskStore::new(repo);

    store.add("first").await;
    store.add("second").await;
    store.add("third").await;

    let titles: Vec<String> = store.tasks().into_iter().map(|task| task.title).collect();
    assert_eq!(titles, vec!["third", "second", "first"]);
}

#[tokio::test]
async fn add_trims_title_and_ignores_blank_input() {
    let store = TaskStore::new(FakeTaskRepository::new());

    store.add("   ").await;
    assert!(store.repository().calls().is_empty());
    assert!(store.tasks().is_empty());

    store.add("  Walk dog  ").await;
    assert_eq!(
        store.repository().calls(),
        vec![Call::Create("Walk dog".to_string())]
    );
}

#[tokio::test]
async fn add_failure_keeps_tasks_and_sets_error() {
    let store = fetched_store(vec![task("1", "x", false)]).await;
    store.repository().fail_create(true);

    store.add("y").await;

    let state = store.snapshot();
    assert_eq!(state.tasks, vec![task("1", "x", false)]);
    assert_eq!(state.error.as_deref(), Some(CREATE_FAILED));
    assert!(!state.loading);
}

#[tokio::test]
async fn fetch_success_replaces_tasks_in_server_order_and_clears_error() {
    let remote = vec![
        task("3", "c", true),
        task("1", "a", false),
        task("2", "b", false),
    ];
    let repo = FakeTaskRepository::new().with_remote(remote.clone());
    repo.fail_list(true);
    let store = TaskStore::new(repo);

    store.fetch_all().await;
    assert_eq!(store.error().as_deref(), Some(FETCH_FAILED));

    store.repository().fail_list(false);
    store.fetch_all().await;

    let state = store.snapshot();
    assert_eq!(state.tasks, remote);
    assert_eq!(state.error, None);
    assert!(!state.loading);
}

#[tokio::test]
async fn fetch_failure_leaves_tasks_untouched() {
    let store = fetched_store(vec![task("1", "x", false), task("2", "y", true)]).await;
    store.repository().fail_list(true);

    store.fetch_all().await;

    let state = store.snapshot();
    assert_eq!(state.tasks, vec![task("1", "x", false), task("2", "y", true)]);
    assert_eq!(state.error.as_deref(), Some(FETCH_FAILED));
    assert!(!state.loading);
}

#[tokio::test]
async fn fetch_drops_duplicate_ids_from_server() {
    let store = fetched_store(vec![
        task("1", "x", false),
        task("1", "x again", true),
        task("2", "y", false),
    ])
    .await;

    assert_eq!(store.tasks(), vec![task("1", "x", false), task("2", "y", false)]);
}

#[tokio::test]
async fn toggle_unknown_id_is_a_silent_noop() {
    let store = fetched_store(vec![task("1", "x", false)]).await;
    store.repository().fail_list(true);
    store.fetch_all().await;
    let before = store.snapshot();
    let calls_before = store.repository().calls().len();

    store.toggle(&TaskId::from("missing")).await;

    assert_eq!(store.snapshot(), before);
    assert_eq!(store.repository().calls().len(), calls_before);
}

#[tokio::test]
async fn toggle_flips_only_the_matching_entry() {
    let store = fetched_store(vec![
        task("1", "x", false),
        task("2", "y", true),
        task("3", "z", false),
    ])
    .await;

    store.toggle(&TaskId::from("2")).await;

    assert_eq!(
        store.tasks(),
        vec![task("1", "x", false), task("2", "y", false), task("3", "z", false)]
    );
    assert_eq!(
        store.repository().calls().last(),
        Some(&Call::SetCompletion(TaskId::from("2"), false))
    );
    assert_eq!(store.error(), None);
}

#[tokio::test]
async fn toggle_failure_keeps_flag_and_sets_error() {
    let store = fetched_store(vec![task("1", "x", false)]).await;
    store.repository().fail_update(true);

    store.toggle(&TaskId::from("1")).await;

    assert_eq!(store.tasks(), vec![task("1", "x", false)]);
    assert_eq!(store.error().as_deref(), Some(UPDATE_FAILED));
    assert!(!store.is_loading());
}

#[tokio::test]
async fn remove_filters_entry_and_failure_keeps_it() {
    let store = fetched_store(vec![task("1", "x", false), task("2", "y", false)]).await;

    store.remove(&TaskId::from("1")).await;
    assert_eq!(store.tasks(), vec![task("2", "y", false)]);

    store.repository().fail_remove_of("2");
    store.remove(&TaskId::from("2")).await;
    assert_eq!(store.tasks(), vec![task("2", "y", false)]);
    assert_eq!(store.error().as_deref(), Some(DELETE_FAILED));
}

#[tokio::test]
async fn remove_many_removes_all_ids_on_success() {
    let store = fetched_store(vec![
        task("a", "1", false),
        task("b", "2", false),
        task("c", "3", false),
    ])
    .await;

    store.remove_many(&ids(&["a", "c"])).await;

    assert_eq!(store.tasks(), vec![task("b", "2", false)]);
    assert_eq!(store.error(), None);
    assert!(!store.is_loading());
}

#[tokio::test]
async fn remove_many_partial_failure_keeps_every_id_locally() {
    let store = fetched_store(vec![task("a", "1", false), task("b", "2", false)]).await;
    store.repository().fail_remove_of("b");

    store.remove_many(&ids(&["a", "b"])).await;

    assert_eq!(store.tasks(), vec![task("a", "1", false), task("b", "2", false)]);
    assert_eq!(store.error().as_deref(), Some(DELETE_MANY_FAILED));
    // The backend did delete `a`; the local cache now disagrees with it.
    assert_eq!(store.repository().remote(), vec![task("b", "2", false)]);
}

#[tokio::test]
async fn remove_many_issues_one_call_per_id() {
    let store = fetched_store(vec![task("a", "1", false), task("b", "2", false)]).await;

    store.remove_many(&ids(&["a", "b"])).await;

    let removes: Vec<Call> = store
        .repository()
        .calls()
        .into_iter()
        .filter(|call| matches!(call, Call::Remove(_)))
        .collect();
    assert_eq!(removes.len(), 2);
    assert!(removes.contains(&Call::Remove(TaskId::from("a"))));
    assert!(removes.contains(&Call::Remove(TaskId::from("b"))));
}

#[tokio::test]
async fn success_after_failure_clears_error() {
    let store = fetched_store(vec![task("1", "x", false)]).await;
    store.repository().fail_update(true);
    store.toggle(&TaskId::from("1")).await;
    assert!(store.error().is_some());

    store.repository().fail_update(false);
    store.toggle(&TaskId::from("1")).await;
    assert_eq!(store.error(), None);
    assert_eq!(store.tasks(), vec![task("1", "x", true)]);
}

#[tokio::test]
async fn clear_error_resets_message() {
    let store = TaskStore::new(FakeTaskRepository::new());
    store.repository().fail_list(true);
    store.fetch_all().await;

    store.clear_error();
    assert_eq!(store.error(), None);
}

#[tokio::test]
async fn concurrent_toggles_of_same_id_apply_in_order() {
    let store = fetched_store(vec![task("1", "x", false)]).await;
    let id = TaskId::from("1");

    tokio::join!(store.toggle(&id), store.toggle(&id));

    assert_eq!(store.tasks(), vec![task("1", "x", false)]);
    let updates: Vec<Call> = store
        .repository()
        .calls()
        .into_iter()
        .filter(|call| matches!(call, Call::SetCompletion(..)))
        .collect();
    assert_eq!(
        updates,
        vec![
            Call::SetCompletion(id.clone(), true),
            Call::SetCompletion(id.clone(), false),
        ]
    );
}

#[tokio::test]
async fn concurrent_mutations_do_not_lose_updates() {
    let repo =
        FakeTaskRepository::new().with_remote(vec![task("1", "x", false), task("2", "y", false)]);
    repo.push_created(task("3", "z", false));
    let store = TaskStore::new(repo);
    store.fetch_all().await;

    let id1 = TaskId::from("1");
    let id2 = TaskId::from("2");
    tokio::join!(
        store.toggle(&id1),
        store.toggle(&id2),
        store.add("z"),
    );

    assert_eq!(
        store.tasks(),
        vec![task("3", "z", false), task("1", "x", true), task("2", "y", true)]
    );
}

#[tokio::test]
async fn loading_is_true_only_while_remote_call_is_outstanding() {
    let gate = Arc::new(Semaphore::new(0));
    let store = Arc::new(TaskStore::new(
        FakeTaskRepository::gated(gate.clone()).with_remote(vec![task("1", "x", false)]),
    ));
    let mut updates = store.subscribe();

    let worker = {
        let store = store.clone();
        tokio::spawn(async move { store.fetch_all().await })
    };

    tokio::time::timeout(Duration::from_secs(5), updates.wait_for(|state| state.loading))
        .await
        .unwrap()
        .unwrap();
    assert!(store.tasks().is_empty());

    gate.add_permits(1);
    worker.await.unwrap();

    let state = store.snapshot();
    assert!(!state.loading);
    assert_eq!(state.tasks, vec![task("1", "x", false)]);
}

#[tokio::test]
async fn dropped_operation_clears_loading_and_keeps_tasks() {
    let gate = Arc::new(Semaphore::new(0));
    let store = TaskStore::new(FakeTaskRepository::gated(gate.clone()));

    let outcome = tokio::time::timeout(Duration::from_millis(20), store.fetch_all()).await;

    assert!(outcome.is_err());
    assert!(!store.is_loading());
    assert!(store.tasks().is_empty());
    assert_eq!(store.error(), None);
}

#[tokio::test]
async fn dropped_subscriber_does_not_break_store() {
    let store = TaskStore::new(FakeTaskRepository::new());
    let subscriber = store.subscribe();
    drop(subscriber);

    store.add("still works").await;
    assert_eq!(store.tasks().len(), 1);
}
