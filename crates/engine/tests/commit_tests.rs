//! Bootstrap, commit sequencing and journal recovery

mod common;

use arbor_core::{
    CommittedInverseNodeReference, Error, NodeType, Properties, PropertyValue, RevisionNumber,
};
use arbor_engine::{
    LocalClusterSync, MemorySearchIndex, NodeUpdate, Repository, DEFAULT_LOCK_NAME,
};
use arbor_store::memory::{MemoryDataPartition, MemoryJournal};
use arbor_store::Partitions;
use common::*;
use futures::TryStreamExt;
use std::sync::Arc;

fn r(n: u128) -> RevisionNumber {
    RevisionNumber::new(n)
}

/// In-memory partitions with the committed store and journal kept inspectable
fn inspectable() -> (Partitions, Arc<MemoryDataPartition>, Arc<MemoryJournal>) {
    let data = Arc::new(MemoryDataPartition::new());
    let journal = Arc::new(MemoryJournal::new());
    let mut partitions = Partitions::in_memory();
    partitions.data = data.clone();
    partitions.journal = journal.clone();
    (partitions, data, journal)
}

#[tokio::test]
async fn test_bootstrap_writes_root_at_revision_zero() {
    let repo = repo().await;
    assert_eq!(repo.current_revision().await.unwrap(), RevisionNumber::INITIAL);
    assert!(!repo.bootstrap().await.unwrap());

    let session = repo.login("u").await.unwrap();
    let root = session.node(&p("/")).await.unwrap().unwrap();
    assert_eq!(root.node_type, NodeType::root());
    assert!(root.path.is_root());
}

#[tokio::test]
async fn test_bootstrap_uses_configured_root_type() {
    let root_type: NodeType = "acme:site:2".parse().unwrap();
    let repo = Repository::builder(Partitions::in_memory())
        .root_node_type(root_type.clone())
        .open()
        .await
        .unwrap();
    let session = repo.login("u").await.unwrap();
    assert_eq!(session.node(&p("/")).await.unwrap().unwrap().node_type, root_type);
}

#[tokio::test]
async fn test_bootstrap_is_skipped_while_lock_held() {
    let sync = Arc::new(LocalClusterSync::new());
    let repo = Repository::builder(Partitions::in_memory())
        .cluster(sync.clone())
        .build();

    let held = repo.cluster().try_acquire(DEFAULT_LOCK_NAME).await.unwrap().unwrap();
    assert!(!repo.bootstrap().await.unwrap());
    assert!(matches!(repo.current_revision().await, Err(Error::NotBootstrapped)));
    assert!(matches!(repo.login("u").await, Err(Error::NotBootstrapped)));

    drop(held);
    assert!(repo.bootstrap().await.unwrap());
    assert_eq!(repo.current_revision().await.unwrap(), RevisionNumber::INITIAL);
}

#[tokio::test]
async fn test_each_commit_advances_revision_by_one() {
    let (partitions, data, _) = inspectable();
    let repo = Repository::builder(partitions).open().await.unwrap();
    let mut session = repo.login("u").await.unwrap();
    session
        .create_node(&p("/"), "counter", doc(), Properties::new())
        .await
        .unwrap();
    session.commit().await.unwrap();

    for n in 0..4 {
        session
            .update_node(&p("/counter"), NodeUpdate::new(props(&[("n", PropertyValue::Int(n))])))
            .await
            .unwrap();
        session.commit().await.unwrap();
    }

    assert_eq!(repo.current_revision().await.unwrap(), r(5));
    // root plus one record per commit of /counter
    assert_eq!(data.record_count(), 6);
    assert_eq!(session.revision(), r(5));
}

#[tokio::test]
async fn test_commit_without_edits_keeps_revision() {
    let repo = repo().await;
    let mut session = repo.login("u").await.unwrap();
    assert_eq!(session.commit().await.unwrap(), None);

    session
        .create_node(&p("/"), "draft", doc(), Properties::new())
        .await
        .unwrap();
    session.delete_node(&p("/draft")).await.unwrap();
    assert_eq!(session.commit().await.unwrap(), None);
    assert!(session.pending_paths().await.unwrap().is_empty());
    assert_eq!(repo.current_revision().await.unwrap(), RevisionNumber::INITIAL);
}

#[tokio::test]
async fn test_commit_refused_while_lock_held() {
    let repo = repo().await;
    let mut session = repo.login("u").await.unwrap();
    session
        .create_node(&p("/"), "n", doc(), Properties::new())
        .await
        .unwrap();

    let held = repo.cluster().try_acquire(DEFAULT_LOCK_NAME).await.unwrap().unwrap();
    assert!(matches!(session.commit().await, Err(Error::LockHeld(_))));
    assert_eq!(session.pending_paths().await.unwrap(), vec![p("/n")]);

    drop(held);
    assert_eq!(session.commit().await.unwrap(), Some(r(1)));
}

#[tokio::test]
async fn test_replay_after_crash_before_catalog_advance() {
    let (partitions, data, journal) = inspectable();
    let repo = Repository::builder(partitions.clone()).open().await.unwrap();
    let session = repo.login("u").await.unwrap();
    session
        .create_node(&p("/"), "a", doc(), props(&[("v", PropertyValue::Long(1))]))
        .await
        .unwrap();

    // journal set written and committed store updated, then the process died
    let revision = repo
        .commit_protocol()
        .create_journal_entries(session.id())
        .await
        .unwrap()
        .unwrap();
    let entries: Vec<_> = partitions.journal.entries_for(revision).try_collect().await.unwrap();
    partitions.data.write_from_journal(entries).await.unwrap();
    assert_eq!(repo.current_revision().await.unwrap(), RevisionNumber::INITIAL);

    assert_eq!(repo.recover().await.unwrap(), vec![revision]);
    assert_eq!(repo.current_revision().await.unwrap(), revision);
    assert_eq!(journal.pending_count(), 0);
    assert_eq!(data.record_count(), 2);

    let reader = repo.login("reader").await.unwrap();
    let node = reader.node(&p("/a")).await.unwrap().unwrap();
    assert_eq!(node.property("v"), Some(&PropertyValue::Long(1)));
}

#[tokio::test]
async fn test_replay_after_crash_between_catalog_and_journal_removal() {
    let (partitions, data, journal) = inspectable();
    let repo = Repository::builder(partitions.clone()).open().await.unwrap();
    seed(&repo, &["/target"]).await;
    let session = repo.login("u").await.unwrap();
    session
        .create_node(&p("/"), "src", doc(), props(&[("to", reference("/target"))]))
        .await
        .unwrap();

    // everything but the journal removal happened
    let revision = repo
        .commit_protocol()
        .create_journal_entries(session.id())
        .await
        .unwrap()
        .unwrap();
    let entries: Vec<_> = partitions.journal.entries_for(revision).try_collect().await.unwrap();
    let rows = entries
        .iter()
        .flat_map(|e| e.inverse_references(e.prior.as_ref()))
        .map(|edge| CommittedInverseNodeReference::new(revision, edge))
        .collect();
    partitions.data.write_from_journal(entries).await.unwrap();
    partitions.committed_index.create(rows).await.unwrap();
    partitions.catalog.set_revision(revision).await.unwrap();
    let records = data.record_count();

    assert_eq!(repo.recover().await.unwrap(), vec![revision]);
    assert_eq!(repo.current_revision().await.unwrap(), revision);
    assert_eq!(journal.pending_count(), 0);
    assert_eq!(data.record_count(), records);

    let reader = repo.login("reader").await.unwrap();
    let edges = reader.references_to(&p("/target")).await.unwrap();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].referring_node_path, p("/src"));
}

#[tokio::test]
async fn test_commit_applies_stale_sets_before_its_own() {
    let repo = repo().await;
    let stalled = repo.login("stalled").await.unwrap();
    stalled
        .create_node(&p("/"), "first", doc(), Properties::new())
        .await
        .unwrap();
    repo.commit_protocol()
        .create_journal_entries(stalled.id())
        .await
        .unwrap();

    let mut next = repo.login("next").await.unwrap();
    next.create_node(&p("/"), "second", doc(), Properties::new())
        .await
        .unwrap();
    assert_eq!(next.commit().await.unwrap(), Some(r(2)));
    assert_eq!(repo.pending_revision().await.unwrap(), None);
    assert_eq!(paths_of(&next, "/").await, vec!["/first", "/second"]);
}

#[tokio::test]
async fn test_commit_feeds_search_index() {
    let search = Arc::new(MemorySearchIndex::new());
    let repo = Repository::builder(Partitions::in_memory())
        .search(search.clone())
        .open()
        .await
        .unwrap();
    let mut session = repo.login("u").await.unwrap();
    session
        .create_node(&p("/"), "note", doc(), props(&[("body", text("hello arbor"))]))
        .await
        .unwrap();
    session.commit().await.unwrap();
    assert_eq!(search.containing_text("arbor"), vec![p("/note")]);
    assert_eq!(search.of_type(&doc()), vec![p("/note")]);

    session.delete_node(&p("/note")).await.unwrap();
    session.commit().await.unwrap();
    assert!(search.containing_text("arbor").is_empty());
}

#[tokio::test]
async fn test_session_registry_follows_commits() {
    let repo = repo().await;
    let mut session = repo.login("ada").await.unwrap();
    let id = session.id();
    let registered = repo.cluster().get_session_info(id).await.unwrap().unwrap();
    assert_eq!(registered.user, "ada");
    assert_eq!(registered.revision, RevisionNumber::INITIAL);

    session
        .create_node(&p("/"), "n", doc(), Properties::new())
        .await
        .unwrap();
    let revision = session.commit().await.unwrap().unwrap();
    assert_eq!(
        repo.cluster().get_session_info(id).await.unwrap().unwrap().revision,
        revision
    );

    session.close().await.unwrap();
    assert!(repo.cluster().get_session_info(id).await.unwrap().is_none());
}
