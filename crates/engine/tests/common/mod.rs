//! Shared fixtures for engine integration tests

#![allow(dead_code)]

use arbor_core::{ListKind, NodeReference, NodeType, Path, Properties, PropertyValue, TypedList};
use arbor_engine::{Repository, Session};

pub fn p(s: &str) -> Path {
    Path::new(s).unwrap()
}

pub fn doc() -> NodeType {
    "acme:doc:1".parse().unwrap()
}

pub fn folder() -> NodeType {
    "acme:folder:1".parse().unwrap()
}

pub fn props(pairs: &[(&str, PropertyValue)]) -> Properties {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

pub fn text(s: &str) -> PropertyValue {
    PropertyValue::String(s.to_string())
}

pub fn reference(path: &str) -> PropertyValue {
    PropertyValue::Reference(NodeReference::new(p(path)))
}

pub fn reference_list(paths: &[&str]) -> PropertyValue {
    let items = paths
        .iter()
        .map(|path| PropertyValue::Reference(NodeReference::new(p(path))))
        .collect();
    PropertyValue::List(TypedList::new(ListKind::Reference, items).unwrap())
}

pub async fn repo() -> Repository {
    Repository::in_memory().await.unwrap()
}

/// Create `/name` (and any listed children) under the root and commit
pub async fn seed(repo: &Repository, paths: &[&str]) {
    let mut session = repo.login("seed").await.unwrap();
    for path in paths {
        let path = p(path);
        let parent = path.parent().unwrap();
        session
            .create_node(&parent, path.name(), folder(), Properties::new())
            .await
            .unwrap();
    }
    session.commit().await.unwrap();
    session.close().await.unwrap();
}

pub async fn paths_of(session: &Session, parent: &str) -> Vec<String> {
    session
        .children(&p(parent))
        .await
        .unwrap()
        .into_iter()
        .map(|node| node.path.to_string())
        .collect()
}
