//! Flashcard deck management with persistence.

use std::sync::Arc;

use serde_json::json;

use assessment_runtime::config::StorageConfig;
use assessment_runtime::models::deck::{DeckCollection, Flashcard};
use assessment_runtime::orchestrator::deck_manager::DeckManager;
use assessment_runtime::persistence::store::{
    DurableStore, MemoryBackend, StoreBackend, StoreKey, StoredRecord, Versioned,
};

use super::test_helpers::{memory_store, tiny_store};

#[tokio::test]
async fn decks_round_trip_through_store() {
    let store = memory_store();
    let deck_id = {
        let mut decks = DeckManager::load(store.clone()).await.expect("load");
        let deck = decks
            .create_deck("Spanish".into(), vec![Flashcard::new("hola", "hello")])
            .await
            .expect("create");
        decks
            .add_card(&deck.id, Flashcard::new("adios", "goodbye"))
            .await
            .expect("add")
            .expect("deck exists");
        deck.id
    };

    let decks = DeckManager::load(store).await.expect("reload");
    let deck = decks.get(&deck_id).expect("persisted");
    assert_eq!(deck.cards.len(), 2);
    assert_eq!(deck.cards[1].front, "adios");
}

#[tokio::test]
async fn newest_deck_is_listed_first() {
    let mut decks = DeckManager::load(memory_store()).await.expect("load");
    decks.create_deck("old".into(), Vec::new()).await.expect("create");
    decks.create_deck("new".into(), Vec::new()).await.expect("create");
    let names: Vec<_> = decks.list().iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, ["new", "old"]);
}

#[tokio::test]
async fn remove_card_and_delete_deck() {
    let mut decks = DeckManager::load(memory_store()).await.expect("load");
    let card = Flashcard::new("q", "a");
    let card_id = card.id.clone();
    let deck = decks.create_deck("Temp".into(), vec![card]).await.expect("create");

    assert!(decks.remove_card(&deck.id, &card_id).await.expect("remove"));
    assert!(!decks.remove_card(&deck.id, &card_id).await.expect("already gone"));
    assert!(decks.get(&deck.id).expect("deck").cards.is_empty());

    assert!(decks.delete_deck(&deck.id).await.expect("delete"));
    assert!(decks.list().is_empty());
}

#[tokio::test]
async fn unknown_ids_are_silent_no_ops() {
    let mut decks = DeckManager::load(memory_store()).await.expect("load");
    assert!(decks
        .add_card("ghost", Flashcard::new("a", "b"))
        .await
        .expect("ok")
        .is_none());
    assert!(!decks.remove_card("ghost", "card").await.expect("ok"));
    assert!(!decks.delete_deck("ghost").await.expect("ok"));
}

#[tokio::test]
async fn quota_failure_keeps_deck_in_memory() {
    let mut decks = DeckManager::load(tiny_store(8)).await.expect("load");
    let err = decks
        .create_deck("Offline".into(), vec![Flashcard::new("x", "y")])
        .await
        .expect_err("quota");
    assert!(err.is_quota_exceeded());
    assert_eq!(decks.list().len(), 1);
}

#[tokio::test]
async fn corrupt_deck_document_loads_as_empty_and_is_replaced() {
    let backend = Arc::new(MemoryBackend::new());
    backend
        .write(
            StoreKey::Decks.as_str(),
            StoredRecord {
                schema_version: DeckCollection::SCHEMA_VERSION,
                payload: json!({ "decks": 5 }).to_string(),
            },
        )
        .await
        .expect("seed corrupt record");
    let store = DurableStore::new(backend, &StorageConfig::default());

    let mut decks = DeckManager::load(store.clone()).await.expect("load");
    assert!(decks.list().is_empty());

    decks
        .create_deck("Fresh".into(), vec![Flashcard::new("a", "b")])
        .await
        .expect("create");
    let reloaded = DeckManager::load(store).await.expect("reload");
    assert_eq!(reloaded.list().len(), 1);
}
