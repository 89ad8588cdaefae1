// Resolve-or-create policy across connections sharing one database file.

use std::sync::Arc;
use std::thread;

use rodo_core::types::MessageRole;
use rodo_store::ConversationStore;
use rusqlite::{params, Connection};

fn temp_db() -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("rodo.db");
    (dir, path)
}

#[test]
fn concurrent_resolvers_share_one_active_conversation() {
    let (_dir, path) = temp_db();
    // Create the schema once before the race.
    ConversationStore::open(&path).expect("open");

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let path = path.clone();
            thread::spawn(move || {
                let store = ConversationStore::open(&path).expect("open");
                let producer = store
                    .resolve_producer("+5493410000000")
                    .expect("resolve producer")
                    .into_producer();
                let conversation = store
                    .resolve_active_conversation(&producer.id)
                    .expect("resolve conversation");
                (producer.id, conversation.id)
            })
        })
        .collect();

    let results: Vec<(String, String)> = handles
        .into_iter()
        .map(|h| h.join().expect("thread"))
        .collect();

    let (producer_id, conversation_id) = results[0].clone();
    for (p, c) in &results {
        assert_eq!(p, &producer_id);
        assert_eq!(c, &conversation_id);
    }

    let store = ConversationStore::open(&path).expect("open");
    assert_eq!(store.conversation_count(&producer_id).expect("count"), 1);
}

#[test]
fn shared_store_serialises_appends() {
    let store = Arc::new(ConversationStore::open_in_memory().expect("open"));
    let producer = store
        .resolve_producer("+5493411111111")
        .expect("resolve")
        .into_producer();
    let conversation = store
        .resolve_active_conversation(&producer.id)
        .expect("conversation");

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = Arc::clone(&store);
            let id = conversation.id.clone();
            thread::spawn(move || {
                store
                    .append_message(&id, MessageRole::User, &format!("msg {i}"))
                    .expect("append");
            })
        })
        .collect();
    for h in handles {
        h.join().expect("thread");
    }

    assert_eq!(store.message_count(&conversation.id).expect("count"), 8);
    let recent = store.recent_messages(&conversation.id, 20).expect("recent");
    let ids: Vec<i64> = recent.iter().map(|m| m.id).collect();
    let mut sorted = ids.clone();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    assert_eq!(ids, sorted, "recent_messages must be newest first");
}

#[test]
fn profile_and_inventory_are_loaded_eagerly() {
    let (_dir, path) = temp_db();
    let store = ConversationStore::open(&path).expect("open");
    let producer = store
        .resolve_producer("+5493412222222")
        .expect("resolve")
        .into_producer();

    // Profile management lives outside the relay; write the rows directly.
    let conn = Connection::open(&path).expect("raw connection");
    conn.execute(
        "UPDATE producers SET name = ?1, location = ?2, hectares = ?3, main_crops = ?4
         WHERE id = ?5",
        params!["Juan", "Pergamino", 1500.0, r#"["soja","maiz"]"#, producer.id],
    )
    .expect("update profile");
    conn.execute(
        "INSERT INTO inventory (id, producer_id, crop, quantity, quality, harvest, created_at, updated_at)
         VALUES ('inv-1', ?1, 'soja', 1200.0, 'grado 2', '24/25',
                 '2026-01-01T00:00:00.000Z', '2026-01-01T00:00:00.000Z')",
        params![producer.id],
    )
    .expect("insert inventory");
    drop(conn);

    let loaded = store
        .get_producer("+5493412222222")
        .expect("get")
        .expect("exists");
    assert_eq!(loaded.name.as_deref(), Some("Juan"));
    assert_eq!(loaded.hectares, Some(1500.0));
    assert_eq!(loaded.main_crops, vec!["soja".to_string(), "maiz".to_string()]);
    assert_eq!(loaded.inventory.len(), 1);
    assert_eq!(loaded.inventory[0].quality.as_deref(), Some("grado 2"));
    assert!(!loaded.is_blank());
}
