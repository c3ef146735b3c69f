//! Cross-cutting store scenarios: persistence across reopen, the
//! recognized-events/grand-total property, ledger reconciliation, and the
//! backup extract.

use serde_json::{Map, Value};

use sortbot_db::Database;
use sortbot_types::models::{Destination, ItemCategory, TransactionType};

#[test]
fn grand_total_counts_only_recognized_events() {
    let db = Database::open_in_memory().unwrap();

    let sequence = [
        ("can", "recycling"),
        ("recycling", "recycling"),
        ("mystery_goo", "garbage"),
        ("garbage", "garbage"),
        ("CAN", "recycling"),
        ("plastic_bag", "garbage"),
    ];
    let mut recognized = 0;
    for (raw_category, raw_destination) in sequence {
        let category = ItemCategory::parse(raw_category);
        if category.is_recognized() {
            recognized += 1;
        }
        db.record_event(
            category,
            0.75,
            Destination::parse(raw_destination).unwrap(),
            None,
            None,
            None,
        )
        .unwrap();
    }

    let totals = db.get_total_statistics().unwrap();
    assert_eq!(totals.grand_total, recognized);
    assert_eq!(db.list_recent_events(100).unwrap().len(), sequence.len());
}

#[test]
fn store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sorting_data.db");

    let event_id = {
        let db = Database::open(&path).unwrap();
        let alice = db.create_user("alice", None, None).unwrap();
        let event_id = db
            .record_event(
                ItemCategory::Can,
                0.97,
                Destination::Recycling,
                None,
                Some(&alice),
                None,
            )
            .unwrap();
        db.award_tokens(&alice, 1, Some(event_id)).unwrap();
        event_id
    };

    let db = Database::open(&path).unwrap();
    let row = db.get_event(event_id).unwrap();
    assert_eq!(row.item_type, "can");

    let alice = db.get_user("alice").unwrap().unwrap();
    assert_eq!(alice.token_balance, 1.0);
    assert_eq!(db.get_total_statistics().unwrap().grand_total, 1);
}

#[test]
fn balance_reconciles_with_ledger_after_mixed_activity() {
    let db = Database::open_in_memory().unwrap();
    let alice = db.create_user("alice", None, None).unwrap();
    let bob = db.create_user("bob", None, None).unwrap();

    db.award_tokens(&alice, 3, None).unwrap();
    db.record_token_transaction(&alice, -1.5, TransactionType::Redeem, None, None)
        .unwrap();
    db.award_tokens(&bob, 2, None).unwrap();
    db.record_token_transaction(&alice, 0.5, TransactionType::Adjustment, None, None)
        .unwrap();

    for user in [&alice, &bob] {
        let ledger: f64 = db
            .get_user_transactions(user, 100)
            .unwrap()
            .iter()
            .map(|t| t.amount)
            .sum();
        assert_eq!(db.get_user_balance(user).unwrap(), ledger);
    }

    assert_eq!(db.get_user_balance(&alice).unwrap(), 2.0);
    assert_eq!(db.get_user_balance(&bob).unwrap(), 2.0);
    assert_eq!(db.get_total_statistics().unwrap().total_rewards, 4.0);
}

#[test]
fn backup_writes_all_tables_without_image_blobs() {
    let db = Database::open_in_memory().unwrap();
    let alice = db.create_user("alice", Some("alice@example.com"), None).unwrap();

    let mut meta = Map::new();
    meta.insert("note".into(), Value::from("first sort of the day"));
    let event_id = db
        .record_event(
            ItemCategory::Can,
            0.91,
            Destination::Recycling,
            None,
            Some(&alice),
            Some(&meta),
        )
        .unwrap();
    db.award_tokens(&alice, 1, Some(event_id)).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let resolved = db.backup(dir.path()).unwrap();

    for name in [
        "sort_events.json",
        "users.json",
        "token_transactions.json",
        "statistics.json",
    ] {
        let text = std::fs::read_to_string(resolved.join(name)).unwrap();
        let rows: Vec<Value> = serde_json::from_str(&text).unwrap();
        assert_eq!(rows.len(), 1, "{name} should hold one row");
    }

    // No image dump, and no blob columns inside any extract.
    assert!(!resolved.join("images.json").exists());
    let events_text = std::fs::read_to_string(resolved.join("sort_events.json")).unwrap();
    assert!(!events_text.contains("image_data"));
}
