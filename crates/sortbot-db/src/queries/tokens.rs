use chrono::Utc;
use rusqlite::params;
use serde_json::{Map, Value};
use uuid::Uuid;

use sortbot_types::events::StoreNotification;
use sortbot_types::models::TransactionType;

use crate::Database;
use crate::error::{Result, StoreError};
use crate::models::TransactionRow;

use super::metadata_to_text;

impl Database {
    /// Append a ledger entry and keep the balance and today's
    /// `token_rewards` in step with it inside one transaction, so the
    /// ledger can never disagree with the balance.
    pub fn record_token_transaction(
        &self,
        user_id: &str,
        amount: f64,
        transaction_type: TransactionType,
        reference: Option<Uuid>,
        metadata: Option<&Map<String, Value>>,
    ) -> Result<Uuid> {
        const OP: &str = "record_token_transaction";

        let metadata_text = metadata_to_text(OP, metadata)?;
        let transaction_id = Uuid::new_v4();
        let now = Utc::now();

        let balance = self.with_conn_mut(|conn| {
            let tx = conn.transaction().map_err(StoreError::storage(OP))?;

            tx.execute(
                "INSERT INTO token_transactions
                     (id, timestamp, user_id, amount, transaction_type, reference_id, metadata)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    transaction_id.to_string(),
                    now.to_rfc3339(),
                    user_id,
                    amount,
                    transaction_type.as_str(),
                    reference.map(|id| id.to_string()),
                    metadata_text,
                ],
            )
            .map_err(StoreError::storage(OP))?;

            let changed = tx
                .execute(
                    "UPDATE users SET token_balance = token_balance + ?1 WHERE id = ?2",
                    params![amount, user_id],
                )
                .map_err(StoreError::storage(OP))?;
            if changed == 0 {
                // Dropping the transaction rolls the ledger insert back.
                return Err(StoreError::not_found("user", user_id));
            }

            super::stats::bump_token_rewards(&tx, OP, Database::today(), amount)?;

            let balance: f64 = tx
                .query_row(
                    "SELECT token_balance FROM users WHERE id = ?1",
                    [user_id],
                    |row| row.get(0),
                )
                .map_err(StoreError::storage(OP))?;

            tx.commit().map_err(StoreError::storage(OP))?;
            Ok(balance)
        })?;

        self.notify(StoreNotification::BalanceChanged {
            user_id: user_id.to_string(),
            amount,
            balance,
        });

        Ok(transaction_id)
    }

    /// One token per can, tagged the way the rewards UI expects.
    pub fn award_tokens(
        &self,
        user_id: &str,
        can_count: u32,
        reference: Option<Uuid>,
    ) -> Result<Uuid> {
        let mut metadata = Map::new();
        metadata.insert("source".to_string(), Value::from("can_recycling"));
        metadata.insert("can_count".to_string(), Value::from(can_count));

        self.record_token_transaction(
            user_id,
            f64::from(can_count),
            TransactionType::Award,
            reference,
            Some(&metadata),
        )
    }

    /// A user's ledger, most recent first.
    pub fn get_user_transactions(&self, user_id: &str, limit: u32) -> Result<Vec<TransactionRow>> {
        const OP: &str = "get_user_transactions";

        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, timestamp, user_id, amount, transaction_type, reference_id, metadata
                     FROM token_transactions WHERE user_id = ?1
                     ORDER BY timestamp DESC LIMIT ?2",
                )
                .map_err(StoreError::storage(OP))?;

            let rows = stmt
                .query_map(params![user_id, limit], |row| {
                    Ok(TransactionRow {
                        id: row.get(0)?,
                        timestamp: row.get(1)?,
                        user_id: row.get(2)?,
                        amount: row.get(3)?,
                        transaction_type: row.get(4)?,
                        reference_id: row.get(5)?,
                        metadata: row.get(6)?,
                    })
                })
                .map_err(StoreError::storage(OP))?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(StoreError::storage(OP))?;
            Ok(rows)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_user() -> (Database, String) {
        let db = Database::open_in_memory().unwrap();
        let id = db.create_user("alice", None, None).unwrap();
        (db, id)
    }

    #[test]
    fn test_award_updates_balance_and_daily_rewards() {
        let (db, alice) = store_with_user();

        db.record_token_transaction(&alice, 5.0, TransactionType::Award, None, None)
            .unwrap();

        assert_eq!(db.get_user_balance(&alice).unwrap(), 5.0);
        let today = db.get_daily_statistics(1).unwrap();
        assert_eq!(today.len(), 1);
        assert_eq!(today[0].token_rewards, 5.0);
    }

    #[test]
    fn test_balance_equals_ledger_sum() {
        let (db, alice) = store_with_user();
        let amounts = [3.0, 7.5, -2.0, 1.0];
        for amount in amounts {
            let transaction_type = if amount < 0.0 {
                TransactionType::Redeem
            } else {
                TransactionType::Award
            };
            db.record_token_transaction(&alice, amount, transaction_type, None, None)
                .unwrap();
        }

        let ledger: f64 = db
            .get_user_transactions(&alice, 100)
            .unwrap()
            .iter()
            .map(|t| t.amount)
            .sum();
        assert_eq!(db.get_user_balance(&alice).unwrap(), ledger);
        assert_eq!(ledger, amounts.iter().sum::<f64>());
    }

    #[test]
    fn test_unknown_user_rolls_back_ledger_insert() {
        let (db, alice) = store_with_user();

        let err = db
            .record_token_transaction("no-such-id", 1.0, TransactionType::Award, None, None)
            .unwrap_err();
        assert!(err.is_not_found());

        // Nothing landed: not in the ledger, not in the daily rewards.
        assert!(db.get_user_transactions("no-such-id", 10).unwrap().is_empty());
        assert_eq!(db.get_user_balance(&alice).unwrap(), 0.0);
        assert_eq!(db.get_total_statistics().unwrap().total_rewards, 0.0);
    }

    #[test]
    fn test_award_tokens_tags_metadata() {
        let (db, alice) = store_with_user();
        db.award_tokens(&alice, 4, None).unwrap();

        assert_eq!(db.get_user_balance(&alice).unwrap(), 4.0);
        let ledger = db.get_user_transactions(&alice, 10).unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].transaction_type, "award");
        let meta = sortbot_types::models::Metadata::parse(ledger[0].metadata.as_deref().unwrap());
        let map = meta.as_map().unwrap();
        assert_eq!(map["source"], "can_recycling");
        assert_eq!(map["can_count"], 4);
    }

    #[test]
    fn test_balance_change_notification_carries_new_balance() {
        let (db, alice) = store_with_user();
        let rx = db.subscribe();

        db.record_token_transaction(&alice, 2.5, TransactionType::Award, None, None)
            .unwrap();

        match rx.try_recv().unwrap() {
            StoreNotification::BalanceChanged { user_id, amount, balance } => {
                assert_eq!(user_id, alice);
                assert_eq!(amount, 2.5);
                assert_eq!(balance, 2.5);
            }
            other => panic!("unexpected notification: {other:?}"),
        }
    }
}
