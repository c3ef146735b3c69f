//! Database row types: these map SQLite rows 1:1.
//!
//! Distinct from the sortbot-types domain/API models to keep the DB layer
//! independent: timestamps and metadata stay as the TEXT the engine
//! returned, and readers parse them lazily.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct EventRow {
    pub id: String,
    pub timestamp: String,
    pub item_type: String,
    pub confidence: f64,
    pub sort_destination: String,
    pub image_id: Option<String>,
    pub user_id: Option<String>,
    pub metadata: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ImageRow {
    pub id: String,
    pub timestamp: String,
    pub image_data: Vec<u8>,
    pub thumbnail: Vec<u8>,
    pub metadata: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    pub token_balance: f64,
    pub created_at: String,
    pub last_login: Option<String>,
    pub settings: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionRow {
    pub id: String,
    pub timestamp: String,
    pub user_id: String,
    pub amount: f64,
    pub transaction_type: String,
    pub reference_id: Option<String>,
    pub metadata: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyStatRow {
    pub date: String,
    pub can_count: i64,
    pub recycling_count: i64,
    pub garbage_count: i64,
    pub total_count: i64,
    pub token_rewards: f64,
    pub metadata: Option<String>,
}
