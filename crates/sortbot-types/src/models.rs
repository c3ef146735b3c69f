use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// One reward token is worth five US cents at the kiosk.
pub const TOKEN_VALUE_USD: f64 = 0.05;

/// What the classifier said the item on the platform is.
///
/// The set is closed on purpose: the hardware only has two chutes, and the
/// statistics table only has three counters. Anything else the model emits
/// is carried verbatim as `Unrecognized`: it still produces an event row,
/// but never touches a daily counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ItemCategory {
    Can,
    Recycling,
    Garbage,
    Unrecognized(String),
}

impl ItemCategory {
    /// Case-insensitive parse; never fails.
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "can" => ItemCategory::Can,
            "recycling" => ItemCategory::Recycling,
            "garbage" => ItemCategory::Garbage,
            _ => ItemCategory::Unrecognized(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ItemCategory::Can => "can",
            ItemCategory::Recycling => "recycling",
            ItemCategory::Garbage => "garbage",
            ItemCategory::Unrecognized(raw) => raw,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, ItemCategory::Unrecognized(_))
    }
}

impl fmt::Display for ItemCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for ItemCategory {
    fn from(raw: String) -> Self {
        ItemCategory::parse(&raw)
    }
}

impl From<ItemCategory> for String {
    fn from(category: ItemCategory) -> Self {
        category.as_str().to_string()
    }
}

/// Which chute the platform tipped the item into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    Recycling,
    Garbage,
}

impl Destination {
    /// Case-insensitive parse. Unlike categories, an unknown destination is
    /// rejected, since it would mean the hardware did something we cannot record.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "recycling" => Some(Destination::Recycling),
            "garbage" => Some(Destination::Garbage),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Destination::Recycling => "recycling",
            Destination::Garbage => "garbage",
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Award,
    Redeem,
    Adjustment,
}

impl TransactionType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "award" => Some(TransactionType::Award),
            "redeem" => Some(TransactionType::Redeem),
            "adjustment" => Some(TransactionType::Adjustment),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Award => "award",
            TransactionType::Redeem => "redeem",
            TransactionType::Adjustment => "adjustment",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Free-form key/value blob attached to events, images, users and
/// transactions. Stored as JSON text and parsed lazily by readers; text
/// that does not parse as a JSON object is carried as the raw string
/// rather than treated as an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Metadata {
    Map(Map<String, Value>),
    Raw(String),
}

impl Metadata {
    pub fn parse(text: &str) -> Self {
        match serde_json::from_str::<Map<String, Value>>(text) {
            Ok(map) => Metadata::Map(map),
            Err(_) => Metadata::Raw(text.to_string()),
        }
    }

    pub fn as_map(&self) -> Option<&Map<String, Value>> {
        match self {
            Metadata::Map(map) => Some(map),
            Metadata::Raw(_) => None,
        }
    }
}

impl From<Map<String, Value>> for Metadata {
    fn from(map: Map<String, Value>) -> Self {
        Metadata::Map(map)
    }
}

/// One physical sort action. Immutable once recorded, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "item_type")]
    pub category: ItemCategory,
    pub confidence: f64,
    #[serde(rename = "sort_destination")]
    pub destination: Destination,
    pub image_id: Option<Uuid>,
    pub user_id: Option<String>,
    pub metadata: Option<Metadata>,
}

/// Running counters for one UTC calendar date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyStatistic {
    pub date: NaiveDate,
    pub can_count: i64,
    pub recycling_count: i64,
    pub garbage_count: i64,
    pub total_count: i64,
    pub token_rewards: f64,
    pub metadata: Option<Metadata>,
}

/// All-time sums across every statistics row. Zero-valued when the store
/// is empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TotalStatistics {
    pub total_cans: i64,
    pub total_recycling: i64,
    pub total_garbage: i64,
    pub grand_total: i64,
    pub total_rewards: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// First 16 hex chars of SHA-256(username), stable across reinstalls
    /// so a re-registered kiosk keeps crediting the same person.
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    pub token_balance: f64,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    pub settings: Option<Metadata>,
}

impl User {
    pub fn balance_usd(&self) -> f64 {
        self.token_balance * TOKEN_VALUE_USD
    }
}

/// One entry in the append-only token ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenTransaction {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
    pub amount: f64,
    pub transaction_type: TransactionType,
    /// Usually the sort event that earned the tokens.
    pub reference_id: Option<Uuid>,
    pub metadata: Option<Metadata>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parse_is_case_insensitive() {
        assert_eq!(ItemCategory::parse("Can"), ItemCategory::Can);
        assert_eq!(ItemCategory::parse("RECYCLING"), ItemCategory::Recycling);
        assert_eq!(ItemCategory::parse("garbage"), ItemCategory::Garbage);
    }

    #[test]
    fn test_category_keeps_unrecognized_raw() {
        let cat = ItemCategory::parse("compost");
        assert_eq!(cat, ItemCategory::Unrecognized("compost".to_string()));
        assert_eq!(cat.as_str(), "compost");
        assert!(!cat.is_recognized());
    }

    #[test]
    fn test_destination_rejects_unknown() {
        assert_eq!(Destination::parse("Recycling"), Some(Destination::Recycling));
        assert_eq!(Destination::parse("landfill"), None);
    }

    #[test]
    fn test_metadata_falls_back_to_raw_string() {
        let good = Metadata::parse(r#"{"source":"sort_event"}"#);
        assert!(good.as_map().is_some());

        let bad = Metadata::parse("not json at all");
        assert_eq!(bad, Metadata::Raw("not json at all".to_string()));
    }

    #[test]
    fn test_balance_converts_at_token_value() {
        let user = User {
            id: "ab12".to_string(),
            username: "alice".to_string(),
            email: None,
            token_balance: 40.0,
            created_at: chrono::Utc::now(),
            last_login: None,
            settings: None,
        };
        assert_eq!(user.balance_usd(), 2.0);
    }

    #[test]
    fn test_category_serializes_as_plain_string() {
        let json = serde_json::to_string(&ItemCategory::Can).unwrap();
        assert_eq!(json, "\"can\"");
        let back: ItemCategory = serde_json::from_str("\"foam\"").unwrap();
        assert_eq!(back, ItemCategory::Unrecognized("foam".to_string()));
    }
}
