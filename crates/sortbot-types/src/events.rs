use uuid::Uuid;

use crate::models::{Destination, ItemCategory};

/// Notifications published by the store after a successful mutation.
///
/// The desktop UI used to register balance-change callbacks directly on
/// the rewards layer; the store instead broadcasts these on a channel and
/// holds no references to its observers.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreNotification {
    EventRecorded {
        event_id: Uuid,
        category: ItemCategory,
        destination: Destination,
    },
    UserCreated {
        user_id: String,
        username: String,
    },
    BalanceChanged {
        user_id: String,
        amount: f64,
        balance: f64,
    },
}
