use std::sync::Mutex;

use crossbeam_channel::{Receiver, Sender, unbounded};

use sortbot_types::events::StoreNotification;

/// Fan-out of store mutation notifications.
///
/// Each subscriber gets its own unbounded channel; senders whose receiver
/// has been dropped are pruned on the next publish. The store never calls
/// back into its observers.
pub struct Notifier {
    subscribers: Mutex<Vec<Sender<StoreNotification>>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribe(&self) -> Receiver<StoreNotification> {
        let (tx, rx) = unbounded();
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.push(tx);
        }
        rx
    }

    pub fn publish(&self, note: StoreNotification) {
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.retain(|tx| tx.send(note.clone()).is_ok());
        }
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sortbot_types::models::{Destination, ItemCategory};
    use uuid::Uuid;

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let notifier = Notifier::new();
        let rx = notifier.subscribe();
        drop(rx);

        let kept = notifier.subscribe();
        notifier.publish(StoreNotification::EventRecorded {
            event_id: Uuid::new_v4(),
            category: ItemCategory::Can,
            destination: Destination::Recycling,
        });

        assert_eq!(kept.try_iter().count(), 1);
    }
}
