use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Events emitted after state changes commit.
///
/// Consumers are strictly after-the-fact: the database transaction is the
/// source of truth, and a lost event never implies a lost write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Ledger events
    StockReceived {
        transaction_id: Uuid,
        product_id: Uuid,
        quantity: i32,
        new_quantity: i32,
    },
    StockIssued {
        transaction_id: Uuid,
        product_id: Uuid,
        quantity: i32,
        new_quantity: i32,
    },
    StockAdjusted {
        transaction_id: Uuid,
        product_id: Uuid,
        old_quantity: i32,
        new_quantity: i32,
    },
    LowStock {
        product_id: Uuid,
        quantity: i32,
        min_stock: i32,
    },

    // Catalog events
    ProductCreated(Uuid),
    ProductUpdated(Uuid),
    ProductDeactivated(Uuid),
    CategoryCreated(Uuid),
    SupplierCreated {
        supplier_id: Uuid,
    },

    // Valuation marker emitted with adjustments that change book value
    InventoryRevalued {
        product_id: Uuid,
        delta_value: Decimal,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Drains the event channel, logging each event.
///
/// Runs until every sender is dropped; spawned once at startup.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    info!("Event processor started");
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::LowStock {
                product_id,
                quantity,
                min_stock,
            } => {
                warn!(
                    product_id = %product_id,
                    quantity,
                    min_stock,
                    "Product at or below low-stock threshold"
                );
            }
            other => debug!(event = ?other, "Processed event"),
        }
    }
    info!("Event processor stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_to_receiver() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);

        sender
            .send(Event::ProductCreated(Uuid::new_v4()))
            .await
            .unwrap();

        assert!(matches!(
            rx.recv().await,
            Some(Event::ProductCreated(_))
        ));
    }

    #[tokio::test]
    async fn send_fails_when_receiver_dropped() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);

        let result = sender.send(Event::ProductUpdated(Uuid::new_v4())).await;
        assert!(result.is_err());
    }
}
