use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::entities::payment::PaymentMethod;

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

    /// Sends an event after a commit. A closed channel is logged and otherwise ignored.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!(error = %e, "Dropping domain event");
        }
    }
}

/// Domain events emitted once the corresponding transaction has committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    UserRegistered(Uuid),
    OrderCreated {
        order_id: Uuid,
        user_id: Uuid,
        total_amount: Decimal,
    },
    OrderCancelled {
        order_id: Uuid,
        reason: String,
    },
    PaymentRecorded {
        order_id: Uuid,
        transaction_id: String,
        method: PaymentMethod,
        amount: Decimal,
    },
    OrderArchived {
        order_id: Uuid,
        updated_by: String,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::UserRegistered(_) => "user_registered",
            Event::OrderCreated { .. } => "order_created",
            Event::OrderCancelled { .. } => "order_cancelled",
            Event::PaymentRecorded { .. } => "payment_recorded",
            Event::OrderArchived { .. } => "order_archived",
        }
    }
}

/// Creates a bounded event channel
pub fn channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (EventSender::new(tx), rx)
}

pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::UserRegistered(user_id) => {
                info!(event = event.name(), %user_id, "User registered");
            }
            Event::OrderCreated {
                order_id,
                user_id,
                total_amount,
            } => {
                info!(event = event.name(), %order_id, %user_id, %total_amount, "Order created");
            }
            Event::OrderCancelled { order_id, reason } => {
                info!(event = event.name(), %order_id, reason = %reason, "Order cancelled");
            }
            Event::PaymentRecorded {
                order_id,
                transaction_id,
                method,
                amount,
            } => {
                info!(
                    event = event.name(),
                    %order_id,
                    transaction_id = %transaction_id,
                    %method,
                    %amount,
                    "Payment recorded"
                );
            }
            Event::OrderArchived {
                order_id,
                updated_by,
            } => {
                info!(event = event.name(), %order_id, updated_by = %updated_by, "Order archived");
            }
        }
    }

    info!("Event channel closed; event processing loop stopped");
}
