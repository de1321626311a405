pub mod order;
pub mod order_history;
pub mod order_item;
pub mod payment;
pub mod user;
