// Order lifecycle
pub mod archival;
pub mod orders;
pub mod payments;

// Accounts
pub mod users;
