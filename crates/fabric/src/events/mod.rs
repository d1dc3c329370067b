//! Closed event shapes per namespace.
//!
//! Every namespace carries a tagged enum of the facts it can publish;
//! subscribers match exhaustively so new variants surface as compile
//! errors in every consumer.

pub mod accounting;
pub mod alert;
pub mod booking;
pub mod customer_spend;
pub mod gift_card;
pub mod inventory;
pub mod order;
pub mod sales;
pub mod staff;

pub use accounting::AccountingEvent;
pub use alert::AlertEvent;
pub use booking::BookingDepositEvent;
pub use customer_spend::CustomerSpendEvent;
pub use gift_card::GiftCardEvent;
pub use inventory::InventoryEvent;
pub use order::{OrderEvent, OrderLine};
pub use sales::SalesEvent;
pub use staff::{EmployeeEvent, UserEvent};
