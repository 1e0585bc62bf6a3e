//! Records persisted by the consumers.
//!
//! Each record maps to one store item through serde; the `PK` attribute is
//! part of the serialized form.

pub mod inventory;
pub mod order_records;

pub use inventory::{DEFAULT_STOCK, INVENTORY_KEY, InventoryRecord};
pub use order_records::{OrderRecord, order_key};
