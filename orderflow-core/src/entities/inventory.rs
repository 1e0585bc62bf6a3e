use serde::{Deserialize, Serialize};

/// Key of the single inventory item.
pub const INVENTORY_KEY: &str = "inventory";

/// Stock assumed when the inventory item has never been written.
pub const DEFAULT_STOCK: i64 = 100;

/// Name of the counter attribute, used in conditional writes.
pub const STOCK_ATTRIBUTE: &str = "stock_quantity";

/// Global stock counter, decremented once per processed order.
///
/// The quantity may go negative: there is no reservation or floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InventoryRecord {
    pub stock_quantity: i64,
}

// Serialized form carries the fixed key.
#[derive(Serialize, Deserialize)]
struct InventoryItem {
    #[serde(rename = "PK")]
    pk: String,
    #[serde(default = "default_stock")]
    stock_quantity: i64,
}

fn default_stock() -> i64 {
    DEFAULT_STOCK
}

impl Serialize for InventoryRecord {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        InventoryItem {
            pk: INVENTORY_KEY.to_owned(),
            stock_quantity: self.stock_quantity,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for InventoryRecord {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let item = InventoryItem::deserialize(deserializer)?;
        Ok(Self {
            stock_quantity: item.stock_quantity,
        })
    }
}

impl Default for InventoryRecord {
    fn default() -> Self {
        Self {
            stock_quantity: DEFAULT_STOCK,
        }
    }
}

impl InventoryRecord {
    /// The record after one unit has been taken.
    pub fn decremented(self) -> Self {
        Self {
            stock_quantity: self.stock_quantity - 1,
        }
    }
}
