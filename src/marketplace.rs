// 6.0: marketplace catalog and owned copies.

use crate::types::{AccountId, Amount, ItemId, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Cars,
    Houses,
    Gadgets,
    Clothing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub description: String,
    pub price: Amount,
    pub category: Category,
}

impl Item {
    pub fn new(id: u32, name: &str, description: &str, price: u64, category: Category) -> Self {
        Self {
            id: ItemId(id),
            name: name.to_string(),
            description: description.to_string(),
            price: Amount::new(price),
            category,
        }
    }
}

pub fn default_items() -> Vec<Item> {
    vec![
        Item::new(1, "Sports Car", "Two seats, too much horsepower", 250_000, Category::Cars),
        Item::new(2, "Electric Sedan", "Quiet and quick", 90_000, Category::Cars),
        Item::new(3, "Beach House", "Ocean view, private pier", 12_000_000, Category::Houses),
        Item::new(4, "Penthouse", "Top floor downtown", 45_000_000, Category::Houses),
        Item::new(5, "Smartphone", "Latest flagship", 1_200, Category::Gadgets),
        Item::new(6, "Smartwatch", "Tracks everything", 800, Category::Gadgets),
        Item::new(7, "Designer Jacket", "Limited edition", 5_000, Category::Clothing),
        Item::new(8, "Sneakers", "Hyped collab", 700, Category::Clothing),
    ]
}

/// An owned copy, written in the same commit as the purchase debit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryEntry {
    pub id: u64,
    pub owner: AccountId,
    pub item_id: ItemId,
    pub item_name: String,
    pub purchase_price: Amount,
    pub purchased_at: Timestamp,
}

/// Inventory entry before the store assigns its id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewInventoryEntry {
    pub owner: AccountId,
    pub item_id: ItemId,
    pub item_name: String,
    pub purchase_price: Amount,
    pub purchased_at: Timestamp,
}

impl NewInventoryEntry {
    pub fn for_item(owner: AccountId, item: &Item, at: Timestamp) -> Self {
        Self {
            owner,
            item_id: item.id,
            item_name: item.name.clone(),
            purchase_price: item.price,
            purchased_at: at,
        }
    }

    pub fn into_entry(self, id: u64) -> InventoryEntry {
        InventoryEntry {
            id,
            owner: self.owner,
            item_id: self.item_id,
            item_name: self.item_name,
            purchase_price: self.purchase_price,
            purchased_at: self.purchased_at,
        }
    }
}
