//! Item inventories with stack-size, slot-count and whitelist limits.
//!
//! A slot holds one item kind, up to that item's stack size. Counts are kept
//! in a sorted map that never stores zero, so two inventories with the same
//! contents compare equal.

use crate::registry::GameData;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Item name to count. Used for player inventories and cost summaries.
pub type ItemCounts = BTreeMap<String, u32>;

/// An item name with a count, in resolver output order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemAmount {
    pub name: String,
    pub amount: u32,
}

impl ItemAmount {
    pub fn new(name: &str, amount: u32) -> Self {
        Self {
            name: name.to_string(),
            amount,
        }
    }
}

/// Add `amount` of `item` to a plain count map, saturating at `u32::MAX`.
/// Use [`try_add_count`] where an overflow must be reported.
pub fn add_count(counts: &mut ItemCounts, item: &str, amount: u32) {
    if amount > 0 {
        let held = counts.entry(item.to_string()).or_insert(0);
        *held = held.saturating_add(amount);
    }
}

/// The count `item` would reach after adding `amount`.
pub fn check_add(counts: &ItemCounts, item: &str, amount: u32) -> Result<u32, InventoryError> {
    let held = counts.get(item).copied().unwrap_or(0);
    held.checked_add(amount).ok_or_else(|| InventoryError::CountOverflow {
        item: item.to_string(),
        held,
        amount,
    })
}

/// Add `amount` of `item`, failing without side effects on overflow.
pub fn try_add_count(counts: &mut ItemCounts, item: &str, amount: u32) -> Result<(), InventoryError> {
    let total = check_add(counts, item, amount)?;
    if amount > 0 {
        counts.insert(item.to_string(), total);
    }
    Ok(())
}

/// Remove up to `amount` of `item`, dropping the key at zero. Returns how
/// many were actually removed.
pub fn sub_count(counts: &mut ItemCounts, item: &str, amount: u32) -> u32 {
    let Some(held) = counts.get_mut(item) else {
        return 0;
    };
    let removed = amount.min(*held);
    *held -= removed;
    if *held == 0 {
        counts.remove(item);
    }
    removed
}

// ---------------------------------------------------------------------------
// Inventory
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    max_slots: usize,
    /// Empty means any item is allowed.
    whitelist: Vec<String>,
    contents: ItemCounts,
}

impl Inventory {
    pub fn new(max_slots: usize) -> Self {
        Self {
            max_slots,
            whitelist: Vec::new(),
            contents: ItemCounts::new(),
        }
    }

    pub fn with_whitelist(max_slots: usize, whitelist: Vec<String>) -> Self {
        Self {
            max_slots,
            whitelist,
            contents: ItemCounts::new(),
        }
    }

    pub fn max_slots(&self) -> usize {
        self.max_slots
    }

    pub fn allows(&self, item: &str) -> bool {
        self.whitelist.is_empty() || self.whitelist.iter().any(|w| w == item)
    }

    /// Replace the limits. Callers empty the inventory first.
    pub(crate) fn reconfigure(&mut self, max_slots: usize, whitelist: Vec<String>) {
        self.max_slots = max_slots;
        self.whitelist = whitelist;
    }

    pub fn count(&self, item: &str) -> u32 {
        self.contents.get(item).copied().unwrap_or(0)
    }

    pub fn contents(&self) -> &ItemCounts {
        &self.contents
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    /// Remove and return everything held.
    pub fn drain(&mut self) -> ItemCounts {
        std::mem::take(&mut self.contents)
    }

    /// Add items. Fails without side effects.
    pub fn put(&mut self, data: &GameData, item: &str, amount: u32) -> Result<(), InventoryError> {
        self.check_put(data, item, amount, self.contents.len())?;
        add_count(&mut self.contents, item, amount);
        Ok(())
    }

    /// Remove items. Fails without side effects. An item this inventory
    /// never accepts is simply not held.
    pub fn take(&mut self, item: &str, amount: u32) -> Result<(), InventoryError> {
        let available = self.count(item);
        if available < amount {
            return Err(InventoryError::InsufficientQuantity {
                item: item.to_string(),
                wanted: amount,
                available,
            });
        }
        sub_count(&mut self.contents, item, amount);
        Ok(())
    }

    /// Whether every `(item, amount)` pair could be put at once.
    pub fn can_accept(&self, data: &GameData, items: &[(&str, u32)]) -> bool {
        let mut used = self.contents.len();
        for &(item, amount) in items {
            if self.check_put(data, item, amount, used).is_err() {
                return false;
            }
            if amount > 0 && !self.contents.contains_key(item) {
                used += 1;
            }
        }
        true
    }

    fn check_put(
        &self,
        data: &GameData,
        item: &str,
        amount: u32,
        used_slots: usize,
    ) -> Result<(), InventoryError> {
        if !self.allows(item) {
            return Err(InventoryError::ItemNotAllowed {
                item: item.to_string(),
            });
        }
        let stack_size = data
            .stack_size(item)
            .ok_or_else(|| InventoryError::UnknownItem {
                item: item.to_string(),
            })?;
        if amount == 0 {
            return Ok(());
        }
        let held = self.count(item);
        let wanted = held.saturating_add(amount);
        if wanted > stack_size {
            return Err(InventoryError::StackOverflow {
                item: item.to_string(),
                wanted,
                stack_size,
            });
        }
        if held == 0 && used_slots >= self.max_slots {
            return Err(InventoryError::NoFreeSlot {
                item: item.to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InventoryError {
    #[error("item '{item}' is not allowed in this inventory")]
    ItemNotAllowed { item: String },
    #[error("item '{item}' has no known stack size")]
    UnknownItem { item: String },
    #[error("{wanted} '{item}' exceeds the stack size of {stack_size}")]
    StackOverflow {
        item: String,
        wanted: u32,
        stack_size: u32,
    },
    #[error("no free slot for '{item}'")]
    NoFreeSlot { item: String },
    #[error("wanted {wanted} '{item}' but only {available} held")]
    InsufficientQuantity {
        item: String,
        wanted: u32,
        available: u32,
    },
    #[error("holding {held} '{item}', adding {amount} overflows the count")]
    CountOverflow { item: String, held: u32, amount: u32 },
}
