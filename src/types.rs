//! Shared identifiers, item records, and the task model used across the simulator.

use std::fmt;

/// Index of an item slot in the store, valid in `[0, capacity)`.
pub type ItemId = usize;

/// Default number of item slots, matching the classic store layout.
pub const DEFAULT_CAPACITY: usize = 100;

/// One product slot. `valid == false` means the store does not carry it.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Item {
    pub valid: bool,
    pub quantity: u32,
    pub price: f64,
    pub discount: f64,
}

/// Store-wide pricing applied to every item's purchase cost.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Pricing {
    pub shipping_cost: f64,
    pub store_discount: f64,
}

impl Pricing {
    /// Cost of buying one unit of `item` under this pricing.
    pub fn unit_cost(&self, item: &Item) -> f64 {
        item.price * (1.0 - item.discount) * (1.0 - self.store_discount) + self.shipping_cost
    }
}

/// Locking discipline selected when the store is built.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Discipline {
    /// One lock guards every item and the pricing fields.
    Coarse,
    /// One lock per item plus a separate pricing lock.
    Fine,
}

impl fmt::Display for Discipline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Discipline::Coarse => f.write_str("coarse"),
            Discipline::Fine => f.write_str("fine"),
        }
    }
}

/// Which side of the marketplace a generator or worker serves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    Supplier,
    Customer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Supplier => f.write_str("supplier"),
            Role::Customer => f.write_str("customer"),
        }
    }
}

/// Unit of deferred work handed from a generator to a worker.
#[derive(Clone, Debug, PartialEq)]
pub enum Task {
    AddItem {
        id: ItemId,
        quantity: u32,
        price: f64,
        discount: f64,
    },
    RemoveItem {
        id: ItemId,
    },
    AddStock {
        id: ItemId,
        count: u32,
    },
    PriceItem {
        id: ItemId,
        price: f64,
    },
    DiscountItem {
        id: ItemId,
        discount: f64,
    },
    SetShippingCost {
        cost: f64,
    },
    SetStoreDiscount {
        discount: f64,
    },
    BuyItem {
        id: ItemId,
        budget: f64,
    },
    BuyManyItems {
        ids: Vec<ItemId>,
        budget: f64,
    },
    /// Tells the receiving worker to stop.
    Shutdown,
}

impl Task {
    pub fn is_shutdown(&self) -> bool {
        matches!(self, Task::Shutdown)
    }
}

/// Result of a single-item purchase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuyOutcome {
    Purchased,
    /// Id out of range or not carried when the call began.
    NotCarried,
    /// The item was removed while the buyer waited.
    Withdrawn,
    /// The store is closing and the purchase could not happen without waiting.
    StoreClosed,
}

/// Result of an all-or-nothing multi-item order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum OrderOutcome {
    Committed { cost: f64 },
    /// Some requested item is not carried or out of stock.
    Unavailable,
    OverBudget,
    /// No in-range ids were requested.
    Empty,
}

impl OrderOutcome {
    #[cfg(test)]
    pub fn is_committed(&self) -> bool {
        matches!(self, OrderOutcome::Committed { .. })
    }
}
