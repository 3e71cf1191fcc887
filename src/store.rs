//! Shared inventory with two interchangeable locking disciplines.
//!
//! The coarse table keeps every item and the pricing pair behind one mutex and
//! gives each item its own condition variable. The fine table gives each item a
//! mutex/condvar pair and keeps pricing behind a separate mutex. Buyers waiting
//! on an item are always woken with `notify_all` and re-check under the lock.
//!
//! Lock order under the fine discipline: item locks in ascending id order, and
//! the pricing lock may only be taken while holding at most one item lock
//! (`buy_item`) or none at all.
//!
//! Closing the store keeps every item on sale but stops new waits: a buyer
//! that cannot purchase right away returns `StoreClosed` instead of blocking.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard};

use log::{debug, trace};

use crate::types::{BuyOutcome, Discipline, Item, ItemId, OrderOutcome, Pricing};

/// Thread-safe store of item slots and store-wide pricing.
pub struct InventoryStore {
    capacity: usize,
    table: Table,
    closing: AtomicBool,
}

enum Table {
    Coarse(CoarseTable),
    Fine(FineTable),
}

struct CoarseTable {
    state: Mutex<CoarseState>,
    changed: Vec<Condvar>,
}

struct CoarseState {
    items: Vec<Item>,
    pricing: Pricing,
}

struct FineTable {
    slots: Vec<Slot>,
    pricing: Mutex<Pricing>,
}

struct Slot {
    item: Mutex<Item>,
    changed: Condvar,
}

/// Point-in-time view of the carried items and pricing.
#[derive(Clone, Debug, PartialEq)]
pub struct StoreSnapshot {
    pub items: Vec<(ItemId, Item)>,
    pub pricing: Pricing,
}

impl StoreSnapshot {
    pub fn total_quantity(&self) -> u64 {
        self.items.iter().map(|(_, item)| u64::from(item.quantity)).sum()
    }
}

/// Sum the unit cost of every item, stopping at the first one that cannot be bought.
fn price_order<'a>(
    items: impl Iterator<Item = &'a Item>,
    pricing: &Pricing,
    budget: f64,
) -> Result<f64, OrderOutcome> {
    let mut total = 0.0;
    for item in items {
        if !item.valid || item.quantity == 0 {
            return Err(OrderOutcome::Unavailable);
        }
        let cost = pricing.unit_cost(item);
        // Discounts above 1 price an item below zero; such an item is not for sale.
        if cost < 0.0 {
            return Err(OrderOutcome::Unavailable);
        }
        total += cost;
        if total > budget {
            return Err(OrderOutcome::OverBudget);
        }
    }
    Ok(total)
}

impl InventoryStore {
    /// Create an empty store with `capacity` slots and zero pricing.
    pub fn new(discipline: Discipline, capacity: usize) -> Self {
        let table = match discipline {
            Discipline::Coarse => Table::Coarse(CoarseTable {
                state: Mutex::new(CoarseState {
                    items: vec![Item::default(); capacity],
                    pricing: Pricing::default(),
                }),
                changed: (0..capacity).map(|_| Condvar::new()).collect(),
            }),
            Discipline::Fine => Table::Fine(FineTable {
                slots: (0..capacity)
                    .map(|_| Slot {
                        item: Mutex::new(Item::default()),
                        changed: Condvar::new(),
                    })
                    .collect(),
                pricing: Mutex::new(Pricing::default()),
            }),
        };
        Self {
            capacity,
            table,
            closing: AtomicBool::new(false),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn discipline(&self) -> Discipline {
        match self.table {
            Table::Coarse(_) => Discipline::Coarse,
            Table::Fine(_) => Discipline::Fine,
        }
    }

    /// Whether the store uses per-item locks.
    pub fn is_fine(&self) -> bool {
        self.discipline() == Discipline::Fine
    }

    /// Apply `update` to one item under its guarding lock and wake that item's
    /// waiters if it returns true. Out-of-range ids are ignored.
    fn update_item<F>(&self, id: ItemId, update: F) -> bool
    where
        F: FnOnce(&mut Item) -> bool,
    {
        if id >= self.capacity {
            return false;
        }
        match &self.table {
            Table::Coarse(table) => {
                let mut state = table.state.lock().expect("store mutex poisoned");
                let wake = update(&mut state.items[id]);
                if wake {
                    table.changed[id].notify_all();
                }
                wake
            }
            Table::Fine(table) => {
                let slot = &table.slots[id];
                let mut item = slot.item.lock().expect("item mutex poisoned");
                let wake = update(&mut *item);
                if wake {
                    slot.changed.notify_all();
                }
                wake
            }
        }
    }

    /// Apply `update` to the pricing pair and wake every item's waiters if it
    /// returns true.
    fn update_pricing<F>(&self, update: F)
    where
        F: FnOnce(&mut Pricing) -> bool,
    {
        match &self.table {
            Table::Coarse(table) => {
                let mut state = table.state.lock().expect("store mutex poisoned");
                if update(&mut state.pricing) {
                    for changed in &table.changed {
                        changed.notify_all();
                    }
                }
            }
            Table::Fine(table) => {
                let wake = {
                    let mut pricing = table.pricing.lock().expect("pricing mutex poisoned");
                    update(&mut *pricing)
                };
                if wake {
                    // Taking each item lock orders the broadcast after any buyer
                    // that read the old pricing and has not started waiting yet.
                    for slot in &table.slots {
                        let _item = slot.item.lock().expect("item mutex poisoned");
                        slot.changed.notify_all();
                    }
                }
            }
        }
    }

    /// Start carrying `id`. Does nothing if it is already carried.
    pub fn add_item(&self, id: ItemId, quantity: u32, price: f64, discount: f64) {
        self.update_item(id, |item| {
            if item.valid {
                return false;
            }
            *item = Item {
                valid: true,
                quantity,
                price,
                discount,
            };
            true
        });
    }

    /// Stop carrying `id`, releasing any buyers waiting on it.
    pub fn remove_item(&self, id: ItemId) {
        self.update_item(id, |item| {
            if !item.valid {
                return false;
            }
            item.valid = false;
            true
        });
    }

    pub fn add_stock(&self, id: ItemId, count: u32) {
        self.update_item(id, |item| {
            if !item.valid || count == 0 {
                return false;
            }
            item.quantity = item.quantity.saturating_add(count);
            true
        });
    }

    pub fn price_item(&self, id: ItemId, price: f64) {
        self.update_item(id, |item| {
            if !item.valid {
                return false;
            }
            let decreased = price < item.price;
            item.price = price;
            decreased
        });
    }

    pub fn discount_item(&self, id: ItemId, discount: f64) {
        self.update_item(id, |item| {
            if !item.valid {
                return false;
            }
            let increased = discount > item.discount;
            item.discount = discount;
            increased
        });
    }

    pub fn set_shipping_cost(&self, cost: f64) {
        self.update_pricing(|pricing| {
            let decreased = cost < pricing.shipping_cost;
            pricing.shipping_cost = cost;
            decreased
        });
    }

    pub fn set_store_discount(&self, discount: f64) {
        self.update_pricing(|pricing| {
            let increased = discount > pricing.store_discount;
            pricing.store_discount = discount;
            increased
        });
    }

    /// Current stock of `id`, or 0 if it is out of range or not carried.
    pub fn get_item_quantity(&self, id: ItemId) -> u32 {
        if id >= self.capacity {
            return 0;
        }
        let item = match &self.table {
            Table::Coarse(table) => table.state.lock().expect("store mutex poisoned").items[id],
            Table::Fine(table) => *table.slots[id].item.lock().expect("item mutex poisoned"),
        };
        if item.valid { item.quantity } else { 0 }
    }

    /// Buy one unit of `id`, blocking until it is in stock and affordable.
    ///
    /// Returns immediately with `NotCarried` if the store does not carry the
    /// item, with `Withdrawn` if it is removed while the caller waits, and with
    /// `StoreClosed` if the store is closing and the purchase cannot happen now.
    pub fn buy_item(&self, id: ItemId, budget: f64) -> BuyOutcome {
        if id >= self.capacity {
            return BuyOutcome::NotCarried;
        }
        match &self.table {
            Table::Coarse(table) => {
                let mut state = table.state.lock().expect("store mutex poisoned");
                if !state.items[id].valid {
                    return BuyOutcome::NotCarried;
                }
                loop {
                    let pricing = state.pricing;
                    let item = &mut state.items[id];
                    if !item.valid {
                        return BuyOutcome::Withdrawn;
                    }
                    if item.quantity > 0 && pricing.unit_cost(item) <= budget {
                        item.quantity -= 1;
                        return BuyOutcome::Purchased;
                    }
                    if self.closing.load(Ordering::SeqCst) {
                        return BuyOutcome::StoreClosed;
                    }
                    trace!("buyer waiting on item {id} budget={budget:.2}");
                    state = table.changed[id].wait(state).expect("condvar wait failed");
                }
            }
            Table::Fine(table) => {
                let slot = &table.slots[id];
                let mut item = slot.item.lock().expect("item mutex poisoned");
                if !item.valid {
                    return BuyOutcome::NotCarried;
                }
                loop {
                    if !item.valid {
                        return BuyOutcome::Withdrawn;
                    }
                    let pricing = *table.pricing.lock().expect("pricing mutex poisoned");
                    if item.quantity > 0 && pricing.unit_cost(&item) <= budget {
                        item.quantity -= 1;
                        return BuyOutcome::Purchased;
                    }
                    if self.closing.load(Ordering::SeqCst) {
                        return BuyOutcome::StoreClosed;
                    }
                    trace!("buyer waiting on item {id} budget={budget:.2}");
                    item = slot.changed.wait(item).expect("condvar wait failed");
                }
            }
        }
    }

    /// Buy one unit of every listed item at once, or nothing at all.
    ///
    /// Never blocks on item state: an order that cannot be filled right now is
    /// rejected. Duplicate and out-of-range ids are dropped first.
    pub fn buy_many_items(&self, ids: &[ItemId], budget: f64) -> OrderOutcome {
        let mut ids: Vec<ItemId> = ids.iter().copied().filter(|&id| id < self.capacity).collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.is_empty() {
            return OrderOutcome::Empty;
        }

        let outcome = match &self.table {
            Table::Coarse(table) => {
                let mut state = table.state.lock().expect("store mutex poisoned");
                let pricing = state.pricing;
                let priced = price_order(ids.iter().map(|&id| &state.items[id]), &pricing, budget);
                match priced {
                    Ok(cost) => {
                        for &id in &ids {
                            state.items[id].quantity -= 1;
                        }
                        OrderOutcome::Committed { cost }
                    }
                    Err(rejected) => rejected,
                }
            }
            Table::Fine(table) => {
                let pricing = *table.pricing.lock().expect("pricing mutex poisoned");
                let mut guards: Vec<MutexGuard<'_, Item>> = ids
                    .iter()
                    .map(|&id| table.slots[id].item.lock().expect("item mutex poisoned"))
                    .collect();
                let priced = price_order(guards.iter().map(|guard| &**guard), &pricing, budget);
                let outcome = match priced {
                    Ok(cost) => {
                        for guard in guards.iter_mut() {
                            guard.quantity -= 1;
                        }
                        OrderOutcome::Committed { cost }
                    }
                    Err(rejected) => rejected,
                };
                while let Some(guard) = guards.pop() {
                    drop(guard);
                }
                outcome
            }
        };
        debug!("order of {} item(s) budget={budget:.2} -> {outcome:?}", ids.len());
        outcome
    }

    /// Stop buyers from waiting and wake every one already blocked.
    ///
    /// Items stay on sale; woken buyers re-check and either purchase or return
    /// `StoreClosed`. Each broadcast happens under the guarding lock so a buyer
    /// that checked the flag before it was set is already waiting.
    pub fn close(&self) {
        self.closing.store(true, Ordering::SeqCst);
        match &self.table {
            Table::Coarse(table) => {
                let _state = table.state.lock().expect("store mutex poisoned");
                for changed in &table.changed {
                    changed.notify_all();
                }
            }
            Table::Fine(table) => {
                for slot in &table.slots {
                    let _item = slot.item.lock().expect("item mutex poisoned");
                    slot.changed.notify_all();
                }
            }
        }
    }

    #[cfg(test)]
    pub fn is_closing(&self) -> bool {
        self.closing.load(Ordering::SeqCst)
    }

    /// Copy out the carried items and the pricing pair.
    ///
    /// Under the fine discipline each item is read under its own lock, so the
    /// result is not a single atomic cut while writers are active.
    pub fn snapshot(&self) -> StoreSnapshot {
        match &self.table {
            Table::Coarse(table) => {
                let state = table.state.lock().expect("store mutex poisoned");
                StoreSnapshot {
                    items: state
                        .items
                        .iter()
                        .enumerate()
                        .filter(|(_, item)| item.valid)
                        .map(|(id, item)| (id, *item))
                        .collect(),
                    pricing: state.pricing,
                }
            }
            Table::Fine(table) => {
                let pricing = *table.pricing.lock().expect("pricing mutex poisoned");
                let items = table
                    .slots
                    .iter()
                    .enumerate()
                    .filter_map(|(id, slot)| {
                        let item = *slot.item.lock().expect("item mutex poisoned");
                        item.valid.then_some((id, item))
                    })
                    .collect();
                StoreSnapshot { items, pricing }
            }
        }
    }
}
