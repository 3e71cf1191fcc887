//! Randomized request streams for the supplier and customer queues.

use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::task_queue::TaskQueue;
use crate::types::{ItemId, Role, Task};

// Per-customer order size for multi-item purchases.
const MAX_ORDER_ITEMS: usize = 5;
// Share of single-item purchases when the store supports multi-item orders.
const SINGLE_BUY_RATIO: f64 = 0.4;

/// Produces a bounded stream of random tasks for one role.
pub struct RequestGenerator {
    role: Role,
    capacity: usize,
    multi_item: bool,
    rng: StdRng,
}

fn seeded(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Round to whole cents so logs and summaries read like prices.
fn cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl RequestGenerator {
    /// Generator of store management requests.
    pub fn supplier(capacity: usize, seed: Option<u64>) -> Self {
        debug_assert!(capacity > 0, "capacity must be > 0");
        Self {
            role: Role::Supplier,
            capacity,
            multi_item: false,
            rng: seeded(seed),
        }
    }

    /// Generator of purchase requests; `multi_item` enables all-or-nothing orders.
    pub fn customer(capacity: usize, multi_item: bool, seed: Option<u64>) -> Self {
        debug_assert!(capacity > 0, "capacity must be > 0");
        Self {
            role: Role::Customer,
            capacity,
            multi_item,
            rng: seeded(seed),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    fn item_id(&mut self) -> ItemId {
        self.rng.gen_range(0..self.capacity)
    }

    fn supplier_task(&mut self) -> Task {
        match self.rng.gen_range(0..100u32) {
            0..=29 => Task::AddItem {
                id: self.item_id(),
                quantity: self.rng.gen_range(0..=10),
                price: cents(self.rng.gen_range(1.0..100.0)),
                discount: cents(self.rng.gen_range(0.0..0.5)),
            },
            30..=54 => Task::AddStock {
                id: self.item_id(),
                count: self.rng.gen_range(1..=10),
            },
            55..=69 => Task::PriceItem {
                id: self.item_id(),
                price: cents(self.rng.gen_range(1.0..100.0)),
            },
            70..=79 => Task::DiscountItem {
                id: self.item_id(),
                discount: cents(self.rng.gen_range(0.0..0.5)),
            },
            80..=84 => Task::RemoveItem { id: self.item_id() },
            85..=92 => Task::SetShippingCost {
                cost: cents(self.rng.gen_range(0.0..10.0)),
            },
            _ => Task::SetStoreDiscount {
                discount: cents(self.rng.gen_range(0.0..0.3)),
            },
        }
    }

    fn customer_task(&mut self) -> Task {
        if !self.multi_item || self.rng.gen_bool(SINGLE_BUY_RATIO) {
            return Task::BuyItem {
                id: self.item_id(),
                budget: cents(self.rng.gen_range(1.0..200.0)),
            };
        }
        let count = self.rng.gen_range(1..=MAX_ORDER_ITEMS);
        let ids = (0..count).map(|_| self.item_id()).collect();
        Task::BuyManyItems {
            ids,
            budget: cents(self.rng.gen_range(1.0..200.0) * count as f64),
        }
    }

    /// Draw the next business task for this generator's role.
    pub fn next_task(&mut self) -> Task {
        match self.role {
            Role::Supplier => self.supplier_task(),
            Role::Customer => self.customer_task(),
        }
    }

    /// Enqueue `count` random tasks.
    pub fn enqueue_tasks(&mut self, queue: &TaskQueue, count: usize) {
        for _ in 0..count {
            let task = self.next_task();
            debug!("[GEN] {} enqueue {task:?}", self.role);
            queue.enqueue(task);
        }
        info!("[GEN] {} enqueued {count} task(s)", self.role);
    }

    /// Enqueue one shutdown sentinel per worker consuming this queue.
    pub fn enqueue_stops(&self, queue: &TaskQueue, workers: usize) {
        for _ in 0..workers {
            queue.enqueue(Task::Shutdown);
        }
        info!("[GEN] {} enqueued {workers} shutdown(s)", self.role);
    }
}
