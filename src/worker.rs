//! Supplier and customer workers: drain a queue and apply each task to the store.

use log::{debug, info, warn};

use crate::store::InventoryStore;
use crate::task_queue::TaskQueue;
use crate::types::{BuyOutcome, OrderOutcome, Role, Task};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerState {
    Running,
    Terminated,
}

/// Counters collected by one worker over its lifetime.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WorkerReport {
    pub executed: usize,
    pub purchases: usize,
    pub withdrawn: usize,
    pub not_carried: usize,
    /// Buyers turned away because the store was closing.
    pub closed_out: usize,
    pub orders_committed: usize,
    pub orders_rejected: usize,
    pub shutdowns: usize,
}

impl WorkerReport {
    /// Fold another worker's counters into this one.
    pub fn merge(&mut self, other: &WorkerReport) {
        self.executed += other.executed;
        self.purchases += other.purchases;
        self.withdrawn += other.withdrawn;
        self.not_carried += other.not_carried;
        self.closed_out += other.closed_out;
        self.orders_committed += other.orders_committed;
        self.orders_rejected += other.orders_rejected;
        self.shutdowns += other.shutdowns;
    }
}

pub struct Worker {
    role: Role,
    index: usize,
    state: WorkerState,
    report: WorkerReport,
}

impl Worker {
    pub fn new(role: Role, index: usize) -> Self {
        Self {
            role,
            index,
            state: WorkerState::Running,
            report: WorkerReport::default(),
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> WorkerState {
        self.state
    }

    pub fn name(&self) -> String {
        format!("{}-{}", self.role, self.index)
    }

    /// Apply one task. `Shutdown` moves the worker to `Terminated`; a worker
    /// that has already terminated ignores everything it is handed.
    pub fn handle(&mut self, task: Task, store: &InventoryStore) -> WorkerState {
        if self.state == WorkerState::Terminated {
            warn!("[WORKER] {} ignoring task after shutdown: {task:?}", self.name());
            return self.state;
        }
        match task {
            Task::Shutdown => {
                debug!("Handling Shutdown: quitting");
                self.report.shutdowns += 1;
                self.state = WorkerState::Terminated;
                return self.state;
            }
            Task::AddItem {
                id,
                quantity,
                price,
                discount,
            } => {
                debug!(
                    "Handling AddItem: item_id={id} quantity={quantity} price=${price:.2} discount={discount:.2}"
                );
                store.add_item(id, quantity, price, discount);
            }
            Task::RemoveItem { id } => {
                debug!("Handling RemoveItem: item_id={id}");
                store.remove_item(id);
            }
            Task::AddStock { id, count } => {
                debug!("Handling AddStock: item_id={id} additional_stock={count}");
                store.add_stock(id, count);
            }
            Task::PriceItem { id, price } => {
                debug!("Handling PriceItem: item_id={id} new_price=${price:.2}");
                store.price_item(id, price);
            }
            Task::DiscountItem { id, discount } => {
                debug!("Handling DiscountItem: item_id={id} new_discount={discount:.2}");
                store.discount_item(id, discount);
            }
            Task::SetShippingCost { cost } => {
                debug!("Handling SetShippingCost: new_cost=${cost:.2}");
                store.set_shipping_cost(cost);
            }
            Task::SetStoreDiscount { discount } => {
                debug!("Handling SetStoreDiscount: new_discount={discount:.2}");
                store.set_store_discount(discount);
            }
            Task::BuyItem { id, budget } => {
                debug!("Handling BuyItem: item_id={id} budget=${budget:.2}");
                match store.buy_item(id, budget) {
                    BuyOutcome::Purchased => self.report.purchases += 1,
                    BuyOutcome::Withdrawn => self.report.withdrawn += 1,
                    BuyOutcome::NotCarried => self.report.not_carried += 1,
                    BuyOutcome::StoreClosed => self.report.closed_out += 1,
                }
            }
            Task::BuyManyItems { ids, budget } => {
                debug!("Handling BuyManyItems: items={} budget=${budget:.2}", ids.len());
                match store.buy_many_items(&ids, budget) {
                    OrderOutcome::Committed { .. } => self.report.orders_committed += 1,
                    OrderOutcome::Unavailable | OrderOutcome::OverBudget | OrderOutcome::Empty => {
                        self.report.orders_rejected += 1
                    }
                }
            }
        }
        self.report.executed += 1;
        self.state
    }

    /// Dequeue and apply tasks until this worker's sentinel arrives.
    pub fn run(mut self, queue: &TaskQueue, store: &InventoryStore) -> WorkerReport {
        info!("[WORKER] {} started", self.name());
        while self.state == WorkerState::Running {
            let task = queue.dequeue();
            self.handle(task, store);
        }
        info!(
            "[WORKER] {} terminated after {} task(s)",
            self.name(),
            self.report.executed
        );
        self.report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Discipline;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn shutdown_terminates_and_later_tasks_are_ignored() {
        let store = InventoryStore::new(Discipline::Coarse, 4);
        let mut worker = Worker::new(Role::Supplier, 0);
        assert_eq!(worker.state(), WorkerState::Running);

        let state = worker.handle(
            Task::AddItem {
                id: 1,
                quantity: 2,
                price: 3.0,
                discount: 0.0,
            },
            &store,
        );
        assert_eq!(state, WorkerState::Running);
        assert_eq!(worker.handle(Task::Shutdown, &store), WorkerState::Terminated);

        assert_eq!(
            worker.handle(Task::AddStock { id: 1, count: 5 }, &store),
            WorkerState::Terminated
        );
        assert_eq!(store.get_item_quantity(1), 2);
        assert_eq!(worker.report.executed, 1);
        assert_eq!(worker.report.shutdowns, 1);
    }

    #[test]
    fn run_stops_at_first_sentinel() {
        let store = InventoryStore::new(Discipline::Fine, 4);
        let queue = TaskQueue::new();
        queue.enqueue(Task::AddItem {
            id: 0,
            quantity: 1,
            price: 1.0,
            discount: 0.0,
        });
        queue.enqueue(Task::BuyManyItems {
            ids: vec![0],
            budget: 5.0,
        });
        queue.enqueue(Task::BuyItem { id: 2, budget: 5.0 });
        queue.enqueue(Task::Shutdown);
        queue.enqueue(Task::Shutdown);

        let report = Worker::new(Role::Customer, 3).run(&queue, &store);
        assert_eq!(report.executed, 3);
        assert_eq!(report.orders_committed, 1);
        assert_eq!(report.not_carried, 1);
        assert_eq!(report.shutdowns, 1);
        // The second sentinel belongs to another worker.
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn every_worker_consumes_exactly_one_sentinel() {
        let store = Arc::new(InventoryStore::new(Discipline::Coarse, 4));
        let queue = Arc::new(TaskQueue::new());
        let workers = 5;

        let handles: Vec<_> = (0..workers)
            .map(|index| {
                let store = Arc::clone(&store);
                let queue = Arc::clone(&queue);
                thread::spawn(move || Worker::new(Role::Supplier, index).run(&queue, &store))
            })
            .collect();

        for id in 0..20 {
            queue.enqueue(Task::RemoveItem { id: id % 4 });
        }
        for _ in 0..workers {
            queue.enqueue(Task::Shutdown);
        }

        let mut total = WorkerReport::default();
        for handle in handles {
            let report = handle.join().expect("worker panicked");
            assert_eq!(report.shutdowns, 1);
            total.merge(&report);
        }
        assert_eq!(total.executed, 20);
        assert_eq!(total.shutdowns, workers);
        assert!(queue.is_empty());
    }

    #[test]
    fn closed_store_turns_away_waiting_buyers() {
        let store = InventoryStore::new(Discipline::Coarse, 4);
        store.add_item(0, 0, 1.0, 0.0);
        store.add_item(1, 1, 1.0, 0.0);
        store.close();

        let mut worker = Worker::new(Role::Customer, 0);
        worker.handle(Task::BuyItem { id: 0, budget: 5.0 }, &store);
        worker.handle(Task::BuyItem { id: 1, budget: 5.0 }, &store);
        assert_eq!(worker.report.closed_out, 1);
        assert_eq!(worker.report.purchases, 1);
        assert_eq!(store.get_item_quantity(1), 0);
    }

    #[test]
    fn worker_names_follow_role() {
        assert_eq!(Worker::new(Role::Customer, 7).name(), "customer-7");
    }
}
