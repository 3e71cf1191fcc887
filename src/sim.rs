//! Simulation orchestrator, demo summary, and discipline benchmark.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::{info, warn};

use crate::config::{BenchConfig, SimConfig};
use crate::generator::RequestGenerator;
use crate::store::InventoryStore;
use crate::task_queue::TaskQueue;
use crate::types::{Discipline, Role};
use crate::worker::{Worker, WorkerReport};

/// Best-effort CPU user/system time snapshot (seconds) on Unix platforms.
#[cfg(unix)]
fn cpu_times_seconds() -> Option<(f64, f64)> {
    use libc::{RUSAGE_SELF, getrusage, rusage};
    let mut usage: rusage = unsafe { std::mem::zeroed() };
    let rc = unsafe { getrusage(RUSAGE_SELF, &mut usage) };
    if rc != 0 {
        return None;
    }
    let user = usage.ru_utime.tv_sec as f64 + (usage.ru_utime.tv_usec as f64 / 1_000_000.0);
    let sys = usage.ru_stime.tv_sec as f64 + (usage.ru_stime.tv_usec as f64 / 1_000_000.0);
    Some((user, sys))
}

/// Stub on non-Unix platforms.
#[cfg(not(unix))]
fn cpu_times_seconds() -> Option<(f64, f64)> {
    None
}

/// Aggregated outcome of one simulation run.
#[derive(Clone, Debug)]
pub struct SimReport {
    pub discipline: Discipline,
    pub suppliers: usize,
    pub customers: usize,
    pub requests_per_role: usize,
    pub supplier_totals: WorkerReport,
    pub customer_totals: WorkerReport,
    /// Units in stock when the last supplier stopped.
    pub stock_at_close: u64,
    /// Units still in stock after every customer stopped.
    pub stock_at_end: u64,
    pub leftover: usize,
    pub elapsed: Duration,
}

impl SimReport {
    pub fn tasks_executed(&self) -> usize {
        self.supplier_totals.executed + self.customer_totals.executed
    }

    pub fn shutdowns_observed(&self) -> usize {
        self.supplier_totals.shutdowns + self.customer_totals.shutdowns
    }

    fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }
}

fn spawn_workers(
    role: Role,
    count: usize,
    queue: &Arc<TaskQueue>,
    store: &Arc<InventoryStore>,
) -> Vec<thread::JoinHandle<WorkerReport>> {
    (0..count)
        .map(|index| {
            let queue = Arc::clone(queue);
            let store = Arc::clone(store);
            thread::Builder::new()
                .name(format!("{role}-{index}"))
                .spawn(move || Worker::new(role, index).run(&queue, &store))
                .expect("failed to spawn worker thread")
        })
        .collect()
}

fn spawn_generator(
    mut generator: RequestGenerator,
    queue: &Arc<TaskQueue>,
    requests: usize,
    workers: usize,
) -> thread::JoinHandle<()> {
    let queue = Arc::clone(queue);
    thread::Builder::new()
        .name(format!("{}-gen", generator.role()))
        .spawn(move || {
            generator.enqueue_tasks(&queue, requests);
            generator.enqueue_stops(&queue, workers);
        })
        .expect("failed to spawn generator thread")
}

fn join_workers(role: Role, handles: Vec<thread::JoinHandle<WorkerReport>>) -> WorkerReport {
    let mut totals = WorkerReport::default();
    for handle in handles {
        let report = handle.join().expect("worker thread panicked");
        totals.merge(&report);
    }
    info!("[SIM] all {role} workers joined");
    totals
}

/// Run one full marketplace simulation and collect its counters.
///
/// Workers start first and block on their empty queues; the generators follow.
/// Once every supplier has stopped nothing can restock or reprice an item, so
/// the store is closed: customers keep buying whatever is available but stop
/// waiting for changes that will never come. Customers are joined last.
pub fn run_simulation(config: &SimConfig) -> SimReport {
    let store = Arc::new(InventoryStore::new(config.discipline, config.capacity));
    let supplier_queue = Arc::new(TaskQueue::new());
    let customer_queue = Arc::new(TaskQueue::new());
    info!(
        "[SIM] start discipline={} capacity={} suppliers={} customers={} requests_per_role={}",
        config.discipline,
        store.capacity(),
        config.suppliers,
        config.customers,
        config.requests_per_role
    );

    let start = Instant::now();
    let suppliers = spawn_workers(Role::Supplier, config.suppliers, &supplier_queue, &store);
    let customers = spawn_workers(Role::Customer, config.customers, &customer_queue, &store);

    let supplier_gen = spawn_generator(
        RequestGenerator::supplier(config.capacity, config.seed),
        &supplier_queue,
        config.requests_per_role,
        config.suppliers,
    );
    let customer_gen = spawn_generator(
        RequestGenerator::customer(
            config.capacity,
            store.is_fine(),
            config.seed.map(|seed| seed.wrapping_add(1)),
        ),
        &customer_queue,
        config.requests_per_role,
        config.customers,
    );

    supplier_gen.join().expect("supplier generator panicked");
    customer_gen.join().expect("customer generator panicked");

    let supplier_totals = join_workers(Role::Supplier, suppliers);
    let stock_at_close = store.snapshot().total_quantity();
    store.close();
    info!("[SIM] store closing with {stock_at_close} unit(s) in stock");
    let customer_totals = join_workers(Role::Customer, customers);
    let elapsed = start.elapsed();
    let stock_at_end = store.snapshot().total_quantity();

    // Every sentinel has been consumed, so anything left was never handled.
    let leftover = supplier_queue.len() + customer_queue.len();
    if !supplier_queue.is_empty() || !customer_queue.is_empty() {
        warn!("[SIM] {leftover} task(s) left unhandled");
    }

    SimReport {
        discipline: config.discipline,
        suppliers: config.suppliers,
        customers: config.customers,
        requests_per_role: config.requests_per_role,
        supplier_totals,
        customer_totals,
        stock_at_close,
        stock_at_end,
        leftover,
        elapsed,
    }
}

/// Run one simulation and print a human-readable summary.
pub fn run_demo(config: &SimConfig) {
    let report = run_simulation(config);
    let customers = &report.customer_totals;

    println!("SIMULATION SUMMARY");
    println!("discipline={}", report.discipline);
    println!(
        "suppliers={} customers={} requests_per_role={}",
        report.suppliers, report.customers, report.requests_per_role
    );
    println!("tasks_executed={}", report.tasks_executed());
    println!("shutdowns_observed={}", report.shutdowns_observed());
    println!("purchases={}", customers.purchases);
    println!("buyers_withdrawn={}", customers.withdrawn);
    println!("buyers_not_carried={}", customers.not_carried);
    println!("buyers_closed_out={}", customers.closed_out);
    println!("orders_committed={}", customers.orders_committed);
    println!("orders_rejected={}", customers.orders_rejected);
    println!("stock_at_close={}", report.stock_at_close);
    println!("stock_at_end={}", report.stock_at_end);
    println!("leftover_tasks={}", report.leftover);
    println!("elapsed_ms={:.2}", report.elapsed_ms());
}

const BENCH_HEADER: &str = "discipline,suppliers,customers,requests_per_role,total_tasks,elapsed_ms,throughput_tasks_per_s,cpu_user_s,cpu_sys_s,purchases,orders_committed,orders_rejected,leftover";

fn format_cpu(value: Option<f64>) -> String {
    value
        .map(|v| format!("{v:.4}"))
        .unwrap_or_else(|| "NA".to_string())
}

/// Run both disciplines with the same settings and print one CSV row per run.
pub fn run_benchmark(bench: &BenchConfig) {
    println!("{BENCH_HEADER}");
    for _ in 0..bench.repeat {
        for discipline in [Discipline::Coarse, Discipline::Fine] {
            let config = SimConfig {
                discipline,
                ..bench.sim.clone()
            };
            let cpu_start = cpu_times_seconds();
            let report = run_simulation(&config);
            let (cpu_user_s, cpu_sys_s) = match (cpu_start, cpu_times_seconds()) {
                (Some((user_start, sys_start)), Some((user_end, sys_end))) => {
                    (Some(user_end - user_start), Some(sys_end - sys_start))
                }
                _ => (None, None),
            };

            let total_tasks = report.tasks_executed();
            let elapsed_ms = report.elapsed_ms();
            let throughput = if elapsed_ms > 0.0 {
                (total_tasks as f64) / (elapsed_ms / 1000.0)
            } else {
                0.0
            };
            println!(
                "{},{},{},{},{},{:.2},{:.2},{},{},{},{},{},{}",
                report.discipline,
                report.suppliers,
                report.customers,
                report.requests_per_role,
                total_tasks,
                elapsed_ms,
                throughput,
                format_cpu(cpu_user_s),
                format_cpu(cpu_sys_s),
                report.customer_totals.purchases,
                report.customer_totals.orders_committed,
                report.customer_totals.orders_rejected,
                report.leftover
            );
            if report.leftover > 0 {
                eprintln!("# warning,leftover_tasks,{}", report.leftover);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    fn small(discipline: Discipline) -> SimConfig {
        SimConfig {
            suppliers: 3,
            customers: 4,
            requests_per_role: 60,
            discipline,
            capacity: 8,
            seed: Some(17),
        }
    }

    /// Run in a helper thread so a liveness bug fails the test instead of hanging it.
    fn run_with_timeout(config: SimConfig) -> SimReport {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            tx.send(run_simulation(&config)).expect("send report");
        });
        rx.recv_timeout(Duration::from_secs(20))
            .expect("simulation finished")
    }

    #[test]
    fn coarse_run_drains_every_task() {
        let report = run_with_timeout(small(Discipline::Coarse));
        assert_eq!(report.tasks_executed(), 120);
        assert_eq!(report.supplier_totals.shutdowns, 3);
        assert_eq!(report.customer_totals.shutdowns, 4);
        assert_eq!(report.leftover, 0);
        // Coarse customers never place multi-item orders.
        assert_eq!(report.customer_totals.orders_committed, 0);
        assert_eq!(report.customer_totals.orders_rejected, 0);
    }

    #[test]
    fn fine_run_drains_every_task() {
        let report = run_with_timeout(small(Discipline::Fine));
        assert_eq!(report.tasks_executed(), 120);
        assert_eq!(report.shutdowns_observed(), 7);
        assert_eq!(report.leftover, 0);
        let customers = &report.customer_totals;
        assert_eq!(
            customers.purchases
                + customers.withdrawn
                + customers.not_carried
                + customers.closed_out
                + customers.orders_committed
                + customers.orders_rejected,
            60
        );
    }

    #[test]
    fn run_without_requests_still_stops_every_worker() {
        let config = SimConfig {
            requests_per_role: 0,
            ..small(Discipline::Fine)
        };
        let report = run_with_timeout(config);
        assert_eq!(report.tasks_executed(), 0);
        assert_eq!(report.shutdowns_observed(), 7);
        assert_eq!(report.stock_at_close, 0);
        assert_eq!(report.stock_at_end, 0);
    }

    #[test]
    fn closing_leaves_stock_for_late_customers() {
        let config = SimConfig {
            suppliers: 8,
            customers: 1,
            requests_per_role: 600,
            discipline: Discipline::Fine,
            capacity: 4,
            seed: Some(1),
        };
        let report = run_with_timeout(config);
        assert_eq!(report.leftover, 0);
        // Only customers touch the store after closing, and they only take stock away.
        assert!(report.stock_at_end <= report.stock_at_close);
        let customers = &report.customer_totals;
        assert_eq!(
            customers.purchases
                + customers.withdrawn
                + customers.not_carried
                + customers.closed_out
                + customers.orders_committed
                + customers.orders_rejected,
            600
        );
    }

    #[test]
    fn cpu_format_falls_back_to_na() {
        assert_eq!(format_cpu(None), "NA");
        assert_eq!(format_cpu(Some(1.5)), "1.5000");
    }
}
