mod config;
mod generator;
mod logging;
mod sim;
mod store;
mod task_queue;
mod types;
mod worker;

use config::{BenchConfig, SimConfig};

fn print_usage(program: &str) {
    println!("E-store marketplace simulator");
    println!("Usage:");
    println!("  {program} [--fine|--coarse] [options]   (run one simulation)");
    println!("  {program} bench [options] [--repeat N]  (compare both disciplines, CSV)");
    println!("  {program} --help");
    println!();
    println!("Options:");
    println!("  --suppliers N   supplier worker threads (default 10)");
    println!("  --customers N   customer worker threads (default 10)");
    println!("  --requests N    requests generated per role (default 100)");
    println!("  --capacity N    item slots in the store (default 100)");
    println!("  --seed N        seed the request generators");
    println!("Flags:");
    println!("  --fine    one lock per item, enables multi-item orders");
    println!("  --coarse  one lock for the whole store (default)");
    println!("Set RUST_LOG=debug to trace every handled request.");
}

fn exit_with_usage(program: &str, message: &str) -> ! {
    eprintln!("{message}");
    print_usage(program);
    std::process::exit(2);
}

fn main() {
    logging::init();
    let program = std::env::args()
        .next()
        .unwrap_or_else(|| "estoresim".to_string());
    let mut args = std::env::args().skip(1).peekable();
    let command = args.peek().cloned();
    match command.as_deref() {
        Some("bench") => {
            args.next();
            match BenchConfig::from_args(args) {
                Ok(bench) => sim::run_benchmark(&bench),
                Err(err) => exit_with_usage(&program, &format!("bench: {err}")),
            }
        }
        Some("--help") | Some("-h") | Some("help") => print_usage(&program),
        _ => match SimConfig::from_args(args) {
            Ok(config) => sim::run_demo(&config),
            Err(err) => exit_with_usage(&program, &err.to_string()),
        },
    }
}
