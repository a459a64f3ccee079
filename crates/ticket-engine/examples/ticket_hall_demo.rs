//! End-to-end ticket hall demo.
//!
//! Seeds a hall with the default services and a few counters, pushes a
//! morning's worth of customers through it, and prints the queue board
//! after every phase.
//!
//! ```bash
//! cargo run --example ticket_hall_demo
//! cargo run --example ticket_hall_demo -- --database-url sqlite://hall.db?mode=rwc --log-level debug
//! ```

use anyhow::Result;
use clap::Parser;
use tellerq_infra_common::logging::{log_welcome, parse_log_level, setup_logging, LoggingConfig};
use tellerq_ticket_engine::prelude::*;

#[derive(Parser, Debug)]
#[command(name = "ticket_hall_demo", about = "Run a simulated ticket hall")]
struct Args {
    /// SQLite database URL; defaults to an in-memory database
    #[arg(long, default_value = "sqlite::memory:")]
    database_url: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Customers to send through each service
    #[arg(long, default_value_t = 3)]
    customers_per_service: usize,
}

async fn print_board(supervisor: &SupervisorApi) -> Result<()> {
    let status = supervisor.queue_status().await?;
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = parse_log_level(&args.log_level)?;
    setup_logging(LoggingConfig::new(level, "ticket_hall_demo"))?;
    log_welcome("ticket_hall_demo", env!("CARGO_PKG_VERSION"));

    let mut config = EngineConfig::default();
    config.database.database_url = args.database_url.clone();
    config.monitor.interval_secs = 0; // the demo prints its own board

    let mut server = TicketHallServerBuilder::new()
        .with_config(config)
        .build()
        .await?;

    let services = server.create_default_services().await?;
    let counters = server
        .create_test_counters(vec![
            ("Counter 1", vec!["D", "W"]),
            ("Counter 2", vec!["L", "A"]),
            ("Counter 3", vec!["D", "W", "L", "A"]),
        ])
        .await?;
    server.start().await?;

    // Morning rush: customers pull tickets at the kiosk
    println!("\n=== Customers arriving ===");
    for service in &services {
        for _ in 0..args.customers_per_service {
            let receipt = server.kiosk_api().take_ticket(service.id).await?;
            println!(
                "ticket {} for {} (position {} of {})",
                receipt.code, service.name, receipt.position_in_queue, receipt.queue_length
            );
        }
    }
    print_board(server.supervisor_api()).await?;

    // Counters work the lines until nobody is waiting
    println!("\n=== Counters serving ===");
    loop {
        let mut any_called = false;
        for counter in &counters {
            if let Some(called) = server.clerk_api().next_ticket(counter.id).await? {
                println!("{} -> now serving {}", counter.name, called.code);
                server.clerk_api().complete_ticket(&called.code).await?;
                any_called = true;
            }
        }
        if !any_called {
            break;
        }
    }
    print_board(server.supervisor_api()).await?;

    let stats = server.supervisor_api().stats().await?;
    println!(
        "\nDone: {} waiting, {} services, {} counters",
        stats.total_waiting, stats.services, stats.counters
    );

    server.stop().await?;
    Ok(())
}
