//! # Seed Data Generator
//!
//! Populates the database with demo sales for development.
//!
//! ## Usage
//! ```bash
//! # Generate 200 sales (default)
//! cargo run -p saledesk-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p saledesk-db --bin seed -- --count 1000
//!
//! # Specify database path
//! cargo run -p saledesk-db --bin seed -- --db ./data/saledesk.db
//! ```
//!
//! ## Generated Sales
//! Quantities cycle through 1..=20 so every discount tier shows up:
//! - 1-3 units: no discount
//! - 4-9 units: 10%
//! - 10-20 units: 20%
//!
//! Every tenth sale has one cancelled item, every twenty-fifth sale is
//! cancelled outright. Sales are written with a `SaleCreated` outbox entry,
//! exactly like the API does.

use chrono::{Duration, Utc};
use std::env;

use saledesk_core::{Money, Sale, SaleEvent};
use saledesk_db::{Database, DbConfig};

const CUSTOMERS: &[&str] = &[
    "Acme Ltd",
    "Globex",
    "Initech",
    "Umbrella Retail",
    "Stark Supplies",
    "Wayne Hardware",
    "Hooli",
    "Vandelay Imports",
];

const BRANCHES: &[&str] = &["Downtown", "North", "Harbour", "Airport"];

/// (name, price in cents)
const PRODUCTS: &[(&str, i64)] = &[
    ("USB-C Cable", 1299),
    ("Wireless Mouse", 2450),
    ("Mechanical Keyboard", 8900),
    ("27\" Monitor", 23900),
    ("Laptop Stand", 3999),
    ("Webcam HD", 5450),
    ("Headset", 7425),
    ("Docking Station", 15999),
    ("HDMI Adapter", 999),
    ("Desk Lamp", 3275),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 200;
    let mut db_path = String::from("./saledesk_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(200);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Saledesk Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of sales to generate (default: 200)");
                println!("  -d, --db <PATH>    Database file path (default: ./saledesk_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Saledesk Seed Data Generator");
    println!("============================");
    println!("Database: {}", db_path);
    println!("Sales:    {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.sales().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} sales", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let start = std::time::Instant::now();
    let mut generated = 0;

    for seed in 0..count {
        let sale = generate_sale(seed)?;

        if let Err(e) = db.sales().insert(&sale, &[SaleEvent::created(&sale)]).await {
            eprintln!("Failed to insert {}: {}", sale.sale_number, e);
            continue;
        }

        generated += 1;
        if generated % 50 == 0 {
            println!("  Generated {} sales...", generated);
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Generated {} sales in {:?}", generated, elapsed);
    println!(
        "  Pending events: {}",
        db.outbox().count_pending().await?
    );
    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Builds one priced sale. Deterministic for a given `seed`.
fn generate_sale(seed: usize) -> Result<Sale, saledesk_core::CoreError> {
    let now = Utc::now();
    let sale_date = now - Duration::hours((seed as i64 * 7) % (24 * 90));

    let mut sale = Sale::new(
        format!("S-{:05}", seed + 1),
        sale_date,
        CUSTOMERS[seed % CUSTOMERS.len()],
        BRANCHES[(seed / 3) % BRANCHES.len()],
        now,
    );

    let item_count = 1 + seed % 4;
    for n in 0..item_count {
        let (name, cents) = PRODUCTS[(seed * 3 + n * 7) % PRODUCTS.len()];
        let quantity = 1 + ((seed + n * 5) % 20) as i64;
        sale.add_item(name, quantity, Money::from_cents(cents));
    }

    if seed % 10 == 9 {
        if let Some(item) = sale.items.first_mut() {
            item.is_cancelled = true;
        }
    }
    sale.is_cancelled = seed % 25 == 24;

    sale.apply_discount_rules()?;
    Ok(sale)
}
