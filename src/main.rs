//! Settlement Sim - headless runner
//!
//! Loads a catalog, config and scenario, runs the tick loop, and prints a
//! periodic summary. `--json` dumps the final settlement snapshot.

use clap::Parser;
use std::error::Error;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use settlement_sim::city::catalog::Catalog;
use settlement_sim::city::production::ProductionEvent;
use settlement_sim::core::config::SimulationConfig;
use settlement_sim::scenario::Scenario;
use settlement_sim::simulation::context::SimulationContext;
use settlement_sim::simulation::popularity::{RationLevel, TaxLevel};
use settlement_sim::simulation::tick::{run_simulation_tick, SimulationEvent};

/// Run a settlement economy simulation
#[derive(Parser, Debug)]
#[command(name = "settlement-sim")]
#[command(about = "Run a tick-driven settlement economy simulation")]
struct Args {
    /// Catalog TOML (defaults to the built-in catalog)
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Simulation config TOML; missing fields keep their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Scenario TOML (defaults to the built-in starter settlement)
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Fast ticks to run
    #[arg(long, default_value_t = 600)]
    ticks: u64,

    /// Override the scenario's tax level
    #[arg(long)]
    tax: Option<TaxLevel>,

    /// Override the scenario's ration level
    #[arg(long)]
    rations: Option<RationLevel>,

    /// Print a summary every N ticks (0 = only at the end)
    #[arg(long, default_value_t = 60)]
    report_every: u64,

    /// Print the final snapshot as JSON
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("settlement_sim=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let catalog = match &args.catalog {
        Some(path) => Catalog::load_from_toml(path)?,
        None => Catalog::builtin()?,
    };
    let config = match &args.config {
        Some(path) => SimulationConfig::load(path)?,
        None => SimulationConfig::default(),
    };
    let scenario = match &args.scenario {
        Some(path) => Scenario::load(path)?,
        None => Scenario::builtin()?,
    };

    tracing::info!(
        resources = catalog.resources().len(),
        building_types = catalog.building_types().len(),
        ticks = args.ticks,
        "starting simulation"
    );

    let mut ctx = SimulationContext::new(config, catalog);
    scenario.apply(&mut ctx)?;
    if let Some(tax) = args.tax {
        ctx.set_tax_level(tax);
    }
    if let Some(rations) = args.rations {
        ctx.set_ration_level(rations);
    }

    let mut shortages = 0usize;
    let mut storage_losses = 0.0;
    for _ in 0..args.ticks {
        for event in run_simulation_tick(&mut ctx) {
            if let SimulationEvent::Production(p) = &event {
                match p {
                    ProductionEvent::Shortage { .. } => shortages += 1,
                    ProductionEvent::StorageFull { lost, .. } => storage_losses += lost,
                    _ => {}
                }
            }
        }
        if args.report_every > 0 && ctx.tick % args.report_every == 0 && !args.json {
            print_summary(&ctx);
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&ctx.snapshot())?);
    } else {
        print_summary(&ctx);
        println!("  shortage ticks: {shortages}, lost to full storage: {storage_losses:.1}");
    }
    Ok(())
}

fn print_summary(ctx: &SimulationContext) {
    let popularity = ctx.popularity.breakdown();
    println!(
        "[tick {:>6}] population {:>5.1}/{:<3} popularity {:>5.1} idle {:>3} buildings {:>3}",
        ctx.tick,
        ctx.population(),
        ctx.housing_capacity(),
        popularity.total,
        ctx.labor.idle_count(),
        ctx.buildings.count(),
    );
    let stock: Vec<String> = ctx
        .ledger
        .snapshot()
        .into_iter()
        .filter(|e| e.amount >= 0.5 && e.id != "population")
        .map(|e| format!("{} {:.0}/{:.0}", e.id, e.amount, e.capacity))
        .collect();
    if !stock.is_empty() {
        println!("  {}", stock.join(", "));
    }
}
