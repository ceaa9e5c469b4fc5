//! Settlement simulation - context, popularity, population, and the tick loop

pub mod context;
pub mod popularity;
pub mod population;
pub mod tick;

pub use context::{RemovalReport, SettlementSnapshot, SimulationContext};
pub use popularity::{
    Popularity, PopularityBreakdown, PopularityFactors, RationLevel, TaxLevel,
};
pub use population::{collect_taxes, settle_rations, PopulationDynamics, RationSettlement};
pub use tick::{run_simulation_tick, run_ticks, SimulationEvent};
