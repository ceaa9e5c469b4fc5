//! Settlement Sim - tick-driven settlement economy
//!
//! Resource ledger, buildings and production, labor cycles, and the
//! popularity score that drives population.

pub mod city;
pub mod core;
pub mod labor;
pub mod scenario;
pub mod simulation;
pub mod world;
