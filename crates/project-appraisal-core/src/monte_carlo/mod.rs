pub mod distribution;
pub mod rng;
pub mod simulation;
pub mod statistics;

pub use distribution::Distribution;
pub use simulation::{
    run_monte_carlo, simulate, BestBaseWorst, MonteCarloInput, MonteCarloOutput, SimulatedVariable,
    SimulationBatch, SimulationConfig,
};
pub use statistics::SummaryStatistics;
