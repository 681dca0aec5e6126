pub mod catchment;
pub mod config;
pub mod edges;
pub mod gaps;
pub mod resolver;
pub mod runs;
