pub mod config;
pub mod counters;
pub mod errors;
pub mod gpio;
pub mod models;
pub mod recorders;
pub mod sampler;
pub mod sensor;
pub mod units;
