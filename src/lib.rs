pub mod cli;
pub mod config;
pub mod ramp;
pub mod runtime;
pub mod vesc;
