pub mod catalog;
pub mod config;
pub mod context;
pub mod datasets;
pub mod error;
pub mod filters;
pub mod metrics_consts;
pub mod normalize;
pub mod runner;
pub mod sink;
pub mod slices;
pub mod types;
