//! Multi-processor cache coherence evaluation (`mpceval`)
//!
//! Synthesizes multi-processor traces with specific sharing patterns and sweeps
//! an external coherence simulator over them, aggregating its reports.

// Modules
pub mod config;
pub mod data;
pub mod locality;
pub mod metrics;
pub mod parse;
pub mod pattern;
pub mod report;
pub mod sim;
pub mod sweep;
pub mod trace;

// Exports
pub use self::{
	config::{CoherenceType, Protocol, RunConfig, SweepConfig},
	data::{RawResult, ResultSet},
	metrics::MetricRow,
	pattern::Pattern,
	sim::{ExternalSimulator, Simulator},
	sweep::Sweep,
};
