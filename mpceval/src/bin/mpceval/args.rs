//! Arguments

// Imports
use {
	mpceval::{CoherenceType, Pattern, Protocol},
	std::path::PathBuf,
};

/// Arguments
#[derive(Debug)]
#[derive(clap::Parser)]
#[clap(about = "Cache coherence protocol evaluation")]
pub struct Args {
	/// Log file
	///
	/// Specifies a file to perform verbose logging to.
	/// You can use `RUST_LOG_FILE` to set filtering options
	#[clap(long = "log-file")]
	pub log_file: Option<PathBuf>,

	/// Whether to append to the log file
	#[clap(long = "log-file-append")]
	pub log_file_append: bool,

	/// Config file
	///
	/// Any options passed on the command line override it.
	#[clap(long = "config")]
	pub config_file: Option<PathBuf>,

	/// Skip running simulations and use existing results
	#[clap(long = "skip-run")]
	pub skip_run: bool,

	/// Directory to store results
	#[clap(long = "output-dir", default_value = "evaluation_results")]
	pub output_dir: PathBuf,

	/// Maximum number of processors to test
	#[clap(long = "max-procs", default_value_t = 8)]
	pub max_procs: usize,

	/// Access patterns to test (default: all)
	#[clap(long = "patterns", num_args = 1..)]
	pub patterns: Option<Vec<Pattern>>,

	/// Protocols to test with snooping (default: all)
	#[clap(long = "protocols", num_args = 1..)]
	pub protocols: Option<Vec<Protocol>>,

	/// Coherence types to test (default: all)
	#[clap(long = "coherence-types", num_args = 1..)]
	pub coherence_types: Option<Vec<CoherenceType>>,

	/// Simulator executable
	#[clap(long = "simulator")]
	pub simulator: Option<PathBuf>,

	/// Directory to write traces to
	#[clap(long = "traces-dir")]
	pub traces_dir: Option<PathBuf>,

	/// Accesses per processor
	#[clap(long = "num-accesses")]
	pub num_accesses: Option<usize>,

	/// Trace generation seed
	#[clap(long = "seed")]
	pub seed: Option<u64>,

	/// Simulator timeout, in seconds
	#[clap(long = "timeout-secs")]
	pub timeout_secs: Option<f64>,

	/// Skip runs already present in previous results
	#[clap(long = "resume")]
	pub resume: bool,
}
