//! Arguments

// Imports
use {mpceval::Pattern, std::path::PathBuf};

/// Arguments
#[derive(Debug)]
#[derive(clap::Parser)]
#[clap(about = "Generates multi-processor traces with a sharing pattern")]
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

	/// Access pattern
	#[clap(long = "pattern")]
	pub pattern: Pattern,

	/// Number of processors
	#[clap(long = "num-procs", default_value_t = 4)]
	pub num_procs: usize,

	/// Accesses per processor
	#[clap(long = "num-accesses", default_value_t = 10)]
	pub num_accesses: usize,

	/// Output directory
	#[clap(long = "output-dir", default_value = "traces_temp")]
	pub output_dir: PathBuf,

	/// Cache line size (in bytes)
	#[clap(long = "cache-line", default_value_t = 64)]
	pub cache_line_size: u64,

	/// Seed
	#[clap(long = "seed", default_value_t = 42)]
	pub seed: u64,
}
