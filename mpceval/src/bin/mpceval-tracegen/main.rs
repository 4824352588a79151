//! Generates the traces of a single access pattern

// Modules
mod args;

// Imports
use {
	self::args::Args,
	anyhow::Context,
	clap::Parser,
	mpceval::{pattern, trace},
	mpceval_util::logger,
	rand::{rngs::StdRng, SeedableRng},
};

fn main() -> Result<(), anyhow::Error> {
	// Get arguments
	let args = Args::parse();
	logger::pre_init::debug(format!("Args: {args:?}"));

	// Initialize logging
	logger::init(args.log_file.as_deref(), args.log_file_append);

	// Generate the traces
	let params = pattern::Params {
		num_procs:       args.num_procs,
		num_accesses:    args.num_accesses,
		cache_line_size: args.cache_line_size,
	};
	let mut rng = StdRng::seed_from_u64(args.seed);
	let traces = args.pattern.generate(&params, &mut rng);

	// And write them
	trace::write_dir(&args.output_dir, &traces).context("Unable to write traces")?;
	tracing::info!(
		pattern = %args.pattern,
		num_procs = args.num_procs,
		output_dir = ?args.output_dir,
		"Generated traces"
	);

	Ok(())
}
