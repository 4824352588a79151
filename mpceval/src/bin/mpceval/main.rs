//! Cache coherence protocol evaluation (`mpceval`)

// Modules
mod args;

// Imports
use {
	self::args::Args,
	anyhow::Context,
	clap::Parser,
	mpceval::{metrics, report, sweep, ExternalSimulator, ResultSet, Sweep, SweepConfig},
	mpceval_util::{logger, DisplayWrapper},
};

fn main() -> Result<(), anyhow::Error> {
	// Get arguments
	let args = Args::parse();
	logger::pre_init::debug(format!("Args: {args:?}"));

	// Initialize logging
	logger::init(args.log_file.as_deref(), args.log_file_append);

	// Then get the results, either from a previous sweep or a new one
	let results = match args.skip_run {
		true => {
			let (results, path) = ResultSet::load_latest(&args.output_dir)
				.context("Unable to load existing results")?
				.with_context(|| format!("No existing results found in {:?}", args.output_dir))?;
			tracing::info!(?path, results = results.len(), "Loaded existing results");
			results
		},
		false => {
			let config = self::sweep_config(&args).context("Unable to build sweep configuration")?;
			tracing::info!("Access patterns: {:?}", config.patterns);
			tracing::info!("Protocols (for snooping): {:?}", config.protocols);
			tracing::info!("Coherence types: {:?}", config.coherence_types);
			tracing::info!("Processor counts: {:?}", config.processor_counts);

			let initial_results = match config.resume {
				true => sweep::load_resume(&args.output_dir).context("Unable to load results to resume")?,
				false => ResultSet::new(),
			};

			let simulator = ExternalSimulator::new(&config.simulator, config.timeout());
			let output = Sweep::new(&config, simulator, &args.output_dir)
				.run(initial_results)
				.context("Unable to run sweep")?;
			tracing::info!("Completed {} configurations", output.results.len());

			output.results
		},
	};
	anyhow::ensure!(!results.is_empty(), "No results to aggregate");

	// Finally derive the metrics and write all reports
	let rows = metrics::rows(&results);
	let summary = report::write_all(&args.output_dir, &rows).context("Unable to write reports")?;
	tracing::info!(
		"Protocol summary:\n{}",
		DisplayWrapper::new(|f| report::fmt_protocol_summary(f, &summary))
	);

	Ok(())
}

/// Builds the sweep configuration from the config file and arguments
fn sweep_config(args: &Args) -> Result<SweepConfig, anyhow::Error> {
	let mut config = match &args.config_file {
		Some(path) => SweepConfig::from_file(path)?,
		None => SweepConfig::default(),
	};

	if let Some(patterns) = &args.patterns {
		config.patterns = patterns.clone();
	}
	if let Some(protocols) = &args.protocols {
		config.protocols = protocols.clone();
	}
	if let Some(coherence_types) = &args.coherence_types {
		config.coherence_types = coherence_types.clone();
	}
	if let Some(simulator) = &args.simulator {
		config.simulator = simulator.clone();
	}
	if let Some(traces_dir) = &args.traces_dir {
		config.traces_dir = traces_dir.clone();
	}
	if let Some(num_accesses) = args.num_accesses {
		config.num_accesses = num_accesses;
	}
	if let Some(seed) = args.seed {
		config.seed = seed;
	}
	if let Some(timeout_secs) = args.timeout_secs {
		config.timeout_secs = Some(timeout_secs);
	}
	config.resume |= args.resume;
	config.processor_counts.retain(|&num_procs| num_procs <= args.max_procs);

	anyhow::ensure!(
		!config.processor_counts.is_empty(),
		"No processor counts left with at most {} processors",
		args.max_procs
	);
	if let Some(timeout_secs) = config.timeout_secs {
		anyhow::ensure!(
			timeout_secs.is_finite() && timeout_secs > 0.0,
			"Timeout must be positive, found {timeout_secs}"
		);
	}

	Ok(config)
}
