//! Sweep driver

// Imports
use {
	crate::{
		config::{RunConfig, SweepConfig},
		data::{self, RawResult, ResultSet},
		parse,
		pattern::{self, Pattern},
		sim::Simulator,
		trace,
	},
	anyhow::Context,
	itertools::Itertools,
	rand::{rngs::StdRng, SeedableRng},
	std::{
		fs,
		path::{Path, PathBuf},
	},
};

/// Sweep driver.
///
/// Runs the simulator once per [`RunConfig`] of the configuration's cross-product,
/// checkpointing the results after every successful run.
#[derive(Debug)]
pub struct Sweep<'a, S> {
	/// Configuration
	config: &'a SweepConfig,

	/// Simulator
	simulator: S,

	/// Output directory
	output_dir: PathBuf,
}

impl<'a, S: Simulator> Sweep<'a, S> {
	/// Creates a new sweep
	pub fn new(config: &'a SweepConfig, simulator: S, output_dir: impl Into<PathBuf>) -> Self {
		Self {
			config,
			simulator,
			output_dir: output_dir.into(),
		}
	}

	/// Returns the simulator
	pub fn simulator(&self) -> &S {
		&self.simulator
	}

	/// Runs the sweep, adding to `results`.
	///
	/// Any runs already in `results` are skipped. Failing cells and runs are
	/// logged and skipped, only being unable to write the results is an error.
	pub fn run(&mut self, mut results: ResultSet) -> Result<SweepOutput, anyhow::Error> {
		fs::create_dir_all(&self.output_dir)
			.with_context(|| format!("Unable to create output directory {:?}", self.output_dir))?;
		let incremental_path = self.output_dir.join(data::INCREMENTAL_FILE_NAME);
		let final_path = self.output_dir.join(data::FINAL_FILE_NAME);

		let satisfied = results.configs();
		if !satisfied.is_empty() {
			tracing::info!("Resuming with {} existing results", satisfied.len());
		}

		let cells = self
			.config
			.patterns
			.iter()
			.copied()
			.cartesian_product(self.config.processor_counts.iter().copied())
			.collect::<Vec<_>>();
		let total_runs = cells
			.iter()
			.map(|&(pattern, num_procs)| self.config.cell_runs(pattern, num_procs).len())
			.sum::<usize>();

		let mut output = SweepOutput::default();
		let mut runs_visited = 0;
		for (pattern, num_procs) in cells {
			let (runs, satisfied_runs) = self
				.config
				.cell_runs(pattern, num_procs)
				.into_iter()
				.partition::<Vec<_>, _>(|run| !satisfied.contains(run));
			runs_visited += satisfied_runs.len();
			output.skipped_runs += satisfied_runs.len();
			if runs.is_empty() {
				tracing::debug!(%pattern, num_procs, "All runs already done, skipping cell");
				continue;
			}

			// Note: The traces are shared by all runs of this cell.
			if let Err(err) = self.generate_traces(pattern, num_procs) {
				tracing::warn!(%pattern, num_procs, ?err, "Unable to generate traces, skipping cell");
				runs_visited += runs.len();
				output.failed_cells.push((pattern, num_procs));
				continue;
			}

			for run in runs {
				runs_visited += 1;
				let progress = 100.0 * (runs_visited as f64 / total_runs as f64);

				let result = match self.run_once(&run) {
					Ok(result) => result,
					Err(err) => {
						tracing::warn!("[{progress:.2}%] Run {run} failed: {err:?}");
						output.failed_runs.push(run);
						continue;
					},
				};

				tracing::info!("[{progress:.2}%] Run {run} finished");
				results.push(result);
				results
					.save(&incremental_path)
					.context("Unable to save incremental results")?;
			}
		}

		results.save(&final_path).context("Unable to save final results")?;
		tracing::info!(
			results = results.len(),
			failed_runs = output.failed_runs.len(),
			failed_cells = output.failed_cells.len(),
			skipped_runs = output.skipped_runs,
			"Sweep finished"
		);

		output.results = results;
		Ok(output)
	}

	/// Generates the traces of a cell
	fn generate_traces(&self, pattern: Pattern, num_procs: usize) -> Result<(), anyhow::Error> {
		let params = pattern::Params {
			num_procs,
			num_accesses: self.config.num_accesses,
			cache_line_size: self.config.cache_line_size,
		};
		let mut rng = StdRng::seed_from_u64(self.config.seed);
		let traces = pattern.generate(&params, &mut rng);

		tracing::debug!(%pattern, num_procs, traces_dir = ?self.config.traces_dir, "Writing traces");
		trace::write_dir(&self.config.traces_dir, &traces).context("Unable to write traces")
	}

	/// Runs the simulator once, returning its validated result
	fn run_once(&mut self, run: &RunConfig) -> Result<RawResult, anyhow::Error> {
		let output = self
			.simulator
			.run(run, &self.config.traces_dir)
			.context("Unable to run simulator")?;

		let result = RawResult::new(run.clone(), parse::parse(&output));
		result.check_processors().context("Simulator report was malformed")?;

		Ok(result)
	}
}

/// Output of [`Sweep::run`]
#[derive(Clone, Default, Debug)]
pub struct SweepOutput {
	/// All results, including any we started with
	pub results: ResultSet,

	/// Runs that failed
	pub failed_runs: Vec<RunConfig>,

	/// Cells whose traces couldn't be generated
	pub failed_cells: Vec<(Pattern, usize)>,

	/// Runs skipped because they were already in the initial results
	pub skipped_runs: usize,
}

/// Loads the results to resume from in `output_dir`, if any
pub fn load_resume(output_dir: &Path) -> Result<ResultSet, anyhow::Error> {
	match ResultSet::load_latest(output_dir)? {
		Some((results, path)) => {
			tracing::info!(?path, results = results.len(), "Loaded previous results");
			Ok(results)
		},
		None => {
			tracing::info!(?output_dir, "No previous results found, starting from scratch");
			Ok(ResultSet::new())
		},
	}
}
