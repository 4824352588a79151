//! Sweep driver tests, using an in-process simulator

// Imports
use {
	mpceval::{
		data,
		metrics,
		report,
		sim::Simulator,
		sweep,
		trace,
		CoherenceType,
		Pattern,
		Protocol,
		ResultSet,
		RunConfig,
		Sweep,
		SweepConfig,
	},
	pretty_assertions::assert_eq,
	std::{fmt::Write, path::Path},
};

/// Simulator that reports one hit per load and one miss per store
#[derive(Default)]
struct FakeSimulator {
	/// Runs we were called with
	calls: Vec<RunConfig>,

	/// Protocol to fail on
	fail_protocol: Option<Protocol>,

	/// Whether to report processor ids starting at 1
	shift_ids: bool,
}

impl Simulator for FakeSimulator {
	fn run(&mut self, run: &RunConfig, traces_dir: &Path) -> Result<String, anyhow::Error> {
		self.calls.push(run.clone());
		anyhow::ensure!(self.fail_protocol != Some(run.protocol), "Simulator crashed");

		let traces = trace::read_dir(traces_dir, run.num_procs)?;
		let mut output = String::new();
		for (proc, events) in traces.iter().enumerate() {
			let hits = events.iter().filter(|event| event.kind == trace::AccessKind::Load).count();
			let misses = events.len() - hits;
			let id = proc + usize::from(self.shift_ids);
			write!(output, "PROCESSOR {id}\nHITS:\t\t{hits}\nMISSES:\t\t{misses}\nCOHERENCE:\t0\n\n")?;
		}
		write!(
			output,
			"INTERCONNECT\nTRAFFIC:\t\t100\nCACHE CONTROL TRAFFIC:\t60\nCACHE DATA TRAFFIC:\t30\nMEMORY DATA TRAFFIC:\t10\n"
		)?;

		Ok(output)
	}
}

/// Returns a config for a single cell, writing traces into `dir`
fn config(dir: &Path, pattern: Pattern, num_procs: usize) -> SweepConfig {
	SweepConfig {
		patterns: vec![pattern],
		processor_counts: vec![num_procs],
		protocols: vec![Protocol::Msi],
		coherence_types: vec![CoherenceType::Snoop],
		traces_dir: dir.join("traces"),
		..SweepConfig::default()
	}
}

#[test]
fn single_run_produces_one_row() {
	let dir = tempfile::tempdir().expect("Unable to create temp dir");
	let output_dir = dir.path().join("results");
	let config = config(dir.path(), Pattern::NoSharing, 4);

	let output = Sweep::new(&config, FakeSimulator::default(), &output_dir)
		.run(ResultSet::new())
		.expect("Sweep should succeed");
	assert_eq!(output.results.len(), 1);
	assert!(output.failed_runs.is_empty());

	let rows = metrics::rows(&output.results);
	assert_eq!(rows.len(), 1);
	let row = &rows[0];
	assert_eq!(row.num_procs, 4);
	assert_eq!(row.coherence_protocol, Protocol::Msi);
	assert_eq!(row.coherence_type, CoherenceType::Snoop);
	assert!(!row.diropt);

	// Every access is reported as either a hit or a miss
	assert_eq!(row.total_hits + row.total_misses, 4 * config.num_accesses as u64);

	assert!(output_dir.join(data::INCREMENTAL_FILE_NAME).is_file());
	assert!(output_dir.join(data::FINAL_FILE_NAME).is_file());
}

#[test]
fn failing_run_does_not_abort_sweep() {
	let dir = tempfile::tempdir().expect("Unable to create temp dir");
	let output_dir = dir.path().join("results");
	let config = SweepConfig {
		protocols: vec![Protocol::Msi, Protocol::Mesi, Protocol::Moesi],
		..config(dir.path(), Pattern::FalseSharing, 4)
	};
	let simulator = FakeSimulator {
		fail_protocol: Some(Protocol::Mesi),
		..FakeSimulator::default()
	};

	let mut sweep = Sweep::new(&config, simulator, &output_dir);
	let output = sweep.run(ResultSet::new()).expect("Sweep should succeed");
	assert_eq!(sweep.simulator().calls.len(), 3);
	assert_eq!(output.results.len(), 2);
	assert_eq!(output.failed_runs.len(), 1);
	assert_eq!(output.failed_runs[0].protocol, Protocol::Mesi);

	let protocols = output
		.results
		.results()
		.iter()
		.map(|result| result.config.protocol)
		.collect::<Vec<_>>();
	assert_eq!(protocols, [Protocol::Msi, Protocol::Moesi]);

	// The checkpoint only holds the successful runs, and still aggregates
	let checkpoint =
		ResultSet::load(&output_dir.join(data::INCREMENTAL_FILE_NAME)).expect("Unable to load checkpoint");
	assert_eq!(checkpoint.len(), 2);
	let summary = report::protocol_summary(&metrics::rows(&checkpoint));
	assert_eq!(summary.keys().copied().collect::<Vec<_>>(), [Protocol::Msi, Protocol::Moesi]);
}

#[test]
fn directory_runs_with_and_without_optimization() {
	let dir = tempfile::tempdir().expect("Unable to create temp dir");
	let output_dir = dir.path().join("results");
	let config = SweepConfig {
		coherence_types: vec![CoherenceType::Directory],
		..config(dir.path(), Pattern::ProducerConsumer, 8)
	};

	let mut sweep = Sweep::new(&config, FakeSimulator::default(), &output_dir);
	let output = sweep.run(ResultSet::new()).expect("Sweep should succeed");

	let runs = sweep
		.simulator()
		.calls
		.iter()
		.map(|run| (run.protocol, run.coherence_type, run.directory_optimization))
		.collect::<Vec<_>>();
	assert_eq!(runs, [
		(Protocol::Mesi, CoherenceType::Directory, false),
		(Protocol::Mesi, CoherenceType::Directory, true),
	]);
	assert_eq!(output.results.len(), 2);
}

#[test]
fn checkpoint_reloads_completed_runs() {
	let dir = tempfile::tempdir().expect("Unable to create temp dir");
	let output_dir = dir.path().join("results");
	let config = SweepConfig {
		protocols: vec![Protocol::Msi, Protocol::Mesi],
		processor_counts: vec![4, 8],
		..config(dir.path(), Pattern::MultipleReaders, 4)
	};

	let output = Sweep::new(&config, FakeSimulator::default(), &output_dir)
		.run(ResultSet::new())
		.expect("Sweep should succeed");
	assert_eq!(output.results.len(), 4);

	let checkpoint =
		ResultSet::load(&output_dir.join(data::INCREMENTAL_FILE_NAME)).expect("Unable to load checkpoint");
	assert_eq!(checkpoint, output.results);
}

#[test]
fn resume_skips_completed_runs() {
	let dir = tempfile::tempdir().expect("Unable to create temp dir");
	let output_dir = dir.path().join("results");
	let first_config = config(dir.path(), Pattern::Random, 4);
	Sweep::new(&first_config, FakeSimulator::default(), &output_dir)
		.run(ResultSet::new())
		.expect("Sweep should succeed");

	let config = SweepConfig {
		protocols: vec![Protocol::Msi, Protocol::Mesif],
		resume: true,
		..first_config
	};
	let previous = sweep::load_resume(&output_dir).expect("Unable to load previous results");
	assert_eq!(previous.len(), 1);

	let mut sweep = Sweep::new(&config, FakeSimulator::default(), &output_dir);
	let output = sweep.run(previous).expect("Sweep should succeed");
	let called = sweep.simulator().calls.iter().map(|run| run.protocol).collect::<Vec<_>>();
	assert_eq!(called, [Protocol::Mesif]);
	assert_eq!(output.skipped_runs, 1);
	assert_eq!(output.results.len(), 2);
}

#[test]
fn resume_without_previous_results_starts_empty() {
	let dir = tempfile::tempdir().expect("Unable to create temp dir");
	let results = sweep::load_resume(dir.path()).expect("Unable to load previous results");
	assert!(results.is_empty());
}

#[test]
fn malformed_report_is_rejected() {
	let dir = tempfile::tempdir().expect("Unable to create temp dir");
	let output_dir = dir.path().join("results");
	let config = config(dir.path(), Pattern::MultipleWriters, 4);
	let simulator = FakeSimulator {
		shift_ids: true,
		..FakeSimulator::default()
	};

	let output = Sweep::new(&config, simulator, &output_dir)
		.run(ResultSet::new())
		.expect("Sweep should succeed");
	assert!(output.results.is_empty());
	assert_eq!(output.failed_runs.len(), 1);

	// Nothing succeeded, so only the final snapshot is written
	assert!(!output_dir.join(data::INCREMENTAL_FILE_NAME).exists());
	let snapshot = ResultSet::load(&output_dir.join(data::FINAL_FILE_NAME)).expect("Unable to load snapshot");
	assert!(snapshot.is_empty());
}

#[test]
fn reports_are_written() {
	let dir = tempfile::tempdir().expect("Unable to create temp dir");
	let output_dir = dir.path().join("results");
	let config = SweepConfig {
		protocols: Protocol::ALL.to_vec(),
		coherence_types: CoherenceType::ALL.to_vec(),
		..config(dir.path(), Pattern::PartialProcUse, 8)
	};

	let output = Sweep::new(&config, FakeSimulator::default(), &output_dir)
		.run(ResultSet::new())
		.expect("Sweep should succeed");
	assert_eq!(output.results.len(), Protocol::ALL.len() + 2);

	let rows = metrics::rows(&output.results);
	let summary = report::write_all(&output_dir, &rows).expect("Unable to write reports");
	assert_eq!(summary.len(), Protocol::ALL.len());

	assert!(output_dir.join(report::METRICS_FILE_NAME).is_file());
	assert!(output_dir
		.join(report::PROTOCOL_ANALYSIS_DIR_NAME)
		.join(report::PROTOCOL_ANALYSIS_FILE_NAME)
		.is_file());
}
