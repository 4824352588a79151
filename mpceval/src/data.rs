//! Result data

// Imports
use {
	crate::{config::RunConfig, parse::Report},
	anyhow::Context,
	std::{
		collections::HashSet,
		fs,
		io::{self, BufWriter, Write},
		path::{Path, PathBuf},
	},
};

/// Incremental checkpoint file name
pub const INCREMENTAL_FILE_NAME: &str = "raw_results_incremental.json";

/// Final snapshot file name
pub const FINAL_FILE_NAME: &str = "raw_results.json";

/// Per-processor counters
#[derive(PartialEq, Eq, Clone, Default, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ProcessorStats {
	pub id:        u64,
	pub hits:      u64,
	pub misses:    u64,
	/// Coherence evictions
	pub evictions: u64,
}

/// Interconnect counters.
///
/// All fields are `None` if the report didn't include the interconnect.
#[derive(PartialEq, Eq, Clone, Default, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct InterconnectStats {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub total_traffic:         Option<u64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub cache_control_traffic: Option<u64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub cache_data_traffic:    Option<u64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub memory_data_traffic:   Option<u64>,
}

impl InterconnectStats {
	/// Returns if no counter is present
	pub fn is_empty(&self) -> bool {
		self == &Self::default()
	}
}

/// Configuration, as echoed by the simulator
#[derive(PartialEq, Eq, Clone, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct ReportEcho {
	pub num_procs:          u64,
	pub directory:          String,
	pub coherence_type:     String,
	pub coherence_protocol: String,
	pub cache_line_size:    u64,
	pub cache_size:         u64,
}

/// Raw result of a single simulator invocation
#[derive(PartialEq, Eq, Clone, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct RawResult {
	/// Per-processor counters
	#[serde(default)]
	pub per_processor: Vec<ProcessorStats>,

	/// Interconnect counters
	#[serde(default)]
	pub interconnect: InterconnectStats,

	/// Simulator's configuration echo
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub echo: Option<ReportEcho>,

	/// Configuration we ran the simulator with
	pub config: RunConfig,
}

impl RawResult {
	/// Creates a raw result from a parsed report
	pub fn new(config: RunConfig, report: Report) -> Self {
		Self {
			per_processor: report.processors,
			interconnect: report.interconnect,
			echo: report.echo,
			config,
		}
	}

	/// Checks that the processor ids are exactly `0..num_procs`
	pub fn check_processors(&self) -> Result<(), anyhow::Error> {
		let num_procs = self.config.num_procs;
		let mut seen = HashSet::new();
		for proc in &self.per_processor {
			anyhow::ensure!(
				proc.id < num_procs as u64,
				"Processor id {} is out of range for {num_procs} processors",
				proc.id
			);
			anyhow::ensure!(seen.insert(proc.id), "Processor id {} appears more than once", proc.id);
		}
		anyhow::ensure!(
			seen.len() == num_procs,
			"Found {} processors, expected {num_procs}",
			seen.len()
		);

		Ok(())
	}
}

/// Result set.
///
/// Only ever grows, serialized as a json array of [`RawResult`]s.
#[derive(PartialEq, Eq, Clone, Default, Debug)]
#[derive(serde::Serialize)]
#[serde(transparent)]
pub struct ResultSet {
	results: Vec<RawResult>,
}

impl ResultSet {
	/// Creates an empty result set
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a result
	pub fn push(&mut self, result: RawResult) {
		self.results.push(result);
	}

	/// Returns the number of results
	pub fn len(&self) -> usize {
		self.results.len()
	}

	/// Returns if there are no results
	pub fn is_empty(&self) -> bool {
		self.results.is_empty()
	}

	/// Returns all results
	pub fn results(&self) -> &[RawResult] {
		&self.results
	}

	/// Returns the configurations of all results
	pub fn configs(&self) -> HashSet<RunConfig> {
		self.results.iter().map(|result| result.config.clone()).collect()
	}

	/// Saves this result set to `path`.
	///
	/// Writes to a temporary file first and renames it over `path`, so
	/// `path` always holds a complete result set.
	pub fn save(&self, path: &Path) -> Result<(), anyhow::Error> {
		let tmp_path = path.with_extension("json.tmp");
		{
			let file =
				fs::File::create(&tmp_path).with_context(|| format!("Unable to create results file {tmp_path:?}"))?;
			let mut writer = BufWriter::new(file);
			serde_json::to_writer_pretty(&mut writer, self).context("Unable to write results")?;
			writer.flush().context("Unable to flush results")?;
			writer
				.get_ref()
				.sync_all()
				.context("Unable to sync results file")?;
		}
		fs::rename(&tmp_path, path).with_context(|| format!("Unable to move {tmp_path:?} to {path:?}"))?;

		Ok(())
	}

	/// Loads a result set from `path`.
	///
	/// Entries that can't be decoded are skipped with a warning, instead
	/// of failing the whole set.
	pub fn load(path: &Path) -> Result<Self, anyhow::Error> {
		let file = fs::File::open(path).with_context(|| format!("Unable to open results file {path:?}"))?;
		let entries = serde_json::from_reader::<_, Vec<serde_json::Value>>(io::BufReader::new(file))
			.with_context(|| format!("Unable to parse results file {path:?}"))?;

		let results = entries
			.into_iter()
			.enumerate()
			.filter_map(|(idx, entry)| match serde_json::from_value::<RawResult>(entry) {
				Ok(result) => Some(result),
				Err(err) => {
					tracing::warn!(?path, idx, ?err, "Skipping malformed result");
					None
				},
			})
			.collect();

		Ok(Self { results })
	}

	/// Loads the latest result set from `output_dir`.
	///
	/// Prefers the incremental checkpoint, falling back to the final snapshot.
	/// Returns `None` if neither exist.
	pub fn load_latest(output_dir: &Path) -> Result<Option<(Self, PathBuf)>, anyhow::Error> {
		for file_name in [INCREMENTAL_FILE_NAME, FINAL_FILE_NAME] {
			let path = output_dir.join(file_name);
			if !path.is_file() {
				continue;
			}

			let results = Self::load(&path)?;
			return Ok(Some((results, path)));
		}

		Ok(None)
	}
}

impl FromIterator<RawResult> for ResultSet {
	fn from_iter<I: IntoIterator<Item = RawResult>>(iter: I) -> Self {
		Self {
			results: iter.into_iter().collect(),
		}
	}
}
