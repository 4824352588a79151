//! Configuration

// Imports
use {
	crate::pattern::Pattern,
	anyhow::Context,
	std::{fmt, fs, path::PathBuf, time::Duration},
};

/// Coherence protocol
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
#[derive(clap::ValueEnum)]
pub enum Protocol {
	#[serde(rename = "MI")]
	#[value(name = "MI")]
	Mi,

	#[serde(rename = "MSI")]
	#[value(name = "MSI")]
	Msi,

	#[serde(rename = "MESI")]
	#[value(name = "MESI")]
	Mesi,

	#[serde(rename = "MOESI")]
	#[value(name = "MOESI")]
	Moesi,

	#[serde(rename = "MESIF")]
	#[value(name = "MESIF")]
	Mesif,
}

impl Protocol {
	/// All protocols
	pub const ALL: [Self; 5] = [Self::Mi, Self::Msi, Self::Mesi, Self::Moesi, Self::Mesif];

	/// Returns the name the simulator uses for this protocol
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Mi => "MI",
			Self::Msi => "MSI",
			Self::Mesi => "MESI",
			Self::Moesi => "MOESI",
			Self::Mesif => "MESIF",
		}
	}
}

impl fmt::Display for Protocol {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.pad(self.as_str())
	}
}

/// Coherence mechanism
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
#[derive(clap::ValueEnum)]
pub enum CoherenceType {
	/// Broadcast-based
	#[serde(rename = "SNOOP")]
	#[value(name = "SNOOP")]
	Snoop,

	/// Indirection-based
	#[serde(rename = "DIRECTORY")]
	#[value(name = "DIRECTORY")]
	Directory,
}

impl CoherenceType {
	/// All coherence types
	pub const ALL: [Self; 2] = [Self::Snoop, Self::Directory];

	/// Returns the name the simulator uses for this coherence type
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Snoop => "SNOOP",
			Self::Directory => "DIRECTORY",
		}
	}
}

impl fmt::Display for CoherenceType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.pad(self.as_str())
	}
}

/// Configuration of a single simulator invocation
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct RunConfig {
	pub protocol:               Protocol,
	pub coherence_type:         CoherenceType,
	pub num_procs:              usize,
	pub access_pattern:         Pattern,
	pub directory_optimization: bool,
	pub cache_line_size:        u64,
	pub num_accesses:           usize,
}

impl fmt::Display for RunConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{}/{} x{} {}",
			self.coherence_type, self.protocol, self.num_procs, self.access_pattern
		)?;
		if self.directory_optimization {
			f.write_str(" (diropt)")?;
		}

		Ok(())
	}
}

/// Sweep configuration.
///
/// Every field has a default, so a config file only needs
/// to specify what it changes.
#[derive(Clone, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SweepConfig {
	/// Access patterns to sweep
	pub patterns: Vec<Pattern>,

	/// Processor counts to sweep
	pub processor_counts: Vec<usize>,

	/// Protocols to sweep with snooping
	pub protocols: Vec<Protocol>,

	/// Coherence types to sweep
	pub coherence_types: Vec<CoherenceType>,

	/// Protocol used with a directory
	pub directory_protocol: Protocol,

	/// Accesses per processor
	pub num_accesses: usize,

	/// Cache line size (in bytes)
	pub cache_line_size: u64,

	/// Trace generation seed
	pub seed: u64,

	/// Simulator executable
	pub simulator: PathBuf,

	/// Directory the traces are written to, and the simulator reads from
	pub traces_dir: PathBuf,

	/// Simulator timeout (in seconds)
	pub timeout_secs: Option<f64>,

	/// Whether to skip runs already in a previous checkpoint
	pub resume: bool,
}

impl SweepConfig {
	/// Default processor counts
	pub const DEFAULT_PROCESSOR_COUNTS: [usize; 6] = [4, 8, 16, 32, 64, 128];

	/// Parses a config from a json file
	pub fn from_file(path: &std::path::Path) -> Result<Self, anyhow::Error> {
		let file = fs::File::open(path).with_context(|| format!("Unable to open config file {path:?}"))?;
		serde_json::from_reader(file).with_context(|| format!("Unable to parse config file {path:?}"))
	}

	/// Returns the simulator timeout
	pub fn timeout(&self) -> Option<Duration> {
		self.timeout_secs.map(Duration::from_secs_f64)
	}

	/// Returns all runs of a `(pattern, num_procs)` cell, in the order they're executed
	pub fn cell_runs(&self, access_pattern: Pattern, num_procs: usize) -> Vec<RunConfig> {
		let run = |protocol, coherence_type, directory_optimization| RunConfig {
			protocol,
			coherence_type,
			num_procs,
			access_pattern,
			directory_optimization,
			cache_line_size: self.cache_line_size,
			num_accesses: self.num_accesses,
		};

		let mut runs = vec![];
		if self.coherence_types.contains(&CoherenceType::Snoop) {
			runs.extend(
				self.protocols
					.iter()
					.map(|&protocol| run(protocol, CoherenceType::Snoop, false)),
			);
		}
		if self.coherence_types.contains(&CoherenceType::Directory) {
			runs.extend(
				[false, true]
					.into_iter()
					.map(|diropt| run(self.directory_protocol, CoherenceType::Directory, diropt)),
			);
		}

		runs
	}
}

impl Default for SweepConfig {
	fn default() -> Self {
		Self {
			patterns:           Pattern::ALL.to_vec(),
			processor_counts:   Self::DEFAULT_PROCESSOR_COUNTS.to_vec(),
			protocols:          Protocol::ALL.to_vec(),
			coherence_types:    CoherenceType::ALL.to_vec(),
			directory_protocol: Protocol::Mesi,
			num_accesses:       50,
			cache_line_size:    64,
			seed:               42,
			simulator:          PathBuf::from("./mpcsim"),
			traces_dir:         PathBuf::from("traces_temp"),
			timeout_secs:       None,
			resume:             false,
		}
	}
}

#[cfg(test)]
mod tests {
	use {super::*, pretty_assertions::assert_eq};

	#[test]
	fn cell_runs_snoop_then_directory() {
		let config = SweepConfig {
			protocols: vec![Protocol::Msi, Protocol::Moesi],
			..SweepConfig::default()
		};

		let runs = config
			.cell_runs(Pattern::FalseSharing, 8)
			.into_iter()
			.map(|run| (run.protocol, run.coherence_type, run.directory_optimization))
			.collect::<Vec<_>>();
		assert_eq!(runs, [
			(Protocol::Msi, CoherenceType::Snoop, false),
			(Protocol::Moesi, CoherenceType::Snoop, false),
			(Protocol::Mesi, CoherenceType::Directory, false),
			(Protocol::Mesi, CoherenceType::Directory, true),
		]);
	}

	#[test]
	fn cell_runs_respects_coherence_types() {
		let config = SweepConfig {
			coherence_types: vec![CoherenceType::Directory],
			..SweepConfig::default()
		};

		let runs = config.cell_runs(Pattern::Random, 4);
		assert_eq!(runs.len(), 2);
		assert!(runs.iter().all(|run| run.coherence_type == CoherenceType::Directory));
	}

	#[test]
	fn partial_config_file_uses_defaults() {
		let config =
			serde_json::from_str::<SweepConfig>(r#"{ "protocols": ["MSI"], "patterns": ["no_sharing"] }"#)
				.expect("Unable to parse config");

		assert_eq!(config.protocols, [Protocol::Msi]);
		assert_eq!(config.patterns, [Pattern::NoSharing]);
		assert_eq!(config.processor_counts, SweepConfig::DEFAULT_PROCESSOR_COUNTS);
		assert_eq!(config.num_accesses, 50);
		assert_eq!(config.directory_protocol, Protocol::Mesi);
	}

	#[test]
	fn names_match_simulator_flags() {
		assert_eq!(
			serde_json::to_string(&Protocol::Mesif).expect("Unable to serialize"),
			r#""MESIF""#
		);
		assert_eq!(CoherenceType::Directory.to_string(), "DIRECTORY");
	}
}
