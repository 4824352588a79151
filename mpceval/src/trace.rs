//! Text traces.
//!
//! A trace is a directory with one file per processor, `<proc>.txt`,
//! each line being `<L|S> <address>`.

// Imports
use {
	anyhow::Context,
	std::{
		fmt,
		fs,
		io::{self, BufWriter},
		path::{Path, PathBuf},
		str::FromStr,
	},
};

/// Access kind
#[derive(PartialEq, Eq, Clone, Copy, Hash, Debug)]
pub enum AccessKind {
	/// Load
	Load,

	/// Store
	Store,
}

impl AccessKind {
	/// Returns the kind for an access index, alternating loads and stores
	pub fn alternating(idx: usize) -> Self {
		match idx % 2 {
			0 => Self::Load,
			_ => Self::Store,
		}
	}

	/// Returns the character used for this kind in traces
	pub fn as_char(self) -> char {
		match self {
			Self::Load => 'L',
			Self::Store => 'S',
		}
	}
}

/// Access event
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct AccessEvent {
	/// Kind
	pub kind: AccessKind,

	/// Address
	pub addr: u64,
}

impl AccessEvent {
	/// Creates a load
	pub fn load(addr: u64) -> Self {
		Self {
			kind: AccessKind::Load,
			addr,
		}
	}

	/// Creates a store
	pub fn store(addr: u64) -> Self {
		Self {
			kind: AccessKind::Store,
			addr,
		}
	}
}

impl fmt::Display for AccessEvent {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} {}", self.kind.as_char(), self.addr)
	}
}

impl FromStr for AccessEvent {
	type Err = anyhow::Error;

	fn from_str(line: &str) -> Result<Self, Self::Err> {
		let (kind, addr) = line
			.trim_end()
			.split_once(' ')
			.with_context(|| format!("Missing separator in {line:?}"))?;
		let kind = match kind {
			"L" => AccessKind::Load,
			"S" => AccessKind::Store,
			_ => anyhow::bail!("Unknown access kind: {kind:?}"),
		};
		let addr = addr.parse().with_context(|| format!("Unable to parse address {addr:?}"))?;

		Ok(Self { kind, addr })
	}
}

/// Returns the path of the trace file of processor `proc` under `dir`
pub fn proc_path(dir: &Path, proc: usize) -> PathBuf {
	dir.join(format!("{proc}.txt"))
}

/// Trace writer.
///
/// Writes the trace of a single processor, truncating any previous one.
#[derive(Debug)]
pub struct TraceWriter<W> {
	/// Events written
	events_written: usize,

	/// Writer
	writer: W,
}

impl TraceWriter<BufWriter<fs::File>> {
	/// Creates the trace file for processor `proc` under `dir`
	pub fn create(dir: &Path, proc: usize) -> Result<Self, anyhow::Error> {
		let path = proc_path(dir, proc);
		let file = fs::File::create(&path).with_context(|| format!("Unable to create trace file {path:?}"))?;
		Ok(Self::new(BufWriter::new(file)))
	}
}

impl<W: io::Write> TraceWriter<W> {
	/// Creates a new writer
	pub fn new(writer: W) -> Self {
		Self {
			events_written: 0,
			writer,
		}
	}

	/// Writes an event
	pub fn write(&mut self, event: &AccessEvent) -> Result<(), anyhow::Error> {
		writeln!(self.writer, "{event}").context("Unable to write event")?;

		self.events_written += 1;
		Ok(())
	}

	/// Finishes writing, returning the number of events written
	pub fn finish(mut self) -> Result<usize, anyhow::Error> {
		self.writer.flush().context("Unable to flush trace")?;
		Ok(self.events_written)
	}
}

/// Writes the traces of all processors under `dir`, one file per processor.
///
/// Processors with no events still get an (empty) file, and trace files of
/// processors past `traces.len()` left by a previous trace are removed.
pub fn write_dir(dir: &Path, traces: &[Vec<AccessEvent>]) -> Result<(), anyhow::Error> {
	fs::create_dir_all(dir).with_context(|| format!("Unable to create trace directory {dir:?}"))?;

	for (proc, events) in traces.iter().enumerate() {
		let mut writer = TraceWriter::create(dir, proc)?;
		for event in events {
			writer.write(event).with_context(|| format!("Unable to write trace of processor {proc}"))?;
		}
		writer.finish()?;
	}

	self::remove_stale(dir, traces.len())
}

/// Removes all trace files in `dir` of processors `num_procs..`
fn remove_stale(dir: &Path, num_procs: usize) -> Result<(), anyhow::Error> {
	let entries = fs::read_dir(dir).with_context(|| format!("Unable to read trace directory {dir:?}"))?;
	for entry in entries {
		let entry = entry.with_context(|| format!("Unable to read entry of {dir:?}"))?;
		let file_name = entry.file_name();
		let Some(proc) = file_name
			.to_str()
			.and_then(|name| name.strip_suffix(".txt"))
			.and_then(|proc| proc.parse::<usize>().ok())
		else {
			continue;
		};

		if proc >= num_procs {
			let path = entry.path();
			tracing::trace!(?path, "Removing stale trace");
			fs::remove_file(&path).with_context(|| format!("Unable to remove stale trace {path:?}"))?;
		}
	}

	Ok(())
}

/// Reads all events from a trace file
pub fn read_events<R: io::BufRead>(reader: R) -> Result<Vec<AccessEvent>, anyhow::Error> {
	reader
		.lines()
		.enumerate()
		.filter(|(_, line)| !matches!(line, Ok(line) if line.trim().is_empty()))
		.map(|(line_idx, line)| {
			let line = line.context("Unable to read line")?;
			line.parse()
				.with_context(|| format!("Unable to parse line {}", line_idx + 1))
		})
		.collect()
}

/// Reads the traces of processors `0..num_procs` under `dir`
pub fn read_dir(dir: &Path, num_procs: usize) -> Result<Vec<Vec<AccessEvent>>, anyhow::Error> {
	(0..num_procs)
		.map(|proc| {
			let path = proc_path(dir, proc);
			let file = fs::File::open(&path).with_context(|| format!("Unable to open trace file {path:?}"))?;
			read_events(io::BufReader::new(file)).with_context(|| format!("Unable to read trace file {path:?}"))
		})
		.collect()
}
