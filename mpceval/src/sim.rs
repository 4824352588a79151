//! Simulator invocation

// Imports
use {
	crate::config::RunConfig,
	anyhow::Context,
	mpceval_util::CommandLine,
	std::{
		io::{self, Read},
		path::{Path, PathBuf},
		process::{self, Command, Stdio},
		thread,
		time::{Duration, Instant},
	},
};

/// Simulator
pub trait Simulator {
	/// Runs the simulator with configuration `run` over the traces in `traces_dir`.
	///
	/// Returns the simulator's report.
	fn run(&mut self, run: &RunConfig, traces_dir: &Path) -> Result<String, anyhow::Error>;
}

/// External simulator process
#[derive(Clone, Debug)]
pub struct ExternalSimulator {
	/// Executable
	program: PathBuf,

	/// Timeout for each invocation
	timeout: Option<Duration>,
}

impl ExternalSimulator {
	/// Interval to poll the simulator at, when waiting with a timeout
	const POLL_INTERVAL: Duration = Duration::from_millis(10);

	/// Creates a new external simulator
	pub fn new(program: impl Into<PathBuf>, timeout: Option<Duration>) -> Self {
		Self {
			program: program.into(),
			timeout,
		}
	}

	/// Builds the command to run the simulator with
	pub fn command(&self, run: &RunConfig, traces_dir: &Path) -> Command {
		let mut cmd = Command::new(&self.program);
		cmd.args(args(run, traces_dir));
		cmd
	}

	/// Waits for `cmd`, killing it once the timeout elapses
	fn output(&self, mut cmd: Command) -> Result<process::Output, anyhow::Error> {
		let Some(timeout) = self.timeout else {
			return cmd.output().context("Unable to launch simulator");
		};

		let mut child = cmd
			.stdin(Stdio::null())
			.stdout(Stdio::piped())
			.stderr(Stdio::piped())
			.spawn()
			.context("Unable to launch simulator")?;

		// Note: Both pipes must be drained while we wait, else the simulator
		//       may block once they fill up.
		let stdout = drain(child.stdout.take());
		let stderr = drain(child.stderr.take());

		let start_time = Instant::now();
		let status = loop {
			if let Some(status) = child.try_wait().context("Unable to wait for simulator")? {
				break status;
			}

			if start_time.elapsed() >= timeout {
				if let Err(err) = child.kill() {
					tracing::warn!(?err, "Unable to kill simulator");
				}
				let _ = child.wait();
				anyhow::bail!("Simulator timed out after {timeout:?}");
			}

			thread::sleep(Self::POLL_INTERVAL);
		};

		let join = |handle: thread::JoinHandle<io::Result<Vec<u8>>>| {
			handle
				.join()
				.map_err(|_| anyhow::anyhow!("Pipe reader panicked"))?
				.context("Unable to read simulator output")
		};

		Ok(process::Output {
			status,
			stdout: join(stdout)?,
			stderr: join(stderr)?,
		})
	}
}

impl Simulator for ExternalSimulator {
	fn run(&mut self, run: &RunConfig, traces_dir: &Path) -> Result<String, anyhow::Error> {
		let cmd = self.command(run, traces_dir);
		let cmdline = cmd.cmdline();
		tracing::info!("Running: {cmdline}");

		let start_time = Instant::now();
		let output = self.output(cmd)?;
		let stderr = String::from_utf8_lossy(&output.stderr);
		tracing::debug!(elapsed = ?start_time.elapsed(), %stderr, "Simulator finished");

		anyhow::ensure!(
			output.status.success(),
			"Simulator exited with {}: {}",
			output.status,
			stderr.trim()
		);

		Ok(String::from_utf8_lossy(&output.stdout).into_owned())
	}
}

/// Returns the simulator arguments for a run
pub fn args(run: &RunConfig, traces_dir: &Path) -> Vec<String> {
	vec![
		format!("--num_procs={}", run.num_procs),
		format!("--directory={}", traces_dir.display()),
		format!("--coherproto={}", run.protocol),
		format!("--cohertype={}", run.coherence_type),
		format!("--diropt={}", run.directory_optimization),
	]
}

/// Reads `pipe` to the end on a separate thread
fn drain(pipe: Option<impl Read + Send + 'static>) -> thread::JoinHandle<io::Result<Vec<u8>>> {
	thread::spawn(move || {
		let mut bytes = vec![];
		if let Some(mut pipe) = pipe {
			pipe.read_to_end(&mut bytes)?;
		}
		Ok(bytes)
	})
}
