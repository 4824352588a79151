//! Simulator report parsing.
//!
//! The report is free text, so every block is extracted if present and
//! defaulted otherwise. Parsing never fails.

// Imports
use {
	crate::data::{InterconnectStats, ProcessorStats, ReportEcho},
	once_cell::sync::Lazy,
	regex::{Captures, Regex},
	std::str::FromStr,
};

/// Parsed simulator report
#[derive(PartialEq, Eq, Clone, Default, Debug)]
pub struct Report {
	/// Processor blocks, in report order
	pub processors: Vec<ProcessorStats>,

	/// Interconnect block
	pub interconnect: InterconnectStats,

	/// Configuration echo block
	pub echo: Option<ReportEcho>,
}

static PROCESSOR_REGEX: Lazy<Regex> = Lazy::new(|| {
	Regex::new(r"PROCESSOR (\d+)\r?\nHITS:\s+(\d+)\r?\nMISSES:\s+(\d+)\r?\nCOHERENCE:\s+(\d+)")
		.expect("Processor regex is valid")
});

static INTERCONNECT_REGEX: Lazy<Regex> = Lazy::new(|| {
	Regex::new(
		r"INTERCONNECT\r?\nTRAFFIC:\s+(\d+)\r?\nCACHE CONTROL TRAFFIC:\s+(\d+)\r?\nCACHE DATA TRAFFIC:\s+(\d+)\r?\nMEMORY DATA TRAFFIC:\s+(\d+)",
	)
	.expect("Interconnect regex is valid")
});

static ECHO_REGEX: Lazy<Regex> = Lazy::new(|| {
	Regex::new(
		r"No of Processors: (\d+)\r?\nDirectory: (.*?)\r?\nCoherence Type: (.*?)\r?\nCoherence Protocol: (.*?)\r?\nCache Line Size: (\d+)\r?\nCache Size: (\d+)",
	)
	.expect("Echo regex is valid")
});

/// Parses a simulator report
pub fn parse(output: &str) -> Report {
	// Note: A block whose counters don't fit a `u64` is dropped like any other malformed block.
	let processors = PROCESSOR_REGEX
		.captures_iter(output)
		.filter_map(|captures| {
			Some(ProcessorStats {
				id:        capture(&captures, 1)?,
				hits:      capture(&captures, 2)?,
				misses:    capture(&captures, 3)?,
				evictions: capture(&captures, 4)?,
			})
		})
		.collect::<Vec<_>>();

	let interconnect = INTERCONNECT_REGEX
		.captures(output)
		.and_then(|captures| {
			Some(InterconnectStats {
				total_traffic:         Some(capture(&captures, 1)?),
				cache_control_traffic: Some(capture(&captures, 2)?),
				cache_data_traffic:    Some(capture(&captures, 3)?),
				memory_data_traffic:   Some(capture(&captures, 4)?),
			})
		})
		.unwrap_or_default();

	let echo = ECHO_REGEX.captures(output).and_then(|captures| {
		Some(ReportEcho {
			num_procs:          capture(&captures, 1)?,
			directory:          capture(&captures, 2)?,
			coherence_type:     capture(&captures, 3)?,
			coherence_protocol: capture(&captures, 4)?,
			cache_line_size:    capture(&captures, 5)?,
			cache_size:         capture(&captures, 6)?,
		})
	});

	tracing::trace!(
		processors = processors.len(),
		has_interconnect = !interconnect.is_empty(),
		has_echo = echo.is_some(),
		"Parsed report"
	);

	Report {
		processors,
		interconnect,
		echo,
	}
}

/// Parses capture group `idx`
fn capture<T: FromStr>(captures: &Captures, idx: usize) -> Option<T> {
	captures.get(idx)?.as_str().trim().parse().ok()
}

#[cfg(test)]
mod tests {
	use {super::*, pretty_assertions::assert_eq};

	const PROCESSOR_0: &str = "PROCESSOR 0\nHITS:\t\t80\nMISSES:\t\t20\nCOHERENCE:\t5\n----------------------------------\n";
	const INTERCONNECT: &str = "INTERCONNECT\nTRAFFIC:\t120\nCACHE CONTROL TRAFFIC:\t70\nCACHE DATA TRAFFIC:\t40\nMEMORY DATA TRAFFIC:\t10\n";

	#[test]
	fn processor_and_interconnect() {
		let report = parse(&format!("{PROCESSOR_0}{INTERCONNECT}"));
		assert_eq!(report.processors, [ProcessorStats {
			id:        0,
			hits:      80,
			misses:    20,
			evictions: 5,
		}]);
		assert_eq!(report.interconnect, InterconnectStats {
			total_traffic:         Some(120),
			cache_control_traffic: Some(70),
			cache_data_traffic:    Some(40),
			memory_data_traffic:   Some(10),
		});
		assert_eq!(report.echo, None);
	}

	#[test]
	fn missing_interconnect_is_empty() {
		let report = parse(PROCESSOR_0);
		assert_eq!(report.processors.len(), 1);
		assert!(report.interconnect.is_empty());
	}

	#[test]
	fn empty_output() {
		assert_eq!(parse(""), Report::default());
	}

	#[test]
	fn malformed_processor_blocks_are_omitted() {
		let output = format!(
			"PROCESSOR 1\nHITS:\t\t3\nCOHERENCE:\t0\nPROCESSOR 2\nHITS:\t\tmany\nMISSES:\t\t1\nCOHERENCE:\t0\n{PROCESSOR_0}"
		);
		let report = parse(&output);
		assert_eq!(report.processors.len(), 1);
		assert_eq!(report.processors[0].id, 0);
	}

	#[test]
	fn ids_are_not_validated() {
		let output = format!("{PROCESSOR_0}{}", PROCESSOR_0.replace("PROCESSOR 0", "PROCESSOR 7"));
		let ids = parse(&output)
			.processors
			.iter()
			.map(|proc| proc.id)
			.collect::<Vec<_>>();
		assert_eq!(ids, [0, 7]);
	}

	#[test]
	fn config_echo() {
		let output = [
			"No of Processors: 8",
			"Directory: traces_temp",
			"Coherence Type: SNOOP",
			"Coherence Protocol: MESI",
			"Cache Line Size: 64",
			"Cache Size: 8192",
		]
		.join("\n");
		assert_eq!(
			parse(&output).echo,
			Some(ReportEcho {
				num_procs:          8,
				directory:          "traces_temp".to_owned(),
				coherence_type:     "SNOOP".to_owned(),
				coherence_protocol: "MESI".to_owned(),
				cache_line_size:    64,
				cache_size:         8192,
			})
		);
	}

	#[test]
	fn crlf_line_endings() {
		let report = parse(&format!("{PROCESSOR_0}{INTERCONNECT}").replace('\n', "\r\n"));
		assert_eq!(report.processors.len(), 1);
		assert_eq!(report.interconnect.total_traffic, Some(120));
	}
}
