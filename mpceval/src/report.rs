//! Reports.
//!
//! Everything here is computed from [`MetricRow`]s only.

// Imports
use {
	crate::{
		config::{CoherenceType, Protocol},
		metrics::{self, Dimension, GroupTable, Metric, MetricRow},
	},
	anyhow::Context,
	itertools::Itertools,
	std::{
		collections::BTreeMap,
		fmt,
		fs,
		io::{self, Write},
		path::Path,
	},
};

/// Metrics csv file name
pub const METRICS_FILE_NAME: &str = "processed_results.csv";

/// Protocol analysis directory name
pub const PROTOCOL_ANALYSIS_DIR_NAME: &str = "protocol_analysis";

/// Protocol analysis file name
pub const PROTOCOL_ANALYSIS_FILE_NAME: &str = "protocol_analysis.json";

/// Tables directory name
pub const TABLES_DIR_NAME: &str = "tables";

/// Summary of a protocol across all of its rows
#[derive(PartialEq, Clone, Copy, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct ProtocolSummary {
	pub avg_hit_rate:          f64,
	pub avg_traffic:           f64,
	pub avg_evictions:         f64,
	/// Total cache data traffic over total cache control traffic
	pub data_to_control_ratio: f64,
}

/// Summarizes every protocol in `rows`
pub fn protocol_summary(rows: &[MetricRow]) -> BTreeMap<Protocol, ProtocolSummary> {
	rows.iter()
		.into_group_map_by(|row| row.coherence_protocol)
		.into_iter()
		.map(|(protocol, rows)| {
			let data_traffic = metrics::saturating_sum(rows.iter().map(|row| row.cache_data_traffic));
			let control_traffic = metrics::saturating_sum(rows.iter().map(|row| row.cache_control_traffic));
			let summary = ProtocolSummary {
				avg_hit_rate:          Metric::HitRate.mean(rows.iter().copied()),
				avg_traffic:           Metric::TotalTraffic.mean(rows.iter().copied()),
				avg_evictions:         Metric::TotalEvictions.mean(rows.iter().copied()),
				data_to_control_ratio: metrics::ratio(data_traffic, control_traffic),
			};

			(protocol, summary)
		})
		.collect()
}

/// Formats a protocol summary, one protocol per line
pub fn fmt_protocol_summary(
	f: &mut fmt::Formatter<'_>,
	summary: &BTreeMap<Protocol, ProtocolSummary>,
) -> fmt::Result {
	for (protocol, summary) in summary {
		writeln!(
			f,
			"{protocol:>6}: hit rate {:.4}, traffic {:.2}, evictions {:.2}, data/control {:.4}",
			summary.avg_hit_rate, summary.avg_traffic, summary.avg_evictions, summary.data_to_control_ratio
		)?;
	}

	Ok(())
}

/// Grouped table to report
#[derive(Clone, Copy)]
pub struct TableSpec {
	/// Name, used as the file stem
	pub name: &'static str,

	/// Which rows to include
	pub filter: fn(&MetricRow) -> bool,

	/// Dimensions to group by
	pub dimensions: &'static [Dimension],

	/// Metrics to average
	pub metrics: &'static [Metric],
}

impl TableSpec {
	/// Builds this table from `rows`
	pub fn build(&self, rows: &[MetricRow]) -> GroupTable {
		let rows = rows.iter().filter(|row| (self.filter)(row)).cloned().collect::<Vec<_>>();
		GroupTable::new(&rows, self.dimensions, self.metrics)
	}
}

fn all_rows(_: &MetricRow) -> bool {
	true
}

fn snoop_rows(row: &MetricRow) -> bool {
	row.coherence_type == CoherenceType::Snoop
}

fn directory_rows(row: &MetricRow) -> bool {
	row.coherence_type == CoherenceType::Directory
}

/// Processor count the eviction comparison is made at
pub const EVICTIONS_NUM_PROCS: usize = 8;

fn eviction_rows(row: &MetricRow) -> bool {
	row.num_procs == EVICTIONS_NUM_PROCS
}

/// All reported tables
pub const TABLES: &[TableSpec] = &[
	TableSpec {
		name:       "hit_rate_by_protocol_pattern",
		filter:     all_rows,
		dimensions: &[Dimension::Protocol, Dimension::AccessPattern],
		metrics:    &[Metric::HitRate],
	},
	TableSpec {
		name:       "traffic_by_protocol_pattern",
		filter:     all_rows,
		dimensions: &[Dimension::Protocol, Dimension::AccessPattern],
		metrics:    &[Metric::TotalTraffic],
	},
	TableSpec {
		name:       "scalability",
		filter:     all_rows,
		dimensions: &[
			Dimension::AccessPattern,
			Dimension::Protocol,
			Dimension::CoherenceType,
			Dimension::DirOpt,
			Dimension::NumProcs,
		],
		metrics:    &[Metric::TotalTraffic],
	},
	TableSpec {
		name:       "traffic_breakdown",
		filter:     all_rows,
		dimensions: &[Dimension::Protocol, Dimension::NumProcs, Dimension::CoherenceType],
		metrics:    &[
			Metric::CacheControlTraffic,
			Metric::CacheDataTraffic,
			Metric::MemoryDataTraffic,
		],
	},
	TableSpec {
		name:       "snooping_vs_directory",
		filter:     all_rows,
		dimensions: &[Dimension::Protocol, Dimension::CoherenceType],
		metrics:    &[Metric::TotalTraffic],
	},
	TableSpec {
		name:       "directory_optimization",
		filter:     directory_rows,
		dimensions: &[Dimension::AccessPattern, Dimension::NumProcs, Dimension::DirOpt],
		metrics:    &[
			Metric::TotalTraffic,
			Metric::CacheControlTraffic,
			Metric::CacheDataTraffic,
		],
	},
	TableSpec {
		name:       "traffic_efficiency",
		filter:     all_rows,
		dimensions: &[Dimension::Protocol, Dimension::AccessPattern],
		metrics:    &[Metric::TrafficPerMemoryOp],
	},
	TableSpec {
		name:       "evictions_by_pattern",
		filter:     eviction_rows,
		dimensions: &[Dimension::AccessPattern, Dimension::Protocol],
		metrics:    &[Metric::TotalEvictions],
	},
	TableSpec {
		name:       "rates_by_pattern",
		filter:     snoop_rows,
		dimensions: &[Dimension::AccessPattern, Dimension::Protocol],
		metrics:    &[Metric::HitRate, Metric::MissRate, Metric::EvictionRate],
	},
];

/// Writes a protocol summary as json
pub fn write_protocol_summary<W: io::Write>(
	writer: W,
	summary: &BTreeMap<Protocol, ProtocolSummary>,
) -> Result<(), anyhow::Error> {
	let mut writer = io::BufWriter::new(writer);
	serde_json::to_writer_pretty(&mut writer, summary).context("Unable to serialize summary")?;
	writer.flush().context("Unable to flush summary")?;

	Ok(())
}

/// Writes all reports for `rows` under `output_dir`.
///
/// Returns the protocol summary.
pub fn write_all(output_dir: &Path, rows: &[MetricRow]) -> Result<BTreeMap<Protocol, ProtocolSummary>, anyhow::Error> {
	metrics::write_csv_file(&output_dir.join(METRICS_FILE_NAME), rows).context("Unable to write metrics")?;

	let summary = protocol_summary(rows);
	{
		let analysis_dir = output_dir.join(PROTOCOL_ANALYSIS_DIR_NAME);
		fs::create_dir_all(&analysis_dir).with_context(|| format!("Unable to create {analysis_dir:?}"))?;

		let path = analysis_dir.join(PROTOCOL_ANALYSIS_FILE_NAME);
		let file = fs::File::create(&path).with_context(|| format!("Unable to create {path:?}"))?;
		write_protocol_summary(file, &summary).with_context(|| format!("Unable to write {path:?}"))?;
	}

	let tables_dir = output_dir.join(TABLES_DIR_NAME);
	fs::create_dir_all(&tables_dir).with_context(|| format!("Unable to create {tables_dir:?}"))?;
	for table in TABLES {
		let groups = table.build(rows);

		// Note: The sweep may not have covered this table, e.g. without any directory runs
		if groups.groups.is_empty() {
			tracing::debug!(table = table.name, "Skipping empty table");
			continue;
		}

		let path = tables_dir.join(format!("{}.csv", table.name));
		let file = fs::File::create(&path).with_context(|| format!("Unable to create {path:?}"))?;
		groups
			.write_csv(io::BufWriter::new(file))
			.with_context(|| format!("Unable to write {path:?}"))?;
		tracing::debug!(?path, groups = groups.groups.len(), "Wrote table");
	}

	Ok(summary)
}
