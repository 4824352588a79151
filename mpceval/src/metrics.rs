//! Metrics.
//!
//! Derives rates and ratios from raw results, and aggregates them by
//! any subset of the configuration dimensions.

// Imports
use {
	crate::{
		config::{CoherenceType, Protocol, RunConfig},
		data::{RawResult, ResultSet},
		pattern::Pattern,
	},
	anyhow::Context,
	itertools::Itertools,
	std::{fmt, fs, io, path::Path},
};

/// Returns `num / den`, or `0.0` if `den` is zero
pub fn ratio(num: u64, den: u64) -> f64 {
	match den {
		0 => 0.0,
		_ => num as f64 / den as f64,
	}
}

/// Sums counters, saturating at `u64::MAX`
pub fn saturating_sum(counters: impl IntoIterator<Item = u64>) -> u64 {
	counters.into_iter().fold(0, u64::saturating_add)
}

/// Metrics of a single run
#[derive(PartialEq, Clone, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct MetricRow {
	pub coherence_protocol: Protocol,
	pub coherence_type:     CoherenceType,
	pub num_procs:          usize,
	pub access_pattern:     Pattern,
	pub diropt:             bool,
	pub cache_line_size:    u64,
	pub num_accesses:       usize,

	pub total_hits:      u64,
	pub total_misses:    u64,
	pub total_evictions: u64,
	pub hit_rate:        f64,
	pub miss_rate:       f64,
	pub eviction_rate:   f64,

	pub total_traffic:               u64,
	pub cache_control_traffic:       u64,
	pub cache_data_traffic:          u64,
	pub memory_data_traffic:         u64,
	pub traffic_per_memory_op:       f64,
	pub data_to_total_traffic_ratio: f64,
}

impl MetricRow {
	/// Derives the metrics of a raw result.
	///
	/// Missing interconnect counters count as zero.
	pub fn from_raw(raw: &RawResult) -> Self {
		let total_hits = saturating_sum(raw.per_processor.iter().map(|proc| proc.hits));
		let total_misses = saturating_sum(raw.per_processor.iter().map(|proc| proc.misses));
		let total_evictions = saturating_sum(raw.per_processor.iter().map(|proc| proc.evictions));
		let total_memory_ops = total_hits.saturating_add(total_misses);

		let total_traffic = raw.interconnect.total_traffic.unwrap_or(0);
		let cache_data_traffic = raw.interconnect.cache_data_traffic.unwrap_or(0);

		Self {
			coherence_protocol: raw.config.protocol,
			coherence_type: raw.config.coherence_type,
			num_procs: raw.config.num_procs,
			access_pattern: raw.config.access_pattern,
			diropt: raw.config.directory_optimization,
			cache_line_size: raw.config.cache_line_size,
			num_accesses: raw.config.num_accesses,
			total_hits,
			total_misses,
			total_evictions,
			hit_rate: ratio(total_hits, total_memory_ops),
			miss_rate: ratio(total_misses, total_memory_ops),
			eviction_rate: ratio(total_evictions, total_memory_ops),
			total_traffic,
			cache_control_traffic: raw.interconnect.cache_control_traffic.unwrap_or(0),
			cache_data_traffic,
			memory_data_traffic: raw.interconnect.memory_data_traffic.unwrap_or(0),
			traffic_per_memory_op: ratio(total_traffic, total_memory_ops),
			data_to_total_traffic_ratio: ratio(cache_data_traffic, total_traffic),
		}
	}

	/// Returns the run configuration of this row
	pub fn run_config(&self) -> RunConfig {
		RunConfig {
			protocol:               self.coherence_protocol,
			coherence_type:         self.coherence_type,
			num_procs:              self.num_procs,
			access_pattern:         self.access_pattern,
			directory_optimization: self.diropt,
			cache_line_size:        self.cache_line_size,
			num_accesses:           self.num_accesses,
		}
	}
}

/// Derives the metrics of all results
pub fn rows(results: &ResultSet) -> Vec<MetricRow> {
	results.results().iter().map(MetricRow::from_raw).collect()
}

/// Writes rows as csv
pub fn write_csv<W: io::Write>(writer: W, rows: &[MetricRow]) -> Result<(), anyhow::Error> {
	let mut writer = csv::Writer::from_writer(writer);
	for row in rows {
		writer.serialize(row).context("Unable to write row")?;
	}
	writer.flush().context("Unable to flush rows")?;

	Ok(())
}

/// Writes rows as csv to `path`
pub fn write_csv_file(path: &Path, rows: &[MetricRow]) -> Result<(), anyhow::Error> {
	let file = fs::File::create(path).with_context(|| format!("Unable to create {path:?}"))?;
	write_csv(io::BufWriter::new(file), rows).with_context(|| format!("Unable to write {path:?}"))
}

/// Dimension to group rows by
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Dimension {
	Protocol,
	CoherenceType,
	NumProcs,
	AccessPattern,
	DirOpt,
}

impl Dimension {
	/// Returns this dimension's column name
	pub fn name(self) -> &'static str {
		match self {
			Self::Protocol => "coherence_protocol",
			Self::CoherenceType => "coherence_type",
			Self::NumProcs => "num_procs",
			Self::AccessPattern => "access_pattern",
			Self::DirOpt => "diropt",
		}
	}

	/// Returns the value of this dimension in `row`
	pub fn value(self, row: &MetricRow) -> DimensionValue {
		match self {
			Self::Protocol => DimensionValue::Protocol(row.coherence_protocol),
			Self::CoherenceType => DimensionValue::CoherenceType(row.coherence_type),
			Self::NumProcs => DimensionValue::NumProcs(row.num_procs),
			Self::AccessPattern => DimensionValue::AccessPattern(row.access_pattern),
			Self::DirOpt => DimensionValue::DirOpt(row.diropt),
		}
	}
}

/// Value of a [`Dimension`]
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash, Debug)]
pub enum DimensionValue {
	Protocol(Protocol),
	CoherenceType(CoherenceType),
	NumProcs(usize),
	AccessPattern(Pattern),
	DirOpt(bool),
}

impl fmt::Display for DimensionValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Protocol(protocol) => fmt::Display::fmt(protocol, f),
			Self::CoherenceType(coherence_type) => fmt::Display::fmt(coherence_type, f),
			Self::NumProcs(num_procs) => fmt::Display::fmt(num_procs, f),
			Self::AccessPattern(pattern) => fmt::Display::fmt(pattern, f),
			Self::DirOpt(diropt) => fmt::Display::fmt(diropt, f),
		}
	}
}

/// Numeric metric of a row
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Metric {
	TotalHits,
	TotalMisses,
	TotalEvictions,
	HitRate,
	MissRate,
	EvictionRate,
	TotalTraffic,
	CacheControlTraffic,
	CacheDataTraffic,
	MemoryDataTraffic,
	TrafficPerMemoryOp,
	DataToTotalTrafficRatio,
}

impl Metric {
	/// Returns this metric's column name
	pub fn name(self) -> &'static str {
		match self {
			Self::TotalHits => "total_hits",
			Self::TotalMisses => "total_misses",
			Self::TotalEvictions => "total_evictions",
			Self::HitRate => "hit_rate",
			Self::MissRate => "miss_rate",
			Self::EvictionRate => "eviction_rate",
			Self::TotalTraffic => "total_traffic",
			Self::CacheControlTraffic => "cache_control_traffic",
			Self::CacheDataTraffic => "cache_data_traffic",
			Self::MemoryDataTraffic => "memory_data_traffic",
			Self::TrafficPerMemoryOp => "traffic_per_memory_op",
			Self::DataToTotalTrafficRatio => "data_to_total_traffic_ratio",
		}
	}

	/// Returns the value of this metric in `row`
	pub fn value(self, row: &MetricRow) -> f64 {
		match self {
			Self::TotalHits => row.total_hits as f64,
			Self::TotalMisses => row.total_misses as f64,
			Self::TotalEvictions => row.total_evictions as f64,
			Self::HitRate => row.hit_rate,
			Self::MissRate => row.miss_rate,
			Self::EvictionRate => row.eviction_rate,
			Self::TotalTraffic => row.total_traffic as f64,
			Self::CacheControlTraffic => row.cache_control_traffic as f64,
			Self::CacheDataTraffic => row.cache_data_traffic as f64,
			Self::MemoryDataTraffic => row.memory_data_traffic as f64,
			Self::TrafficPerMemoryOp => row.traffic_per_memory_op,
			Self::DataToTotalTrafficRatio => row.data_to_total_traffic_ratio,
		}
	}

	/// Returns the mean of this metric over `rows`
	pub fn mean<'a>(self, rows: impl IntoIterator<Item = &'a MetricRow>) -> f64 {
		rows.into_iter()
			.map(|row| self.value(row))
			.collect::<average::Mean>()
			.mean()
	}

	/// Returns the sum of this metric over `rows`
	pub fn sum<'a>(self, rows: impl IntoIterator<Item = &'a MetricRow>) -> f64 {
		rows.into_iter().map(|row| self.value(row)).sum()
	}
}

/// Rows grouped by some dimensions, with the mean of some metrics
#[derive(Clone, Debug)]
pub struct GroupTable {
	/// Dimensions grouped by
	pub dimensions: Vec<Dimension>,

	/// Metrics averaged
	pub metrics: Vec<Metric>,

	/// Groups, sorted by key
	pub groups: Vec<Group>,
}

/// Group of a [`GroupTable`]
#[derive(PartialEq, Clone, Debug)]
pub struct Group {
	/// Dimension values, in the same order as the table's dimensions
	pub key: Vec<DimensionValue>,

	/// Number of rows in this group
	pub count: usize,

	/// Metric means, in the same order as the table's metrics
	pub means: Vec<f64>,
}

impl GroupTable {
	/// Groups `rows` by `dimensions` and averages `metrics` within each group
	pub fn new(rows: &[MetricRow], dimensions: &[Dimension], metrics: &[Metric]) -> Self {
		let groups = rows
			.iter()
			.into_group_map_by(|row| dimensions.iter().map(|dim| dim.value(row)).collect::<Vec<_>>())
			.into_iter()
			.sorted_by(|(lhs, _), (rhs, _)| lhs.cmp(rhs))
			.map(|(key, rows)| Group {
				count: rows.len(),
				means: metrics
					.iter()
					.map(|metric| metric.mean(rows.iter().copied()))
					.collect(),
				key,
			})
			.collect();

		Self {
			dimensions: dimensions.to_vec(),
			metrics: metrics.to_vec(),
			groups,
		}
	}

	/// Returns the group with key `key`
	pub fn get(&self, key: &[DimensionValue]) -> Option<&Group> {
		self.groups.iter().find(|group| group.key == key)
	}

	/// Writes this table as csv
	pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<(), anyhow::Error> {
		let mut writer = csv::Writer::from_writer(writer);

		let header = self
			.dimensions
			.iter()
			.map(|dim| dim.name())
			.chain(["count"])
			.chain(self.metrics.iter().map(|metric| metric.name()));
		writer.write_record(header).context("Unable to write header")?;

		for group in &self.groups {
			let record = group
				.key
				.iter()
				.map(DimensionValue::to_string)
				.chain([group.count.to_string()])
				.chain(group.means.iter().map(f64::to_string));
			writer.write_record(record).context("Unable to write group")?;
		}
		writer.flush().context("Unable to flush groups")?;

		Ok(())
	}
}
