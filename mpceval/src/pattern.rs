//! Access patterns.
//!
//! Each pattern synthesizes one access sequence per processor, exhibiting
//! a specific kind of sharing between them. All addresses go through a
//! [`Locality`] model, so reuse is bursty rather than uniform.

// Imports
use {
	crate::{
		locality::Locality,
		trace::{AccessEvent, AccessKind},
	},
	rand::{seq::index, Rng},
	std::fmt,
};

/// Access pattern
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
#[derive(clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Pattern {
	/// Every processor touches its own bytes of the same cache line
	#[value(name = "false_sharing")]
	FalseSharing,

	/// Processor 0 writes a shared pool that everyone else reads
	#[value(name = "producer_consumer")]
	ProducerConsumer,

	/// All processors read and write a tiny shared pool
	#[value(name = "multiple_writers")]
	MultipleWriters,

	/// All processors only read a shared pool
	#[value(name = "multiple_readers")]
	MultipleReaders,

	/// Each processor has a private pool
	#[value(name = "no_sharing")]
	NoSharing,

	/// Random word-aligned addresses and kinds
	#[value(name = "random")]
	Random,

	/// Only a quarter of the processors access a shared pool
	#[value(name = "partial_proc_use")]
	PartialProcUse,
}

impl Pattern {
	/// All patterns
	pub const ALL: [Self; 7] = [
		Self::FalseSharing,
		Self::ProducerConsumer,
		Self::MultipleWriters,
		Self::MultipleReaders,
		Self::NoSharing,
		Self::Random,
		Self::PartialProcUse,
	];

	/// Returns this pattern's name
	pub fn as_str(self) -> &'static str {
		match self {
			Self::FalseSharing => "false_sharing",
			Self::ProducerConsumer => "producer_consumer",
			Self::MultipleWriters => "multiple_writers",
			Self::MultipleReaders => "multiple_readers",
			Self::NoSharing => "no_sharing",
			Self::Random => "random",
			Self::PartialProcUse => "partial_proc_use",
		}
	}

	/// Generates the access sequence of every processor
	pub fn generate<R: Rng>(self, params: &Params, rng: &mut R) -> Vec<Vec<AccessEvent>> {
		match self {
			Self::FalseSharing => false_sharing(params, rng),
			Self::ProducerConsumer => producer_consumer(params, rng),
			Self::MultipleWriters => multiple_writers(params, rng),
			Self::MultipleReaders => multiple_readers(params, rng),
			Self::NoSharing => no_sharing(params, rng),
			Self::Random => random(params, rng),
			Self::PartialProcUse => partial_proc_use(params, rng),
		}
	}
}

impl fmt::Display for Pattern {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.pad(self.as_str())
	}
}

/// Generation parameters
#[derive(Clone, Copy, Debug)]
pub struct Params {
	pub num_procs:       usize,
	pub num_accesses:    usize,
	pub cache_line_size: u64,
}

/// Base address of the false sharing cache line
pub const FALSE_SHARING_BASE: u64 = 0;

/// Byte offset between processors in the false sharing cache line
pub const FALSE_SHARING_STRIDE: u64 = 8;

/// Size of the random pattern's address range
pub const RANDOM_ADDR_RANGE: u64 = 512;

/// Fraction of processors active in the partial pattern
pub const PARTIAL_ACTIVE_FRACTION: f64 = 0.25;

/// Generates a single processor's sequence.
///
/// `kind` and `fresh` receive the access index.
fn sequence<R: Rng>(
	rng: &mut R,
	num_accesses: usize,
	mut locality: Locality,
	mut fresh: impl FnMut(&mut R, usize) -> u64,
	mut kind: impl FnMut(&mut R, usize) -> AccessKind,
) -> Vec<AccessEvent> {
	(0..num_accesses)
		.map(|idx| {
			let addr = locality.next_addr(rng, |rng| fresh(rng, idx));
			let kind = kind(rng, idx);
			AccessEvent { kind, addr }
		})
		.collect()
}

/// Picks a uniformly random address from `pool`
fn pick<R: Rng>(rng: &mut R, pool: &[u64]) -> u64 {
	pool[rng.gen_range(0..pool.len())]
}

/// Builds a pool of `len` addresses, `stride` apart from `base`
fn pool(base: u64, stride: u64, len: u64) -> Vec<u64> {
	(0..len).map(|idx| base + idx * stride).collect()
}

fn false_sharing<R: Rng>(params: &Params, rng: &mut R) -> Vec<Vec<AccessEvent>> {
	(0..params.num_procs as u64)
		.map(|proc| {
			let addr = FALSE_SHARING_BASE + proc * FALSE_SHARING_STRIDE;
			sequence(
				rng,
				params.num_accesses,
				Locality::new(3, 0.7),
				|_, _| addr,
				|_, idx| AccessKind::alternating(idx),
			)
		})
		.collect()
}

fn no_sharing<R: Rng>(params: &Params, rng: &mut R) -> Vec<Vec<AccessEvent>> {
	(0..params.num_procs as u64)
		.map(|proc| {
			let pool = pool(proc * 1000, params.cache_line_size, 10);
			sequence(
				rng,
				params.num_accesses,
				Locality::new(3, 0.7),
				|rng, _| pick(rng, &pool),
				|_, idx| match idx % 3 {
					1 => AccessKind::Store,
					_ => AccessKind::Load,
				},
			)
		})
		.collect()
}

fn producer_consumer<R: Rng>(params: &Params, rng: &mut R) -> Vec<Vec<AccessEvent>> {
	let pool = pool(100, params.cache_line_size, 10);

	// Note: Both sides walk the pool in order when not reusing, so consumers
	//       tend to read what the producer wrote around the same time.
	(0..params.num_procs)
		.map(|proc| {
			let (reuse_prob, kind) = match proc {
				0 => (0.6, AccessKind::Store),
				_ => (0.7, AccessKind::Load),
			};
			sequence(
				rng,
				params.num_accesses,
				Locality::new(3, reuse_prob),
				|_, idx| pool[idx % pool.len()],
				|_, _| kind,
			)
		})
		.collect()
}

fn multiple_writers<R: Rng>(params: &Params, rng: &mut R) -> Vec<Vec<AccessEvent>> {
	let pool = pool(150, 4, 3);
	(0..params.num_procs)
		.map(|_| {
			sequence(
				rng,
				params.num_accesses,
				Locality::new(3, 0.8),
				|rng, _| pick(rng, &pool),
				|_, idx| AccessKind::alternating(idx),
			)
		})
		.collect()
}

fn multiple_readers<R: Rng>(params: &Params, rng: &mut R) -> Vec<Vec<AccessEvent>> {
	let pool = pool(200, params.cache_line_size, 5);
	(0..params.num_procs)
		.map(|_| {
			sequence(
				rng,
				params.num_accesses,
				Locality::new(3, 0.75),
				|rng, _| pick(rng, &pool),
				|_, _| AccessKind::Load,
			)
		})
		.collect()
}

fn random<R: Rng>(params: &Params, rng: &mut R) -> Vec<Vec<AccessEvent>> {
	(0..params.num_procs)
		.map(|_| {
			sequence(
				rng,
				params.num_accesses,
				Locality::new(5, 0.65),
				|rng, _| 4 * rng.gen_range(0..RANDOM_ADDR_RANGE / 4),
				|rng, _| match rng.gen_bool(0.5) {
					true => AccessKind::Load,
					false => AccessKind::Store,
				},
			)
		})
		.collect()
}

/// Returns the number of active processors in the partial pattern
pub fn partial_active_procs(num_procs: usize) -> usize {
	let active = (num_procs as f64 * PARTIAL_ACTIVE_FRACTION).round() as usize;
	active.max(1).min(num_procs)
}

fn partial_proc_use<R: Rng>(params: &Params, rng: &mut R) -> Vec<Vec<AccessEvent>> {
	let active = index::sample(rng, params.num_procs, partial_active_procs(params.num_procs));
	tracing::debug!(active = ?active.iter().collect::<Vec<_>>(), "Selected active processors");

	let pool = pool(1000, params.cache_line_size, 5);
	let mut traces = vec![vec![]; params.num_procs];
	for proc in active.into_iter() {
		traces[proc] = sequence(
			rng,
			params.num_accesses,
			Locality::new(3, 0.7),
			|rng, _| pick(rng, &pool),
			|_, idx| AccessKind::alternating(idx),
		);
	}

	traces
}

#[cfg(test)]
mod tests {
	use {
		super::*,
		rand::{rngs::StdRng, SeedableRng},
		std::collections::HashSet,
	};

	const PARAMS: Params = Params {
		num_procs:       8,
		num_accesses:    200,
		cache_line_size: 64,
	};

	fn generate(pattern: Pattern, params: &Params) -> Vec<Vec<AccessEvent>> {
		pattern.generate(params, &mut StdRng::seed_from_u64(42))
	}

	#[test]
	fn one_trace_per_processor() {
		for pattern in Pattern::ALL {
			for num_procs in [1, 4, 16] {
				let params = Params { num_procs, ..PARAMS };
				assert_eq!(generate(pattern, &params).len(), num_procs, "{pattern} with {num_procs} processors");
			}
		}
	}

	#[test]
	fn deterministic_given_seed() {
		for pattern in Pattern::ALL {
			assert_eq!(generate(pattern, &PARAMS), generate(pattern, &PARAMS), "{pattern}");
		}
	}

	#[test]
	fn false_sharing_stays_on_own_offset() {
		let traces = generate(Pattern::FalseSharing, &PARAMS);
		for (proc, events) in traces.iter().enumerate() {
			let addrs = events.iter().map(|event| event.addr).collect::<HashSet<_>>();
			let own = FALSE_SHARING_BASE + proc as u64 * FALSE_SHARING_STRIDE;
			assert_eq!(addrs, HashSet::from([own]), "Processor {proc}");

			assert!(events
				.iter()
				.enumerate()
				.all(|(idx, event)| event.kind == AccessKind::alternating(idx)));
		}
	}

	#[test]
	fn producer_consumer_kinds() {
		let traces = generate(Pattern::ProducerConsumer, &PARAMS);
		assert!(traces[0].iter().all(|event| event.kind == AccessKind::Store));
		for events in &traces[1..] {
			assert!(events.iter().all(|event| event.kind == AccessKind::Load));
		}

		let pool = pool(100, PARAMS.cache_line_size, 10);
		assert!(traces.iter().flatten().all(|event| pool.contains(&event.addr)));
	}

	#[test]
	fn multiple_readers_only_load() {
		let traces = generate(Pattern::MultipleReaders, &PARAMS);
		assert!(traces.iter().flatten().all(|event| event.kind == AccessKind::Load));
	}

	#[test]
	fn multiple_writers_share_small_pool() {
		let traces = generate(Pattern::MultipleWriters, &PARAMS);
		assert!(traces
			.iter()
			.flatten()
			.all(|event| [150, 154, 158].contains(&event.addr)));
	}

	#[test]
	fn no_sharing_pools_are_private() {
		let traces = generate(Pattern::NoSharing, &PARAMS);
		for (proc, events) in traces.iter().enumerate() {
			let pool = pool(proc as u64 * 1000, PARAMS.cache_line_size, 10);
			assert!(events.iter().all(|event| pool.contains(&event.addr)));
			assert!(events.iter().enumerate().all(|(idx, event)| match idx % 3 {
				1 => event.kind == AccessKind::Store,
				_ => event.kind == AccessKind::Load,
			}));
		}
	}

	#[test]
	fn random_addresses_are_aligned_and_bounded() {
		let traces = generate(Pattern::Random, &PARAMS);
		assert!(traces
			.iter()
			.flatten()
			.all(|event| event.addr % 4 == 0 && event.addr < RANDOM_ADDR_RANGE));

		let kinds = traces.iter().flatten().map(|event| event.kind).collect::<HashSet<_>>();
		assert_eq!(kinds.len(), 2);
	}

	#[test]
	fn partial_proc_use_active_count() {
		for num_procs in [1, 2, 3, 4, 6, 8, 10, 16, 64] {
			let params = Params { num_procs, ..PARAMS };
			let traces = generate(Pattern::PartialProcUse, &params);
			let expected = ((0.25 * num_procs as f64).round() as usize).max(1);

			assert_eq!(traces.len(), num_procs);
			assert_eq!(
				traces.iter().filter(|events| !events.is_empty()).count(),
				expected,
				"{num_procs} processors"
			);
			assert!(traces
				.iter()
				.filter(|events| !events.is_empty())
				.all(|events| events.len() == params.num_accesses));
		}
	}
}
