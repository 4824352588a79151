//! Locality model
//!
//! Biases a stream of addresses towards recently used ones.

// Imports
use {
	rand::{seq::SliceRandom, Rng},
	std::collections::VecDeque,
};

/// Locality model
///
/// Keeps the last `window` emitted addresses and, with probability `reuse_prob`,
/// emits one of them instead of a fresh address.
#[derive(Clone, Debug)]
pub struct Locality {
	/// History window
	window: usize,

	/// Reuse probability
	reuse_prob: f64,

	/// History, oldest first
	history: VecDeque<u64>,
}

impl Locality {
	/// Creates a new, empty, locality model
	///
	/// # Panics
	/// Panics if `reuse_prob` isn't within `0.0..=1.0`.
	pub fn new(window: usize, reuse_prob: f64) -> Self {
		assert!(
			(0.0..=1.0).contains(&reuse_prob),
			"Reuse probability must be within 0..=1, found {reuse_prob}"
		);

		Self {
			window,
			reuse_prob,
			history: VecDeque::with_capacity(window + 1),
		}
	}

	/// Returns the next address.
	///
	/// If the history is empty, or the reuse roll fails, `fresh` is called to
	/// produce the address instead.
	pub fn next_addr<R: Rng>(&mut self, rng: &mut R, fresh: impl FnOnce(&mut R) -> u64) -> u64 {
		let reused = match self.history.is_empty() {
			true => None,
			false => match rng.gen_bool(self.reuse_prob) {
				true => self.history.make_contiguous().choose(rng).copied(),
				false => None,
			},
		};
		let addr = reused.unwrap_or_else(|| fresh(rng));

		// Note: Eviction is by insertion order, reusing an address doesn't refresh it.
		self.history.push_back(addr);
		if self.history.len() > self.window {
			self.history.pop_front();
		}

		addr
	}

	/// Returns the history, oldest first
	pub fn history(&self) -> impl Iterator<Item = u64> + '_ {
		self.history.iter().copied()
	}
}
