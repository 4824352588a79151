//! Utilities for `mpceval`

// Modules
pub mod logger;

// Imports
use std::{cell::RefCell, fmt, process};

/// Extension trait for [`process::Command`] to render it as a command line
#[extend::ext(name = CommandLine)]
pub impl process::Command {
	/// Returns the program and all arguments, separated by spaces.
	///
	/// Non-utf8 arguments are converted lossily, so this is only
	/// meant for logging.
	fn cmdline(&self) -> String {
		std::iter::once(self.get_program())
			.chain(self.get_args())
			.map(|arg| arg.to_string_lossy())
			.collect::<Vec<_>>()
			.join(" ")
	}
}

/// [`fmt::Display`] helper to display using a `FnMut(&mut fmt::Formatter)`
pub struct DisplayWrapper<F: FnMut(&mut fmt::Formatter) -> fmt::Result>(RefCell<F>);

impl<F: FnMut(&mut fmt::Formatter) -> fmt::Result> DisplayWrapper<F> {
	/// Creates a new display wrapper
	#[must_use]
	pub const fn new(func: F) -> Self {
		Self(RefCell::new(func))
	}
}

impl<F: FnMut(&mut fmt::Formatter) -> fmt::Result> fmt::Display for DisplayWrapper<F> {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		// Note: `f` cannot be re-entrant, so this cannot fail
		self.0.borrow_mut()(f)
	}
}

#[cfg(test)]
mod tests {
	use {super::*, std::fmt::Write};

	#[test]
	fn cmdline_joins_program_and_args() {
		let mut cmd = process::Command::new("./mpcsim");
		cmd.arg("--num_procs=4").arg("--coherproto=MSI");
		assert_eq!(cmd.cmdline(), "./mpcsim --num_procs=4 --coherproto=MSI");
	}

	#[test]
	fn display_wrapper_calls_closure() {
		let mut calls = 0;
		let mut output = String::new();
		write!(
			output,
			"{}",
			DisplayWrapper::new(|f| {
				calls += 1;
				write!(f, "call")
			})
		)
		.expect("Writing to a string can't fail");
		assert_eq!(output, "call");
		assert_eq!(calls, 1);
	}
}
