//! Failures the [`Tree`](`crate::Tree`) isolates and hands to an [`ErrorReporter`].

use crate::host::HostError;
use core::{cell::RefCell, fmt::Debug};
use std::rc::Rc;
use tracing::error;

/// The error type components and function components fail with.
pub type BoxError = Box<dyn std::error::Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	/// A component's or function component's render failed.
	#[error("render failed: {0}")]
	Render(#[source] BoxError),
	#[error(transparent)]
	Host(#[from] HostError),
	#[error("depth limit {limit} exceeded at depth {depth}")]
	DepthLimit { depth: usize, limit: usize },
}

/// Receives errors that were isolated at an edge's render boundary or while patching a host node.
///
/// Implementations must not re-enter the [`Tree`](`crate::Tree`) synchronously.
pub trait ErrorReporter {
	fn report(&self, error: Error);
}
impl<F: Fn(Error)> ErrorReporter for F {
	fn report(&self, error: Error) {
		self(error)
	}
}

/// Logs each error through [`tracing::error!`]. This is the default.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;
impl ErrorReporter for TracingReporter {
	fn report(&self, error: Error) {
		error!("{}", error);
	}
}

/// Keeps each error. Clones share their storage.
#[derive(Debug, Clone, Default)]
pub struct CollectingReporter(Rc<RefCell<Vec<Error>>>);
impl CollectingReporter {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.0.borrow().len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.borrow().is_empty()
	}

	/// Removes and returns all errors collected so far.
	#[must_use]
	pub fn take(&self) -> Vec<Error> {
		self.0.borrow_mut().drain(..).collect()
	}

	/// The display messages of all errors collected so far.
	#[must_use]
	pub fn messages(&self) -> Vec<String> {
		self.0.borrow().iter().map(ToString::to_string).collect()
	}
}
impl ErrorReporter for CollectingReporter {
	fn report(&self, error: Error) {
		self.0.borrow_mut().push(error);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn host_errors_display_transparently() {
		let error = Error::from(HostError::new("set_attribute", "invalid name \"a b\""));
		assert_eq!(error.to_string(), "set_attribute failed: invalid name \"a b\"");
	}

	#[test]
	fn collecting_reporter_shares_storage() {
		let reporter = CollectingReporter::new();
		let clone = reporter.clone();
		clone.report(Error::DepthLimit { depth: 3, limit: 2 });
		assert_eq!(reporter.len(), 1);
		assert_eq!(reporter.messages(), vec!["depth limit 2 exceeded at depth 3".to_string()]);
		assert_eq!(reporter.take().len(), 1);
		assert!(clone.is_empty());
	}
}
