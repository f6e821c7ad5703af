//! The live tree that slots are rendered into.

use crate::slot::Handler;
use core::fmt::Debug;
use tracing::trace;

pub mod memory;
pub mod web;

/// A failed host primitive.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{operation} failed: {message}")]
pub struct HostError {
	pub operation: &'static str,
	pub message: String,
}
impl HostError {
	pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
		Self {
			operation,
			message: message.into(),
		}
	}
}

/// The host-tree primitives the [`Tree`](`crate::Tree`) needs.
///
/// The order of a parent's children must be stable between calls.
pub trait Host {
	/// A handle to one host node. Equality must be node identity.
	type Node: Clone + PartialEq + Debug + 'static;

	/// # Errors
	///
	/// Iff `tag` is not a valid element name for this host.
	fn create_element(&mut self, tag: &str) -> Result<Self::Node, HostError>;

	/// # Errors
	///
	/// Iff the host can't create text nodes.
	fn create_text(&mut self, text: &str) -> Result<Self::Node, HostError>;

	fn child_count(&self, parent: &Self::Node) -> usize;

	fn child_at(&self, parent: &Self::Node, index: usize) -> Option<Self::Node>;

	/// Moves `child` (from wherever it is) right before `reference`, which must be a child of `parent`.
	///
	/// # Errors
	///
	/// Iff `reference` isn't a child of `parent` or the insertion would create a cycle.
	fn insert_before(&mut self, parent: &Self::Node, child: &Self::Node, reference: &Self::Node) -> Result<(), HostError>;

	/// Moves `child` (from wherever it is) to the end of `parent`.
	///
	/// # Errors
	///
	/// Iff the insertion would create a cycle or `parent` can't have children.
	fn append_child(&mut self, parent: &Self::Node, child: &Self::Node) -> Result<(), HostError>;

	/// # Errors
	///
	/// Iff `child` isn't a child of `parent`.
	fn remove_child(&mut self, parent: &Self::Node, child: &Self::Node) -> Result<(), HostError>;

	/// # Errors
	///
	/// Iff `name` is not a valid attribute name or `element` isn't an element.
	fn set_attribute(&mut self, element: &Self::Node, name: &str, value: &str) -> Result<(), HostError>;

	/// # Errors
	///
	/// Iff `element` isn't an element.
	fn remove_attribute(&mut self, element: &Self::Node, name: &str) -> Result<(), HostError>;

	/// Assigns (or with [`None`] clears) the live handler property `name`.
	///
	/// # Errors
	///
	/// Iff the property can't be assigned.
	fn set_handler(&mut self, element: &Self::Node, name: &str, handler: Option<&Handler>) -> Result<(), HostError>;

	/// # Errors
	///
	/// Iff `node` isn't a text node.
	fn set_text(&mut self, node: &Self::Node, text: &str) -> Result<(), HostError>;
}

/// An insertion cursor into one host parent.
///
/// The index counts the host nodes placed under the parent so far during one pass and only ever increases.
#[derive(Debug, Clone)]
pub struct Target<N> {
	parent: N,
	index: usize,
}
impl<N: Clone + PartialEq + Debug> Target<N> {
	#[must_use]
	pub fn new(parent: N) -> Self {
		Self::at(parent, 0)
	}

	#[must_use]
	pub fn at(parent: N, index: usize) -> Self {
		Self { parent, index }
	}

	#[must_use]
	pub fn parent(&self) -> &N {
		&self.parent
	}

	#[must_use]
	pub fn index(&self) -> usize {
		self.index
	}

	/// Places `child` at the current index and advances it.
	///
	/// Nothing is moved if `child` already is at that position.
	///
	/// # Errors
	///
	/// Iff the host failed to insert `child`. The index doesn't advance in that case.
	pub fn insert<H: Host<Node = N>>(&mut self, host: &mut H, child: &N) -> Result<(), HostError> {
		match host.child_at(&self.parent, self.index) {
			Some(current) if current == *child => trace!("Node already in place at {}.", self.index),
			Some(current) => host.insert_before(&self.parent, child, &current)?,
			None => host.append_child(&self.parent, child)?,
		}
		self.index += 1;
		Ok(())
	}

	/// Removes `child` from the parent. The index is unaffected.
	///
	/// # Errors
	///
	/// Iff the host failed to remove `child`.
	pub fn remove<H: Host<Node = N>>(&self, host: &mut H, child: &N) -> Result<(), HostError> {
		host.remove_child(&self.parent, child)
	}

	/// Accounts for `count` host nodes that are already in place.
	pub fn advance(&mut self, count: usize) {
		self.index += count;
	}
}

#[cfg(test)]
mod tests {
	use super::{memory::MemoryHost, *};

	#[test]
	fn insert_only_moves_misplaced_nodes() {
		let (mut host, root) = MemoryHost::with_root("body");
		let a = host.create_text("a").unwrap();
		let b = host.create_text("b").unwrap();

		let mut target = Target::new(root);
		target.insert(&mut host, &a).unwrap();
		target.insert(&mut host, &b).unwrap();
		assert_eq!(target.index(), 2);
		assert_eq!(host.children(root), vec![a, b]);

		let before = host.mutation_count();
		let mut target = Target::new(root);
		target.insert(&mut host, &a).unwrap();
		target.insert(&mut host, &b).unwrap();
		assert_eq!(host.mutation_count(), before);

		let mut target = Target::new(root);
		target.insert(&mut host, &b).unwrap();
		assert_eq!(host.children(root), vec![b, a]);
		target.remove(&mut host, &a).unwrap();
		assert_eq!(target.index(), 1);
		assert_eq!(host.children(root), vec![b]);
	}
}
