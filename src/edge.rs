//! The reconciler's mutable tree nodes.

use crate::{
	component::Component,
	hooks::HookRuntime,
	slot::{Child, Slot},
};
use core::{
	cell::RefCell,
	fmt::{self, Debug, Formatter},
};
use std::rc::Rc;

slotmap::new_key_type! {
	/// Identifies an [`Edge`] within its [`Tree`](`crate::Tree`).
	pub struct EdgeId;
}

/// What an [`Edge`] materialized for its slot. Which variant is present follows from the slot's kind.
pub enum Artifact<N> {
	/// Fragments, empty children and edges whose first render failed before producing anything.
	None,
	Component(Rc<RefCell<dyn Component>>),
	Hooks(Rc<HookRuntime>),
	/// The single host node of an element or text edge.
	Node(N),
}
impl<N: Debug> Debug for Artifact<N> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Artifact::None => f.write_str("None"),
			Artifact::Component(_) => f.write_str("Component(..)"),
			Artifact::Hooks(hooks) => f.debug_tuple("Hooks").field(hooks).finish(),
			Artifact::Node(node) => f.debug_tuple("Node").field(node).finish(),
		}
	}
}

/// Pairs a [`Child`] with everything rendered for it.
#[derive(Debug)]
pub struct Edge<N> {
	pub(crate) child: Child,
	pub(crate) depth: usize,
	pub(crate) parent: Option<EdgeId>,
	pub(crate) children: Vec<EdgeId>,
	pub(crate) artifact: Artifact<N>,
	pub(crate) target_node_count: usize,
}
impl<N: Clone> Edge<N> {
	pub(crate) fn new(child: Child, depth: usize, parent: Option<EdgeId>) -> Self {
		Self {
			child,
			depth,
			parent,
			children: Vec::new(),
			artifact: Artifact::None,
			target_node_count: 0,
		}
	}

	#[must_use]
	pub fn child(&self) -> &Child {
		&self.child
	}

	#[must_use]
	pub fn slot(&self) -> Option<&Slot> {
		self.child.as_slot()
	}

	/// Distance from the root edge.
	#[must_use]
	pub fn depth(&self) -> usize {
		self.depth
	}

	#[must_use]
	pub fn parent(&self) -> Option<EdgeId> {
		self.parent
	}

	#[must_use]
	pub fn children(&self) -> &[EdgeId] {
		&self.children
	}

	#[must_use]
	pub fn artifact(&self) -> &Artifact<N> {
		&self.artifact
	}

	/// How many host nodes this edge's subtree currently contributes to its host parent.
	#[must_use]
	pub fn target_node_count(&self) -> usize {
		self.target_node_count
	}

	#[must_use]
	pub fn host_node(&self) -> Option<&N> {
		match &self.artifact {
			Artifact::Node(node) => Some(node),
			_ => None,
		}
	}

	#[must_use]
	pub fn component(&self) -> Option<&Rc<RefCell<dyn Component>>> {
		match &self.artifact {
			Artifact::Component(component) => Some(component),
			_ => None,
		}
	}

	#[must_use]
	pub fn hooks(&self) -> Option<&Rc<HookRuntime>> {
		match &self.artifact {
			Artifact::Hooks(hooks) => Some(hooks),
			_ => None,
		}
	}

	/// Whether there is a pending state change in this edge's component or hook runtime.
	#[must_use]
	pub fn needs_update(&self) -> bool {
		match &self.artifact {
			Artifact::Component(component) => component.borrow().needs_update(),
			Artifact::Hooks(hooks) => hooks.needs_update(),
			Artifact::None | Artifact::Node(_) => false,
		}
	}

	pub(crate) fn is_stateful(&self) -> bool {
		matches!(self.artifact, Artifact::Component(_) | Artifact::Hooks(_))
	}

	/// A shallow copy to diff against while this edge is re-rendered.
	pub(crate) fn snapshot(&self) -> EdgeSnapshot<N> {
		EdgeSnapshot {
			child: self.child.clone(),
			children: self.children.clone(),
			node: self.host_node().cloned(),
			target_node_count: self.target_node_count,
		}
	}
}

/// The previous state of an [`Edge`], taken right before it re-renders and dropped at the end of that pass.
///
/// The component or hook runtime stay with the edge itself, since they are reused either way.
#[derive(Debug, Clone)]
pub(crate) struct EdgeSnapshot<N> {
	pub(crate) child: Child,
	pub(crate) children: Vec<EdgeId>,
	pub(crate) node: Option<N>,
	pub(crate) target_node_count: usize,
}
impl<N> EdgeSnapshot<N> {
	pub(crate) fn slot(&self) -> Option<&Slot> {
		self.child.as_slot()
	}
}
