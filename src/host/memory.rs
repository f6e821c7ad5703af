//! An in-memory host tree with DOM-like semantics.
//!
//! Useful wherever no browser is available, and for checking exactly which primitives a render pass used.

use super::{Host, HostError};
use crate::slot::Handler;
use core::{any::Any, fmt::Write as _};
use hashbrown::HashMap;
use tracing::trace;

/// A node handle of a [`MemoryHost`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemoryNode(usize);

/// One mutating primitive call, as recorded by a [`MemoryHost`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
	CreateElement(MemoryNode),
	CreateText(MemoryNode),
	Insert { parent: MemoryNode, child: MemoryNode },
	Remove { parent: MemoryNode, child: MemoryNode },
	SetAttribute { element: MemoryNode, name: String },
	RemoveAttribute { element: MemoryNode, name: String },
	SetHandler { element: MemoryNode, name: String, present: bool },
	SetText(MemoryNode),
}

#[derive(Debug)]
enum Data {
	Element {
		tag: String,
		attributes: Vec<(String, String)>,
		handlers: HashMap<String, Handler>,
		children: Vec<MemoryNode>,
	},
	Text(String),
}

#[derive(Debug)]
struct NodeEntry {
	parent: Option<MemoryNode>,
	data: Data,
}

#[derive(Debug, Default)]
pub struct MemoryHost {
	nodes: Vec<NodeEntry>,
	mutations: Vec<Mutation>,
}
impl MemoryHost {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// A new host with one detached element to mount into. Its creation isn't logged.
	#[must_use]
	pub fn with_root(tag: &str) -> (Self, MemoryNode) {
		let mut host = Self::new();
		let root = host.push(Data::Element {
			tag: tag.to_owned(),
			attributes: Vec::new(),
			handlers: HashMap::new(),
			children: Vec::new(),
		});
		(host, root)
	}

	#[must_use]
	pub fn mutations(&self) -> &[Mutation] {
		&self.mutations
	}

	#[must_use]
	pub fn mutation_count(&self) -> usize {
		self.mutations.len()
	}

	pub fn clear_mutations(&mut self) {
		self.mutations.clear();
	}

	#[must_use]
	pub fn parent(&self, node: MemoryNode) -> Option<MemoryNode> {
		self.entry(node).and_then(|entry| entry.parent)
	}

	#[must_use]
	pub fn children(&self, node: MemoryNode) -> Vec<MemoryNode> {
		match self.entry(node).map(|entry| &entry.data) {
			Some(Data::Element { children, .. }) => children.clone(),
			_ => Vec::new(),
		}
	}

	#[must_use]
	pub fn tag(&self, node: MemoryNode) -> Option<&str> {
		match self.entry(node).map(|entry| &entry.data) {
			Some(Data::Element { tag, .. }) => Some(tag),
			_ => None,
		}
	}

	#[must_use]
	pub fn text(&self, node: MemoryNode) -> Option<&str> {
		match self.entry(node).map(|entry| &entry.data) {
			Some(Data::Text(text)) => Some(text),
			_ => None,
		}
	}

	#[must_use]
	pub fn attribute(&self, node: MemoryNode, name: &str) -> Option<&str> {
		match self.entry(node).map(|entry| &entry.data) {
			Some(Data::Element { attributes, .. }) => attributes.iter().find(|(n, _)| n == name).map(|(_, value)| value.as_str()),
			_ => None,
		}
	}

	#[must_use]
	pub fn has_handler(&self, node: MemoryNode, name: &str) -> bool {
		matches!(self.entry(node).map(|entry| &entry.data), Some(Data::Element { handlers, .. }) if handlers.contains_key(name))
	}

	/// Calls the handler `name` of `node` with `event`. Returns whether there was one.
	pub fn dispatch(&self, node: MemoryNode, name: &str, event: &dyn Any) -> bool {
		let handler = match self.entry(node).map(|entry| &entry.data) {
			Some(Data::Element { handlers, .. }) => handlers.get(name).cloned(),
			_ => None,
		};
		match handler {
			Some(handler) => {
				handler.call(event);
				true
			}
			None => false,
		}
	}

	/// Serializes the children of `node`, for assertions.
	///
	/// Attributes are written in the order they were first set. Handlers are omitted.
	#[must_use]
	pub fn inner_html(&self, node: MemoryNode) -> String {
		let mut html = String::new();
		for child in self.children(node) {
			self.write_html(&mut html, child);
		}
		html
	}

	fn write_html(&self, html: &mut String, node: MemoryNode) {
		match self.entry(node).map(|entry| &entry.data) {
			Some(Data::Text(text)) => html.push_str(text),
			Some(Data::Element { tag, attributes, children, .. }) => {
				html.push('<');
				html.push_str(tag);
				for (name, value) in attributes {
					let _ = write!(html, " {}=\"{}\"", name, value);
				}
				html.push('>');
				for &child in children {
					self.write_html(html, child);
				}
				let _ = write!(html, "</{}>", tag);
			}
			None => (),
		}
	}

	fn push(&mut self, data: Data) -> MemoryNode {
		self.nodes.push(NodeEntry { parent: None, data });
		MemoryNode(self.nodes.len() - 1)
	}

	fn entry(&self, node: MemoryNode) -> Option<&NodeEntry> {
		self.nodes.get(node.0)
	}

	fn element_mut(&mut self, node: MemoryNode, operation: &'static str) -> Result<&mut Data, HostError> {
		match self.nodes.get_mut(node.0) {
			Some(NodeEntry { data: data @ Data::Element { .. }, .. }) => Ok(data),
			Some(_) => Err(HostError::new(operation, format!("{:?} is not an element", node))),
			None => Err(HostError::new(operation, format!("{:?} does not exist", node))),
		}
	}

	fn is_inclusive_ancestor(&self, ancestor: MemoryNode, mut node: MemoryNode) -> bool {
		loop {
			if node == ancestor {
				return true;
			}
			match self.parent(node) {
				Some(parent) => node = parent,
				None => return false,
			}
		}
	}

	fn detach(&mut self, child: MemoryNode) {
		if let Some(parent) = self.nodes.get_mut(child.0).and_then(|entry| entry.parent.take()) {
			if let Some(NodeEntry { data: Data::Element { children, .. }, .. }) = self.nodes.get_mut(parent.0) {
				children.retain(|&c| c != child);
			}
		}
	}

	/// Moves `child` to `position` (or the end) of `parent`'s children.
	fn place(&mut self, parent: MemoryNode, child: MemoryNode, reference: Option<MemoryNode>, operation: &'static str) -> Result<(), HostError> {
		if self.entry(child).is_none() {
			return Err(HostError::new(operation, format!("{:?} does not exist", child)));
		}
		self.element_mut(parent, operation)?;
		if self.is_inclusive_ancestor(child, parent) {
			return Err(HostError::new(operation, "the new child is an ancestor of the parent"));
		}
		if let Some(reference) = reference {
			if self.parent(reference) != Some(parent) {
				return Err(HostError::new(operation, format!("{:?} is not a child of {:?}", reference, parent)));
			}
		}

		self.detach(child);
		if let Data::Element { children, .. } = self.element_mut(parent, operation)? {
			let position = reference.and_then(|reference| children.iter().position(|&c| c == reference)).unwrap_or(children.len());
			children.insert(position, child);
		}
		if let Some(entry) = self.nodes.get_mut(child.0) {
			entry.parent = Some(parent);
		}
		self.mutations.push(Mutation::Insert { parent, child });
		Ok(())
	}
}

fn is_valid_name(name: &str) -> bool {
	!name.is_empty() && !name.chars().any(|c| c.is_whitespace() || c.is_control() || matches!(c, '"' | '\'' | '>' | '/' | '=' | '<'))
}

impl Host for MemoryHost {
	type Node = MemoryNode;

	fn create_element(&mut self, tag: &str) -> Result<MemoryNode, HostError> {
		if !is_valid_name(tag) {
			return Err(HostError::new("create_element", format!("invalid tag name {:?}", tag)));
		}
		let node = self.push(Data::Element {
			tag: tag.to_owned(),
			attributes: Vec::new(),
			handlers: HashMap::new(),
			children: Vec::new(),
		});
		trace!("Created <{}> as {:?}.", tag, node);
		self.mutations.push(Mutation::CreateElement(node));
		Ok(node)
	}

	fn create_text(&mut self, text: &str) -> Result<MemoryNode, HostError> {
		let node = self.push(Data::Text(text.to_owned()));
		self.mutations.push(Mutation::CreateText(node));
		Ok(node)
	}

	fn child_count(&self, parent: &MemoryNode) -> usize {
		match self.entry(*parent).map(|entry| &entry.data) {
			Some(Data::Element { children, .. }) => children.len(),
			_ => 0,
		}
	}

	fn child_at(&self, parent: &MemoryNode, index: usize) -> Option<MemoryNode> {
		match self.entry(*parent).map(|entry| &entry.data) {
			Some(Data::Element { children, .. }) => children.get(index).copied(),
			_ => None,
		}
	}

	fn insert_before(&mut self, parent: &MemoryNode, child: &MemoryNode, reference: &MemoryNode) -> Result<(), HostError> {
		self.place(*parent, *child, Some(*reference), "insert_before")
	}

	fn append_child(&mut self, parent: &MemoryNode, child: &MemoryNode) -> Result<(), HostError> {
		self.place(*parent, *child, None, "append_child")
	}

	fn remove_child(&mut self, parent: &MemoryNode, child: &MemoryNode) -> Result<(), HostError> {
		if self.parent(*child) != Some(*parent) {
			return Err(HostError::new("remove_child", format!("{:?} is not a child of {:?}", child, parent)));
		}
		self.detach(*child);
		self.mutations.push(Mutation::Remove { parent: *parent, child: *child });
		Ok(())
	}

	fn set_attribute(&mut self, element: &MemoryNode, name: &str, value: &str) -> Result<(), HostError> {
		if !is_valid_name(name) {
			return Err(HostError::new("set_attribute", format!("invalid attribute name {:?}", name)));
		}
		if let Data::Element { attributes, .. } = self.element_mut(*element, "set_attribute")? {
			match attributes.iter_mut().find(|(n, _)| n == name) {
				Some((_, existing)) => value.clone_into(existing),
				None => attributes.push((name.to_owned(), value.to_owned())),
			}
		}
		self.mutations.push(Mutation::SetAttribute {
			element: *element,
			name: name.to_owned(),
		});
		Ok(())
	}

	fn remove_attribute(&mut self, element: &MemoryNode, name: &str) -> Result<(), HostError> {
		if let Data::Element { attributes, .. } = self.element_mut(*element, "remove_attribute")? {
			attributes.retain(|(n, _)| n != name);
		}
		self.mutations.push(Mutation::RemoveAttribute {
			element: *element,
			name: name.to_owned(),
		});
		Ok(())
	}

	fn set_handler(&mut self, element: &MemoryNode, name: &str, handler: Option<&Handler>) -> Result<(), HostError> {
		if let Data::Element { handlers, .. } = self.element_mut(*element, "set_handler")? {
			match handler {
				Some(handler) => {
					handlers.insert(name.to_owned(), handler.clone());
				}
				None => {
					handlers.remove(name);
				}
			}
		}
		self.mutations.push(Mutation::SetHandler {
			element: *element,
			name: name.to_owned(),
			present: handler.is_some(),
		});
		Ok(())
	}

	fn set_text(&mut self, node: &MemoryNode, text: &str) -> Result<(), HostError> {
		match self.nodes.get_mut(node.0) {
			Some(NodeEntry { data: Data::Text(existing), .. }) => text.clone_into(existing),
			_ => return Err(HostError::new("set_text", format!("{:?} is not a text node", node))),
		}
		self.mutations.push(Mutation::SetText(*node));
		Ok(())
	}
}
