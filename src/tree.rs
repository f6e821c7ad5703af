//! The reconciler.

use crate::{
	component::Updater,
	edge::{Artifact, Edge, EdgeId, EdgeSnapshot},
	error::{Error, ErrorReporter, TracingReporter},
	hooks::HookRuntime,
	host::{Host, HostError, Target},
	options::Options,
	scheduler::{ManualTicker, Scheduler, Ticker},
	slot::{swap_ref, Child, ClassType, Content, FunctionType, Props, Referent, Slot, Value, RESERVED_PROPS},
};
use core::{
	cell::RefCell,
	fmt::{self, Debug, Formatter},
};
use hashbrown::HashSet;
use slotmap::SlotMap;
use std::rc::Rc;
use tracing::{error, instrument, level_filters::STATIC_MAX_LEVEL, trace, trace_span, warn, Level};

/// How one call of the render boundary ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
	Rendered,
	/// The edge was unchanged and kept its previous host nodes without being visited.
	Skipped,
	/// The edge failed to render. The error was reported and the edge's previous host nodes were left in place.
	Failed,
}

/// Keeps a slot tree mounted into one host parent.
///
/// Host nodes already present under the root node before the first mount are not touched, as long as they come after the tree's own nodes.
pub struct Tree<H: Host> {
	host: H,
	root_node: H::Node,
	edges: SlotMap<EdgeId, Edge<H::Node>>,
	root: Option<EdgeId>,
	scheduler: Rc<RefCell<Scheduler>>,
	reporter: Box<dyn ErrorReporter>,
	options: Options,
}

/// Configures a [`Tree`] before its first mount.
pub struct TreeBuilder<H: Host> {
	host: H,
	root_node: H::Node,
	ticker: Box<dyn Ticker>,
	reporter: Box<dyn ErrorReporter>,
	options: Options,
}
impl<H: Host> TreeBuilder<H> {
	/// Sets what defers batched re-renders. Defaults to a detached [`ManualTicker`], so re-renders only happen on [`Tree::flush`].
	#[must_use]
	pub fn ticker(self, ticker: impl Ticker + 'static) -> Self {
		Self {
			ticker: Box::new(ticker),
			..self
		}
	}

	/// Sets where isolated errors go. Defaults to [`TracingReporter`].
	#[must_use]
	pub fn reporter(self, reporter: impl ErrorReporter + 'static) -> Self {
		Self {
			reporter: Box::new(reporter),
			..self
		}
	}

	#[must_use]
	pub fn options(self, options: Options) -> Self {
		Self { options, ..self }
	}

	#[must_use]
	pub fn build(self) -> Tree<H> {
		Tree {
			host: self.host,
			root_node: self.root_node,
			edges: SlotMap::with_key(),
			root: None,
			scheduler: Rc::new(RefCell::new(Scheduler::new(self.ticker))),
			reporter: self.reporter,
			options: self.options,
		}
	}
}

impl<H: Host> Tree<H> {
	/// A tree rendering into `root_node` with default settings.
	#[must_use]
	pub fn new(host: H, root_node: H::Node) -> Self {
		Self::builder(host, root_node).build()
	}

	#[must_use]
	pub fn builder(host: H, root_node: H::Node) -> TreeBuilder<H> {
		TreeBuilder {
			host,
			root_node,
			ticker: Box::new(ManualTicker::new()),
			reporter: Box::new(TracingReporter),
			options: Options::default(),
		}
	}

	/// Moves this tree behind a shared handle and points the ticker at it, so that queued re-renders flush on their own.
	#[must_use]
	pub fn shared(self) -> Rc<RefCell<Self>>
	where
		H: 'static,
	{
		let scheduler = Rc::clone(&self.scheduler);
		let tree = Rc::new(RefCell::new(self));
		let weak = Rc::downgrade(&tree);
		let weak_scheduler = Rc::downgrade(&scheduler);
		scheduler.borrow_mut().set_tick(Rc::new(move || {
			let tree = match weak.upgrade() {
				Some(tree) => tree,
				None => return trace!("Tick after the tree was dropped."),
			};
			match tree.try_borrow_mut() {
				Ok(mut tree) => {
					tree.flush();
				}
				Err(_) => {
					warn!("Tree is borrowed during its tick. Re-arming.");
					if let Some(scheduler) = weak_scheduler.upgrade() {
						match scheduler.try_borrow_mut() {
							Ok(mut scheduler) => scheduler.rearm(),
							Err(_) => error!("Scheduler is busy during its tick. Queued re-renders wait for the next request."),
						}
					}
				}
			};
		}));
		tree
	}

	#[must_use]
	pub fn host(&self) -> &H {
		&self.host
	}

	/// Direct access to the host. Changing nodes owned by the tree through it breaks later updates.
	pub fn host_mut(&mut self) -> &mut H {
		&mut self.host
	}

	#[must_use]
	pub fn root_node(&self) -> &H::Node {
		&self.root_node
	}

	#[must_use]
	pub fn root_edge(&self) -> Option<EdgeId> {
		self.root
	}

	#[must_use]
	pub fn edge(&self, id: EdgeId) -> Option<&Edge<H::Node>> {
		self.edges.get(id)
	}

	/// How many edges currently exist.
	#[must_use]
	pub fn edge_count(&self) -> usize {
		self.edges.len()
	}

	#[must_use]
	pub fn is_mounted(&self) -> bool {
		self.root.is_some()
	}

	/// How many edges are waiting to be re-rendered.
	#[must_use]
	pub fn pending_updates(&self) -> usize {
		self.scheduler.borrow().len()
	}

	#[must_use]
	pub fn options(&self) -> &Options {
		&self.options
	}

	/// Renders `root` into the root node, unmounting what was mounted before.
	#[instrument(skip(self, root))]
	pub fn mount(&mut self, root: impl Into<Child>) -> Outcome {
		self.unmount();
		let id = self.edges.insert(Edge::new(root.into(), 0, None));
		self.root = Some(id);
		let mut target = Target::new(self.root_node.clone());
		self.render_edge(id, None, &mut target, false)
	}

	/// Renders `root` against the mounted tree, keeping edges that still match.
	///
	/// Falls back to [`mount`](`Tree::mount`) if nothing is mounted or the root changed its type or key.
	#[instrument(skip(self, root))]
	pub fn update(&mut self, root: impl Into<Child>) -> Outcome {
		let root = root.into();
		match self.root {
			Some(id) if self.edges[id].child.same_unit(&root) => {
				let snapshot = self.edges[id].snapshot();
				self.edges[id].child = root;
				let mut target = Target::new(self.root_node.clone());
				self.render_edge(id, Some(snapshot), &mut target, false)
			}
			_ => self.mount(root),
		}
	}

	/// Tears down the mounted tree, removing its host nodes. Does nothing if nothing is mounted.
	#[instrument(skip(self))]
	pub fn unmount(&mut self) {
		let root = match self.root.take() {
			Some(root) => root,
			None => return,
		};
		let target = Target::new(self.root_node.clone());
		self.unmount_edge(root, &target);
		self.scheduler.borrow_mut().clear();
		if !self.edges.is_empty() {
			warn!("{} edge(s) were not reachable from the root while unmounting.", self.edges.len());
			self.edges.clear();
		}
	}

	/// Re-renders all queued edges, closest to the root first, until the queue is empty.
	///
	/// Returns how many edges were taken from the queue.
	#[instrument(skip(self))]
	pub fn flush(&mut self) -> usize {
		let mut flushed = 0;
		loop {
			let next = {
				let edges = &self.edges;
				self.scheduler.borrow_mut().take_next(|id| edges.get(id).map(Edge::depth))
			};
			let id = match next {
				Some(id) => id,
				None => break,
			};
			flushed += 1;

			let mut target = self.create_target(id);
			let snapshot = self.edges[id].snapshot();
			let previous_count = snapshot.target_node_count;
			self.render_edge(id, Some(snapshot), &mut target, true);

			let count = self.edges[id].target_node_count;
			if count != previous_count {
				self.propagate(id, previous_count, count);
			}
		}
		trace!("Flushed {} edge(s).", flushed);
		flushed
	}

	fn updater(&self, id: EdgeId) -> Updater {
		Updater::new(Rc::downgrade(&self.scheduler), id)
	}

	fn report_host(&self, result: Result<(), HostError>) {
		if let Err(error) = result {
			self.reporter.report(error.into());
		}
	}

	/// The render boundary: Errors of `id`'s own render are isolated here.
	///
	/// `requested` marks a render that was taken from the queue, which is never skipped.
	fn render_edge(&mut self, id: EdgeId, previous: Option<EdgeSnapshot<H::Node>>, target: &mut Target<H::Node>, requested: bool) -> Outcome {
		let span = trace_span!("Rendering edge", ?id, depth = self.edges[id].depth);
		let _enter = span.enter();

		let edge = &self.edges[id];
		let requested = if edge.is_stateful() {
			self.scheduler.borrow_mut().unqueue(id) || requested
		} else {
			requested
		};

		if let (Some(previous), Some(slot)) = (&previous, edge.slot()) {
			if slot.content().is_component() && !requested && !edge.needs_update() && previous.slot().map_or(false, |previous| slot.deep_eq(previous)) {
				let count = edge.target_node_count;
				trace!("Unchanged. Skipping {} host node(s).", count);
				self.keep_in_place(id, target, count);
				return Outcome::Skipped;
			}
		}

		let start = target.index();
		match self.dispatch(id, previous.as_ref(), target) {
			Ok(()) => {
				self.edges[id].target_node_count = target.index() - start;
				Outcome::Rendered
			}
			Err(error) => {
				let count = self.edges[id].target_node_count;
				trace!("Render failed. Reserving the previous {} host node(s).", count);
				self.reporter.report(error);
				if previous.is_some() {
					self.keep_in_place(id, target, count);
				} else {
					target.advance(count);
				}
				Outcome::Failed
			}
		}
	}

	fn dispatch(&mut self, id: EdgeId, previous: Option<&EdgeSnapshot<H::Node>>, target: &mut Target<H::Node>) -> Result<(), Error> {
		let edge = &self.edges[id];
		if edge.depth > self.options.depth_limit {
			return Err(Error::DepthLimit {
				depth: edge.depth,
				limit: self.options.depth_limit,
			});
		}

		match edge.child.clone() {
			Child::Empty => Ok(()),
			Child::Text(text) => self.render_text(id, &text, previous, target),
			Child::Slot(slot) => match slot.content().clone() {
				Content::Class(class) => self.render_class(id, &class, slot, previous, target),
				Content::Function(function) => self.render_function(id, &function, slot, previous, target),
				Content::Element(tag) => self.render_element(id, &tag, &slot, previous, target),
				Content::Fragment => self.render_children(id, previous, target),
			},
		}
	}

	fn render_class(&mut self, id: EdgeId, class: &ClassType, mut slot: Slot, previous: Option<&EdgeSnapshot<H::Node>>, target: &mut Target<H::Node>) -> Result<(), Error> {
		let component = match self.edges[id].component().cloned() {
			Some(component) => {
				component.borrow_mut().update_props(slot.props());
				component
			}
			None => {
				trace!("Constructing {}.", class.name());
				let component = class.construct(slot.props());
				component.borrow_mut().initialize(self.updater(id));
				self.edges[id].artifact = Artifact::Component(Rc::clone(&component));
				component
			}
		};

		swap_ref(previous.and_then(EdgeSnapshot::slot).and_then(Slot::get_ref), slot.get_ref(), || {
			Referent::Component(Rc::clone(&component))
		});

		let children = component.borrow_mut().render().map_err(Error::Render)?;
		slot.set_children(children);
		self.edges[id].child = Child::Slot(slot);
		self.render_children(id, previous, target)?;

		component.borrow_mut().settle();
		Ok(())
	}

	fn render_function(
		&mut self,
		id: EdgeId,
		function: &FunctionType,
		mut slot: Slot,
		previous: Option<&EdgeSnapshot<H::Node>>,
		target: &mut Target<H::Node>,
	) -> Result<(), Error> {
		let hooks = match self.edges[id].hooks().cloned() {
			Some(hooks) => {
				hooks.perform_update();
				hooks
			}
			None => {
				trace!("Creating hook runtime for {}.", function.name());
				let hooks = HookRuntime::new();
				hooks.initialize(self.updater(id));
				self.edges[id].artifact = Artifact::Hooks(Rc::clone(&hooks));
				hooks
			}
		};

		hooks.activate();
		let result = function.call(slot.props(), previous.and_then(EdgeSnapshot::slot).map(Slot::props));
		hooks.deactivate();

		let rendered = match result {
			Ok(children) => {
				slot.set_children(children);
				self.edges[id].child = Child::Slot(slot);
				self.render_children(id, previous, target)
			}
			Err(error) => Err(Error::Render(error)),
		};
		match rendered {
			Ok(()) => hooks.trigger_render(),
			Err(_) => hooks.discard_effects(),
		}
		rendered
	}

	fn render_element(&mut self, id: EdgeId, tag: &str, slot: &Slot, previous: Option<&EdgeSnapshot<H::Node>>, target: &mut Target<H::Node>) -> Result<(), Error> {
		let node = match self.edges[id].host_node().cloned() {
			Some(node) => node,
			None => {
				let node = self.host.create_element(tag)?;
				self.edges[id].artifact = Artifact::Node(node.clone());
				node
			}
		};

		self.patch_element(&node, slot, previous.and_then(EdgeSnapshot::slot));

		let mut inner = Target::new(node.clone());
		self.render_children(id, previous, &mut inner)?;

		// Last, so that the subtree is complete when it becomes visible.
		target.insert(&mut self.host, &node)?;
		Ok(())
	}

	fn render_text(&mut self, id: EdgeId, text: &str, previous: Option<&EdgeSnapshot<H::Node>>, target: &mut Target<H::Node>) -> Result<(), Error> {
		let node = match self.edges[id].host_node().cloned() {
			Some(node) => {
				if previous.and_then(|previous| previous.child.as_text()) != Some(text) {
					if cfg!(feature = "dangerous-logging") {
						trace!(text, "Patching text.");
					} else {
						trace!(len = text.len(), "Patching text.");
					}
					self.host.set_text(&node, text)?;
				}
				node
			}
			None => {
				let node = self.host.create_text(text)?;
				self.edges[id].artifact = Artifact::Node(node.clone());
				node
			}
		};
		target.insert(&mut self.host, &node)?;
		Ok(())
	}

	/// Matches the rendered children of `id` against the children of its previous snapshot, then renders them in order.
	fn render_children(&mut self, id: EdgeId, previous: Option<&EdgeSnapshot<H::Node>>, target: &mut Target<H::Node>) -> Result<(), Error> {
		let (slots, depth) = {
			let edge = &self.edges[id];
			(edge.slot().map(|slot| slot.get_children().to_vec()).unwrap_or_default(), edge.depth)
		};
		let previous_children = previous.map_or(&[] as &[EdgeId], |previous| previous.children.as_slice());

		let mut children = Vec::with_capacity(slots.len());
		let mut snapshots = Vec::with_capacity(slots.len());
		let mut claimed = HashSet::new();
		let mut to_move = HashSet::new();

		for (i, slot) in slots.into_iter().enumerate() {
			let matched = if slot.key().is_some() {
				match previous_children.iter().position(|&child| self.edges[child].child.same_unit(&slot)) {
					Some(j) if claimed.contains(&previous_children[j]) => {
						warn!("Duplicate key {:?} among siblings. Mounting a new edge for the repetition.", slot.key());
						None
					}
					Some(j) => {
						if j != i {
							to_move.insert(previous_children[j]);
						}
						Some(previous_children[j])
					}
					None => None,
				}
			} else {
				previous_children.get(i).copied().filter(|&child| self.edges[child].child.same_unit(&slot))
			};

			let (child, snapshot) = match matched {
				Some(child) => {
					claimed.insert(child);
					let snapshot = self.edges[child].snapshot();
					self.edges[child].child = slot;
					(child, Some(snapshot))
				}
				None => (self.edges.insert(Edge::new(slot, depth + 1, Some(id))), None),
			};
			children.push(child);
			snapshots.push(snapshot);
		}

		self.edges[id].children = children.clone();

		for &child in previous_children {
			if !claimed.contains(&child) {
				self.unmount_edge(child, target);
			}
		}

		for (child, snapshot) in children.into_iter().zip(snapshots) {
			if to_move.contains(&child) {
				trace!(?child, index = target.index(), "Moving keyed edge.");
				let mut temporary = Target::at(target.parent().clone(), target.index());
				self.move_edge(child, &mut temporary)?;
			}
			self.render_edge(child, snapshot, target, false);
		}
		Ok(())
	}

	/// Puts the `count` existing host nodes of an edge that isn't rendered at the cursor and moves past them.
	///
	/// A keyed sibling moved in front of them may have displaced them. Nodes already in place are left alone.
	fn keep_in_place(&mut self, id: EdgeId, target: &mut Target<H::Node>, count: usize) {
		if count > 0 {
			let mut temporary = Target::at(target.parent().clone(), target.index());
			let result = self.move_edge(id, &mut temporary);
			self.report_host(result);
		}
		target.advance(count);
	}

	/// Inserts the top-level host nodes of `id` at `target`.
	fn move_edge(&mut self, id: EdgeId, target: &mut Target<H::Node>) -> Result<(), HostError> {
		if let Some(node) = self.edges[id].host_node().cloned() {
			return target.insert(&mut self.host, &node);
		}
		for child in self.edges[id].children.clone() {
			self.move_edge(child, target)?;
		}
		Ok(())
	}

	/// Removes `id` and its descendants, bottom-up.
	fn unmount_edge(&mut self, id: EdgeId, target: &Target<H::Node>) {
		let edge = match self.edges.remove(id) {
			Some(edge) => edge,
			None => return warn!("Tried to unmount missing {:?}.", id),
		};
		let span = trace_span!("Unmounting edge", ?id, depth = edge.depth);
		let _enter = span.enter();

		let mut detached = None;
		if let Some(node) = edge.host_node() {
			if let Err(error) = target.remove(&mut self.host, node) {
				error!("Failed to remove host node: {}", error);
			}
			// Descendants are removed from the detached node only.
			if matches!(edge.slot().map(Slot::content), Some(Content::Element(_))) {
				detached = Some(Target::new(node.clone()));
			}
		}

		if let Some(node_ref) = edge.slot().and_then(Slot::get_ref) {
			node_ref.clear();
		}

		let inner = detached.as_ref().unwrap_or(target);
		for &child in &edge.children {
			self.unmount_edge(child, inner);
		}

		match &edge.artifact {
			Artifact::Component(component) => {
				self.scheduler.borrow_mut().unqueue(id);
				component.borrow_mut().unmount();
			}
			Artifact::Hooks(hooks) => {
				self.scheduler.borrow_mut().unqueue(id);
				hooks.trigger_unmount();
			}
			Artifact::None | Artifact::Node(_) => (),
		}
	}

	/// Finds the cursor position of `id` by summing the node counts of preceding siblings up to the closest ancestor with a host node.
	fn create_target(&self, id: EdgeId) -> Target<H::Node> {
		let mut index = 0;
		let mut current = id;
		let target = loop {
			let parent_id = match self.edges[current].parent {
				Some(parent_id) => parent_id,
				None => break Target::at(self.root_node.clone(), index),
			};
			let parent = &self.edges[parent_id];
			index += parent
				.children
				.iter()
				.take_while(|&&sibling| sibling != current)
				.map(|&sibling| self.edges[sibling].target_node_count)
				.sum::<usize>();
			if let Some(node) = parent.host_node() {
				break Target::at(node.clone(), index);
			}
			current = parent_id;
		};

		if STATIC_MAX_LEVEL >= Level::WARN && target.index() > self.host.child_count(target.parent()) {
			warn!(
				"Reconstructed cursor index {} lies beyond the {} child node(s) of its host parent. Were the tree's host nodes changed externally?",
				target.index(),
				self.host.child_count(target.parent())
			);
		}
		trace!(?id, index = target.index(), "Reconstructed cursor.");
		target
	}

	/// Applies a changed node count of `id` to its ancestors without host nodes of their own.
	fn propagate(&mut self, id: EdgeId, previous_count: usize, count: usize) {
		let mut current = self.edges[id].parent;
		while let Some(parent_id) = current {
			let parent = &mut self.edges[parent_id];
			if parent.host_node().is_some() {
				break;
			}
			parent.target_node_count = (parent.target_node_count + count).saturating_sub(previous_count);
			current = parent.parent;
		}
	}

	fn patch_element(&mut self, node: &H::Node, slot: &Slot, previous: Option<&Slot>) {
		swap_ref(previous.and_then(Slot::get_ref), slot.get_ref(), || Referent::Node(Rc::new(node.clone())));

		let empty = Props::new();
		let props = slot.props();
		let previous_props = previous.map_or(&empty, Slot::props);

		for (name, value) in props.iter() {
			if !RESERVED_PROPS.contains(&name) {
				self.patch_attribute(node, name, value, previous_props.get(name).unwrap_or(&Value::Null));
			}
		}
		for (name, previous_value) in previous_props.iter() {
			if !RESERVED_PROPS.contains(&name) && !props.contains(name) {
				self.patch_attribute(node, name, &Value::Null, previous_value);
			}
		}
	}

	/// Switching between handler and plain form clears the previous form first.
	fn patch_attribute(&mut self, node: &H::Node, name: &str, value: &Value, previous: &Value) {
		match value {
			Value::Null => {
				if previous.is_handler() {
					let result = self.host.set_handler(node, name, None);
					self.report_host(result);
				} else if !previous.is_null() {
					let result = self.host.remove_attribute(node, name);
					self.report_host(result);
				}
			}
			Value::Handler(handler) => {
				if !previous.is_null() && !previous.is_handler() {
					let result = self.host.remove_attribute(node, name);
					self.report_host(result);
				}
				if value != previous {
					let result = self.host.set_handler(node, name, Some(handler));
					self.report_host(result);
				}
			}
			plain => {
				if previous.is_handler() {
					let result = self.host.set_handler(node, name, None);
					self.report_host(result);
				}
				if plain != previous {
					if let Some(text) = plain.to_attribute() {
						if cfg!(feature = "dangerous-logging") {
							trace!(name, value = &*text, "Setting attribute.");
						} else {
							trace!(name, "Setting attribute.");
						}
						let result = self.host.set_attribute(node, name, &text);
						self.report_host(result);
					}
				}
			}
		}
	}
}

impl<H: Host + Debug> Debug for Tree<H> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Tree")
			.field("host", &self.host)
			.field("root_node", &self.root_node)
			.field("root", &self.root)
			.field("edges", &self.edges.len())
			.field("scheduler", &self.scheduler)
			.field("options", &self.options)
			.finish_non_exhaustive()
	}
}
