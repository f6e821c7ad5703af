#![allow(dead_code)]

use hashbrown::HashMap;
use slot_dom::{
	error::CollectingReporter,
	host::memory::{MemoryHost, MemoryNode},
	scheduler::ManualTicker,
	BoxError, Child, Component, Construct, EdgeId, Host, Props, Slot, Tree, Updater,
};
use std::cell::RefCell;

thread_local! {
	static LOG: RefCell<Vec<String>> = RefCell::new(Vec::new());
	static SCRIPTS: RefCell<HashMap<String, Result<Vec<Child>, String>>> = RefCell::new(HashMap::new());
	static UPDATERS: RefCell<HashMap<String, Updater>> = RefCell::new(HashMap::new());
}

pub fn log(entry: impl Into<String>) {
	LOG.with(|log| log.borrow_mut().push(entry.into()));
}

pub fn take_log() -> Vec<String> {
	LOG.with(|log| log.borrow_mut().drain(..).collect())
}

/// Sets what the [`Scripted`] named `name` renders from now on.
pub fn script(name: &str, children: impl IntoIterator<Item = impl Into<Child>>) {
	let children = children.into_iter().map(Into::into).collect();
	SCRIPTS.with(|scripts| scripts.borrow_mut().insert(name.to_owned(), Ok(children)));
}

/// Makes the [`Scripted`] named `name` fail its renders from now on.
pub fn fail(name: &str, message: &str) {
	SCRIPTS.with(|scripts| scripts.borrow_mut().insert(name.to_owned(), Err(message.to_owned())));
}

/// Requests a re-render of the mounted [`Scripted`] named `name`.
pub fn request(name: &str) {
	let updater = UPDATERS.with(|updaters| updaters.borrow().get(name).cloned());
	updater.unwrap_or_else(|| panic!("Scripted {:?} is not mounted.", name)).request();
}

pub fn scripted(name: &str) -> Slot {
	Slot::class::<Scripted>().prop("name", name)
}

/// A class component that logs its lifecycle and renders whatever was scripted for its name.
pub struct Scripted {
	name: String,
}
impl Construct for Scripted {
	fn construct(props: &Props) -> Self {
		let name = props.get_str("name").unwrap_or_default().to_owned();
		log(format!("construct {}", name));
		Self { name }
	}
}
impl Component for Scripted {
	fn initialize(&mut self, updater: Updater) {
		UPDATERS.with(|updaters| updaters.borrow_mut().insert(self.name.clone(), updater));
	}

	fn update_props(&mut self, props: &Props) {
		self.name = props.get_str("name").unwrap_or_default().to_owned();
	}

	fn render(&mut self) -> Result<Vec<Child>, BoxError> {
		log(format!("render {}", self.name));
		let script = SCRIPTS.with(|scripts| scripts.borrow().get(&self.name).cloned());
		match script {
			Some(Ok(children)) => Ok(children),
			Some(Err(message)) => Err(message.into()),
			None => Ok(vec![]),
		}
	}

	fn settle(&mut self) {
		log(format!("settle {}", self.name));
	}

	fn unmount(&mut self) {
		log(format!("unmount {}", self.name));
		UPDATERS.with(|updaters| updaters.borrow_mut().remove(&self.name));
	}
}

pub fn setup() -> (Tree<MemoryHost>, MemoryNode, CollectingReporter) {
	let (host, body) = MemoryHost::with_root("body");
	let reporter = CollectingReporter::new();
	let tree = Tree::builder(host, body).reporter(reporter.clone()).build();
	(tree, body, reporter)
}

pub fn setup_ticked() -> (Tree<MemoryHost>, MemoryNode, CollectingReporter, ManualTicker) {
	let (host, body) = MemoryHost::with_root("body");
	let reporter = CollectingReporter::new();
	let ticker = ManualTicker::new();
	let tree = Tree::builder(host, body).reporter(reporter.clone()).ticker(ticker.clone()).build();
	(tree, body, reporter, ticker)
}

/// Checks that every cached node count matches what is actually present in the host.
pub fn assert_counts(tree: &Tree<MemoryHost>) {
	if let Some(root) = tree.root_edge() {
		assert_eq!(tree.host().child_count(tree.root_node()), tree.edge(root).unwrap().target_node_count());
		assert_edge_counts(tree, root);
	}
}

fn assert_edge_counts(tree: &Tree<MemoryHost>, id: EdgeId) {
	let edge = tree.edge(id).unwrap();
	let children: usize = edge.children().iter().map(|&child| tree.edge(child).unwrap().target_node_count()).sum();
	match edge.host_node() {
		Some(node) => {
			assert_eq!(edge.target_node_count(), 1);
			assert_eq!(tree.host().child_count(node), children);
		}
		None => assert_eq!(edge.target_node_count(), children, "{:?}", edge.child()),
	}
	for &child in edge.children() {
		assert_edge_counts(tree, child);
	}
}
