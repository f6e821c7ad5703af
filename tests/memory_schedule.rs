use slot_dom::{Child, Slot};

mod memory_fixtures_;
use memory_fixtures_::{assert_counts, request, script, scripted, setup, setup_ticked, take_log};

#[test]
fn sibling_requests_in_one_tick_flush_once() {
	let (tree, body, _, ticker) = setup_ticked();
	let tree = tree.shared();
	script("root", vec![scripted("a"), scripted("b")]);
	script("a", vec!["a"]);
	script("b", vec!["b"]);
	tree.borrow_mut().mount(scripted("root"));
	take_log();

	script("a", vec!["A"]);
	script("b", vec!["B"]);
	request("b");
	request("a");
	assert_eq!(tree.borrow().pending_updates(), 2);
	assert!(ticker.is_armed());
	assert_eq!(ticker.arms(), 2);

	assert!(ticker.fire());
	assert!(!ticker.fire());
	assert_eq!(take_log(), ["render b", "settle b", "render a", "settle a"]);
	assert_eq!(tree.borrow().pending_updates(), 0);
	assert_eq!(tree.borrow().host().inner_html(body), "AB");
	assert_counts(&tree.borrow());
}

#[test]
fn a_tick_while_the_tree_is_borrowed_is_re_armed() {
	let (tree, body, _, ticker) = setup_ticked();
	let tree = tree.shared();
	script("root", vec!["1"]);
	tree.borrow_mut().mount(scripted("root"));

	script("root", vec!["2"]);
	request("root");
	{
		let _borrowed = tree.borrow();
		assert!(ticker.fire());
		assert!(ticker.is_armed());
	}
	assert_eq!(tree.borrow().pending_updates(), 1);

	assert!(ticker.fire());
	assert!(!ticker.is_armed());
	assert_eq!(tree.borrow().pending_updates(), 0);
	assert_eq!(tree.borrow().host().inner_html(body), "2");
}

#[test]
fn shallower_edges_flush_first() {
	let (mut tree, _, _) = setup();
	script("root", vec![Slot::element("div").child(scripted("child"))]);
	tree.mount(scripted("root"));
	take_log();

	request("child");
	request("root");
	assert_eq!(tree.flush(), 1);
	assert_eq!(take_log(), ["render root", "render child", "settle child", "settle root"]);
}

#[test]
fn unmounted_edges_leave_the_queue() {
	let (mut tree, body, _) = setup();
	script("root", vec![scripted("a"), scripted("b")]);
	script("b", vec!["b"]);
	tree.mount(scripted("root"));

	request("b");
	script("root", vec![scripted("a")]);
	request("root");
	assert_eq!(tree.pending_updates(), 2);
	assert_eq!(tree.flush(), 1);
	assert_eq!(tree.pending_updates(), 0);
	assert_eq!(tree.host().inner_html(body), "");
}

#[test]
fn unmounting_the_tree_clears_the_queue() {
	let (mut tree, _, _, ticker) = setup_ticked();
	tree.mount(scripted("root"));
	request("root");
	assert!(ticker.is_armed());

	tree.unmount();
	assert_eq!(tree.pending_updates(), 0);
	assert!(!ticker.is_armed());
}

#[test]
fn count_changes_propagate_through_components() {
	let (mut tree, body, _) = setup();
	script("outer", vec![Child::from(scripted("inner")), "tail".into()]);
	script("inner", vec!["x", "y"]);
	tree.mount(scripted("outer"));
	let root = tree.root_edge().unwrap();
	assert_eq!(tree.edge(root).unwrap().target_node_count(), 3);

	script("inner", vec!["x", "y", "z"]);
	request("inner");
	tree.flush();
	assert_eq!(tree.host().inner_html(body), "xyztail");
	assert_eq!(tree.edge(root).unwrap().target_node_count(), 4);
	assert_counts(&tree);

	script("inner", vec!["x"]);
	request("inner");
	tree.flush();
	assert_eq!(tree.host().inner_html(body), "xtail");
	assert_eq!(tree.edge(root).unwrap().target_node_count(), 2);
	assert_counts(&tree);
}

#[test]
fn count_propagation_stops_at_host_nodes() {
	let (mut tree, body, _) = setup();
	script("list", vec!["1"]);
	tree.mount(Slot::fragment(vec![Child::from(Slot::element("ol").child(Slot::fragment(vec![scripted("list")]))), "after".into()]));
	let root = tree.root_edge().unwrap();
	assert_eq!(tree.edge(root).unwrap().target_node_count(), 2);

	script("list", vec!["1", "2", "3"]);
	request("list");
	tree.flush();
	assert_eq!(tree.host().inner_html(body), "<ol>123</ol>after");
	assert_eq!(tree.edge(root).unwrap().target_node_count(), 2);
	assert_counts(&tree);
}

#[test]
fn queued_edges_find_their_position_through_fragments() {
	let (mut tree, body, _) = setup();
	script("p", vec!["p1"]);
	tree.mount(Slot::element("div").child("a").child(Slot::fragment(vec![Child::from("b"), scripted("p").into()])).child("c"));
	assert_eq!(tree.host().inner_html(body), "<div>abp1c</div>");

	script("p", vec!["p1", "p2"]);
	request("p");
	tree.flush();
	assert_eq!(tree.host().inner_html(body), "<div>abp1p2c</div>");
	assert_counts(&tree);
}

#[test]
fn requests_during_settle_flush_in_the_same_pass() {
	use slot_dom::{BoxError, Component, Construct, Props, Updater};
	use std::cell::Cell;

	thread_local!(static RENDERS: Cell<usize> = Cell::new(0));

	/// Requests another render from `settle` until it rendered three times.
	struct Restless(Option<Updater>);
	impl Construct for Restless {
		fn construct(_: &Props) -> Self {
			Self(None)
		}
	}
	impl Component for Restless {
		fn initialize(&mut self, updater: Updater) {
			self.0 = Some(updater);
		}

		fn update_props(&mut self, _: &Props) {}

		fn render(&mut self) -> Result<Vec<Child>, BoxError> {
			let renders = RENDERS.with(|renders| {
				renders.set(renders.get() + 1);
				renders.get()
			});
			Ok(vec![renders.into()])
		}

		fn settle(&mut self) {
			if RENDERS.with(Cell::get) < 3 {
				if let Some(updater) = &self.0 {
					updater.request();
				}
			}
		}
	}

	let (mut tree, body, _) = setup();
	tree.mount(Slot::fragment(vec![Slot::class::<Restless>()]));
	assert_eq!(tree.host().inner_html(body), "1");
	assert_eq!(tree.pending_updates(), 1);

	assert_eq!(tree.flush(), 2);
	assert_eq!(tree.host().inner_html(body), "3");
	assert_eq!(tree.pending_updates(), 0);
	assert_counts(&tree);
}
