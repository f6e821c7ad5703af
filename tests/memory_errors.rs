use slot_dom::{host::memory::MemoryNode, Child, Error, Host, Outcome, Slot};

mod memory_fixtures_;
use memory_fixtures_::{assert_counts, fail, request, script, scripted, setup, take_log};

#[test]
fn a_failing_sibling_is_isolated() {
	let (mut tree, body, reporter) = setup();
	script("root", vec![scripted("good"), scripted("bad")]);
	script("good", vec![Slot::element("div")]);
	fail("bad", "bad render");

	assert_eq!(tree.mount(scripted("root")), Outcome::Rendered);
	assert_eq!(tree.host().inner_html(body), "<div></div>");
	assert_eq!(tree.edge(tree.root_edge().unwrap()).unwrap().target_node_count(), 1);

	let errors = reporter.take();
	assert_eq!(errors.len(), 1);
	assert!(matches!(errors[0], Error::Render(_)));
	assert_eq!(errors[0].to_string(), "render failed: bad render");
	assert_counts(&tree);
}

#[test]
fn a_failed_re_render_keeps_its_previous_nodes_in_place() {
	let (mut tree, body, reporter) = setup();
	script("flaky", vec!["f1", "f2"]);
	script("after", vec!["after"]);
	tree.mount(Slot::fragment(vec![scripted("flaky"), scripted("after")]));
	assert_eq!(tree.host().inner_html(body), "f1f2after");

	fail("flaky", "flaky render");
	script("after", vec!["AFTER"]);
	request("flaky");
	request("after");
	assert_eq!(tree.flush(), 2);
	assert_eq!(tree.host().inner_html(body), "f1f2AFTER");
	assert_eq!(reporter.len(), 1);
	assert_counts(&tree);

	script("flaky", vec!["F"]);
	request("flaky");
	tree.flush();
	assert_eq!(tree.host().inner_html(body), "FAFTER");
	assert_eq!(reporter.len(), 1);
	assert_counts(&tree);
}

#[test]
fn a_failed_render_is_retried_in_full() {
	let (mut tree, body, _) = setup();
	fail("late", "not yet");
	tree.mount(Slot::element("main").child(scripted("late")));
	assert_eq!(tree.host().inner_html(body), "<main></main>");

	script("late", vec![Slot::element("p").child("ready")]);
	request("late");
	tree.flush();
	assert_eq!(tree.host().inner_html(body), "<main><p>ready</p></main>");
	assert_eq!(take_log(), ["construct late", "render late", "render late", "settle late"]);
	assert_counts(&tree);
}

#[test]
fn invalid_attributes_are_reported_without_aborting_the_patch() {
	let (mut tree, body, reporter) = setup();
	tree.mount(Slot::element("div").prop("bad name", "x").prop("title", "ok").child("content"));

	let div: MemoryNode = tree.host().child_at(&body, 0).unwrap();
	assert_eq!(tree.host().attribute(div, "title"), Some("ok"));
	assert_eq!(tree.host().text(tree.host().child_at(&div, 0).unwrap()), Some("content"));

	let errors = reporter.take();
	assert_eq!(errors.len(), 1);
	assert!(matches!(&errors[0], Error::Host(error) if error.operation == "set_attribute"));
}

#[test]
fn invalid_tags_fail_their_edge_only() {
	let (mut tree, body, reporter) = setup();
	tree.mount(Slot::fragment(vec![Child::from(Slot::element("not valid")), "fine".into()]));

	assert_eq!(tree.host().inner_html(body), "fine");
	assert_eq!(reporter.len(), 1);
	assert_counts(&tree);
}
