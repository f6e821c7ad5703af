#![cfg(target_arch = "wasm32")]

use slot_dom::{error::CollectingReporter, Child, Slot, Tree};
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};

wasm_bindgen_test_configure!(run_in_browser);

mod web_container_;
use web_container_::container;

#[wasm_bindgen_test]
fn create_update_remove() {
	let (host, container) = container();
	let reporter = CollectingReporter::new();
	let mut tree = Tree::builder(host, container.clone().into()).reporter(reporter.clone()).build();

	tree.mount(Slot::element("ul").prop("id", "list").child(Slot::element("li").key(1_i64).child("one")).child(Slot::element("li").key(2_i64).child("two")));
	assert_eq!(container.inner_html(), r#"<ul id="list"><li>one</li><li>two</li></ul>"#);
	let first = container.query_selector("li").unwrap().unwrap();

	tree.update(Slot::element("ul").child(Slot::element("li").key(2_i64).child("two")).child(Slot::element("li").key(1_i64).child("uno")));
	assert_eq!(container.inner_html(), "<ul><li>two</li><li>uno</li></ul>");
	assert!(container.query_selector("li:last-child").unwrap().unwrap() == first);

	tree.unmount();
	assert_eq!(container.inner_html(), "");
	assert!(reporter.is_empty());
}

#[wasm_bindgen_test]
fn text_and_fragments() {
	let (host, container) = container();
	let mut tree = Tree::new(host, container.clone().into());

	tree.mount(Slot::fragment(vec![Child::from("a"), Child::Empty, Slot::fragment(vec!["b", "c"]).into()]));
	assert_eq!(container.inner_html(), "abc");

	tree.update(Slot::fragment(vec![Child::from("x"), Child::Empty, Slot::fragment(vec!["b"]).into()]));
	assert_eq!(container.inner_html(), "xb");
}

#[wasm_bindgen_test]
fn invalid_tags_are_reported() {
	let (host, container) = container();
	let reporter = CollectingReporter::new();
	let mut tree = Tree::builder(host, container.clone().into()).reporter(reporter.clone()).build();

	tree.mount(Slot::fragment(vec![Child::from(Slot::element("not valid")), "fine".into()]));
	assert_eq!(container.inner_html(), "fine");
	assert_eq!(reporter.len(), 1);
}
