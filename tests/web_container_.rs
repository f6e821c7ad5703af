#![cfg(target_arch = "wasm32")]
#![allow(dead_code)]

use slot_dom::host::web::WebHost;
use std::sync::Once;
use wasm_bindgen::JsCast;
use web_sys::{window, HtmlBodyElement};

static LOG_INITIALIZED: Once = Once::new();

/// A fresh `<div>` appended to the document body, with logging set up.
pub fn container() -> (WebHost, web_sys::Element) {
	LOG_INITIALIZED.call_once(tracing_wasm::set_as_global_default);

	let document = window().unwrap().document().unwrap();
	let body = document.body().unwrap().dyn_into::<HtmlBodyElement>().unwrap();
	let container = document.create_element("div").unwrap();
	body.append_child(&container).unwrap();
	(WebHost::new(document), container)
}
