//! The browser DOM as [`Host`], through [`web_sys`].

use super::{Host, HostError};
use crate::slot::Handler;
use js_sys::Reflect;
use tracing::{instrument, trace};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};

/// Renders into [***Node***](https://developer.mozilla.org/en-US/docs/Web/API/Node)s of one [***Document***](https://developer.mozilla.org/en-US/docs/Web/API/Document).
///
/// Handlers are assigned as element properties (for example `onclick`), so the names of handler props should be the names of those properties.
#[derive(Debug, Clone)]
pub struct WebHost {
	document: web_sys::Document,
}
impl WebHost {
	#[must_use]
	pub fn new(document: web_sys::Document) -> Self {
		Self { document }
	}

	/// The host for the current window's document, if there is one.
	#[must_use]
	pub fn from_window() -> Option<Self> {
		web_sys::window().and_then(|window| window.document()).map(Self::new)
	}

	#[must_use]
	pub fn document(&self) -> &web_sys::Document {
		&self.document
	}
}

fn js_error(operation: &'static str) -> impl FnOnce(JsValue) -> HostError {
	move |error| HostError::new(operation, format!("{:?}", error))
}

fn as_element<'a>(node: &'a web_sys::Node, operation: &'static str) -> Result<&'a web_sys::Element, HostError> {
	node.dyn_ref::<web_sys::Element>().ok_or_else(|| HostError::new(operation, format!("expected an element but found {:?}", node)))
}

impl Host for WebHost {
	type Node = web_sys::Node;

	#[instrument(skip(self))]
	fn create_element(&mut self, tag: &str) -> Result<web_sys::Node, HostError> {
		self.document.create_element(tag).map(Into::into).map_err(js_error("create_element"))
	}

	fn create_text(&mut self, text: &str) -> Result<web_sys::Node, HostError> {
		Ok(self.document.create_text_node(text).into())
	}

	fn child_count(&self, parent: &web_sys::Node) -> usize {
		parent.child_nodes().length() as usize
	}

	fn child_at(&self, parent: &web_sys::Node, index: usize) -> Option<web_sys::Node> {
		u32::try_from(index).ok().and_then(|index| parent.child_nodes().get(index))
	}

	fn insert_before(&mut self, parent: &web_sys::Node, child: &web_sys::Node, reference: &web_sys::Node) -> Result<(), HostError> {
		parent.insert_before(child, Some(reference)).map(drop).map_err(js_error("insert_before"))
	}

	fn append_child(&mut self, parent: &web_sys::Node, child: &web_sys::Node) -> Result<(), HostError> {
		parent.append_child(child).map(drop).map_err(js_error("append_child"))
	}

	fn remove_child(&mut self, parent: &web_sys::Node, child: &web_sys::Node) -> Result<(), HostError> {
		parent.remove_child(child).map(drop).map_err(js_error("remove_child"))
	}

	fn set_attribute(&mut self, element: &web_sys::Node, name: &str, value: &str) -> Result<(), HostError> {
		as_element(element, "set_attribute")?.set_attribute(name, value).map_err(js_error("set_attribute"))
	}

	fn remove_attribute(&mut self, element: &web_sys::Node, name: &str) -> Result<(), HostError> {
		as_element(element, "remove_attribute")?.remove_attribute(name).map_err(js_error("remove_attribute"))
	}

	fn set_handler(&mut self, element: &web_sys::Node, name: &str, handler: Option<&Handler>) -> Result<(), HostError> {
		let value = match handler {
			Some(handler) => {
				let handler = handler.clone();
				// The closure is owned by the JavaScript function from here on.
				Closure::wrap(Box::new(move |event: web_sys::Event| handler.call(&event)) as Box<dyn Fn(web_sys::Event)>).into_js_value()
			}
			None => JsValue::NULL,
		};
		trace!("Assigning handler property {:?}.", name);
		Reflect::set(element, &JsValue::from_str(name), &value).map(drop).map_err(js_error("set_handler"))
	}

	fn set_text(&mut self, node: &web_sys::Node, text: &str) -> Result<(), HostError> {
		match node.dyn_ref::<web_sys::Text>() {
			Some(text_node) => {
				text_node.set_data(text);
				Ok(())
			}
			None => Err(HostError::new("set_text", format!("expected a text node but found {:?}", node))),
		}
	}
}
