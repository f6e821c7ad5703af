#![cfg(target_arch = "wasm32")]

use slot_dom::scheduler::{Tick, Ticker, TimeoutTicker};
use std::rc::Rc;
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use web_sys::window;

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
fn replaced_and_cancelled_ticks_are_released() {
	let tick: Tick = Rc::new(|| ());
	let mut ticker = TimeoutTicker::new(window().unwrap());

	for _ in 0..3 {
		ticker.arm(Rc::clone(&tick));
	}
	assert_eq!(Rc::strong_count(&tick), 2);

	ticker.cancel();
	assert_eq!(Rc::strong_count(&tick), 1);

	ticker.arm(Rc::clone(&tick));
	drop(ticker);
	assert_eq!(Rc::strong_count(&tick), 1);
}
