//! Batching of re-render requests into one flush per tick.

use crate::edge::EdgeId;
use core::{
	cell::{Cell, RefCell},
	fmt::{self, Debug, Formatter},
};
use std::rc::Rc;
use tracing::{error, trace};
use wasm_bindgen::{closure::Closure, JsCast};

/// The callback a [`Ticker`] runs once its tick arrives.
pub type Tick = Rc<dyn Fn()>;

/// Defers a [`Tick`] until after the current synchronous burst of work.
///
/// Arming again replaces the previously armed tick.
pub trait Ticker {
	fn arm(&mut self, tick: Tick);
	fn cancel(&mut self);
}

/// A [`Ticker`] driven by its owner, for native event loops and tests.
///
/// Clones share their state, so one clone can be handed to a [`Tree`](`crate::Tree`) while another one fires it.
#[derive(Clone, Default)]
pub struct ManualTicker(Rc<ManualTickerState>);

#[derive(Default)]
struct ManualTickerState {
	armed: RefCell<Option<Tick>>,
	arms: Cell<usize>,
	cancels: Cell<usize>,
}

impl ManualTicker {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn is_armed(&self) -> bool {
		self.0.armed.borrow().is_some()
	}

	/// How often a tick was armed.
	#[must_use]
	pub fn arms(&self) -> usize {
		self.0.arms.get()
	}

	/// How often an armed tick was cancelled before it could fire.
	#[must_use]
	pub fn cancels(&self) -> usize {
		self.0.cancels.get()
	}

	/// Runs the armed tick, if any. Returns whether a tick ran.
	pub fn fire(&self) -> bool {
		let tick = self.0.armed.borrow_mut().take();
		match tick {
			Some(tick) => {
				tick();
				true
			}
			None => false,
		}
	}
}
impl Ticker for ManualTicker {
	fn arm(&mut self, tick: Tick) {
		self.0.arms.set(self.0.arms.get() + 1);
		*self.0.armed.borrow_mut() = Some(tick);
	}

	fn cancel(&mut self) {
		if self.0.armed.borrow_mut().take().is_some() {
			self.0.cancels.set(self.0.cancels.get() + 1);
		}
	}
}
impl Debug for ManualTicker {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("ManualTicker")
			.field("armed", &self.is_armed())
			.field("arms", &self.arms())
			.field("cancels", &self.cancels())
			.finish()
	}
}

/// A [`Ticker`] backed by [***setTimeout***](https://developer.mozilla.org/en-US/docs/Web/API/setTimeout) with no delay.
///
/// The JavaScript callback of the armed timeout is owned here and freed when it is replaced or cancelled.
#[derive(Debug)]
pub struct TimeoutTicker {
	window: web_sys::Window,
	armed: Option<(i32, Closure<dyn FnMut()>)>,
}
impl TimeoutTicker {
	#[must_use]
	pub fn new(window: web_sys::Window) -> Self {
		Self { window, armed: None }
	}
}
impl Ticker for TimeoutTicker {
	fn arm(&mut self, tick: Tick) {
		self.cancel();
		let callback = Closure::wrap(Box::new(move || tick()) as Box<dyn FnMut()>);
		match self.window.set_timeout_with_callback(callback.as_ref().unchecked_ref()) {
			Ok(handle) => self.armed = Some((handle, callback)),
			Err(error) => error!("Failed to arm timeout: {:?}", error),
		}
	}

	fn cancel(&mut self) {
		if let Some((handle, callback)) = self.armed.take() {
			self.window.clear_timeout_with_handle(handle);
			// Dropping a closure that is currently running defers freeing it until it returns.
			drop(callback);
		}
	}
}

impl Drop for TimeoutTicker {
	fn drop(&mut self) {
		self.cancel();
	}
}

/// The pending set of edges that requested a re-render.
///
/// Shared between a [`Tree`](`crate::Tree`) and the [`Updater`](`crate::Updater`)s it hands out.
pub struct Scheduler {
	pending: Vec<EdgeId>,
	ticker: Box<dyn Ticker>,
	tick: Tick,
}
impl Scheduler {
	pub(crate) fn new(ticker: Box<dyn Ticker>) -> Self {
		Self {
			pending: Vec::new(),
			ticker,
			tick: Rc::new(|| trace!("Tick without an attached tree.")),
		}
	}

	pub(crate) fn set_tick(&mut self, tick: Tick) {
		self.tick = tick;
	}

	/// Adds `edge` to the pending set and re-arms the deferred flush.
	pub fn queue(&mut self, edge: EdgeId) {
		if !self.pending.contains(&edge) {
			self.pending.push(edge);
		}
		trace!("Queued {:?} ({} pending). Re-arming tick.", edge, self.pending.len());
		self.ticker.cancel();
		self.ticker.arm(Rc::clone(&self.tick));
	}

	/// Arms the deferred flush again if requests are still pending.
	pub(crate) fn rearm(&mut self) {
		if !self.pending.is_empty() {
			trace!("Re-arming tick for {} pending request(s).", self.pending.len());
			self.ticker.cancel();
			self.ticker.arm(Rc::clone(&self.tick));
		}
	}

	/// Drops any pending request of `edge`. Returns whether there was one.
	pub fn unqueue(&mut self, edge: EdgeId) -> bool {
		let len = self.pending.len();
		self.pending.retain(|&pending| pending != edge);
		self.pending.len() != len
	}

	#[must_use]
	pub fn is_queued(&self, edge: EdgeId) -> bool {
		self.pending.contains(&edge)
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.pending.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.pending.is_empty()
	}

	/// Drops all pending requests and cancels the armed tick.
	pub fn clear(&mut self) {
		self.pending.clear();
		self.ticker.cancel();
	}

	/// Removes and returns the pending edge closest to the root.
	///
	/// `depth` returns [`None`] for edges that no longer exist; those are discarded.
	/// Among edges of equal depth, the earliest request wins.
	pub(crate) fn take_next(&mut self, depth: impl Fn(EdgeId) -> Option<usize>) -> Option<EdgeId> {
		let mut best: Option<(usize, usize)> = None;
		let mut i = 0;
		while i < self.pending.len() {
			match depth(self.pending[i]) {
				None => {
					trace!("Discarding request of removed {:?}.", self.pending[i]);
					self.pending.remove(i);
					continue;
				}
				Some(depth) => {
					if best.map_or(true, |(_, best_depth)| depth < best_depth) {
						best = Some((i, depth));
					}
				}
			}
			i += 1;
		}
		best.map(|(i, _)| self.pending.remove(i))
	}
}
impl Debug for Scheduler {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Scheduler").field("pending", &self.pending).finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use slotmap::SlotMap;

	#[test]
	fn queueing_rearms_a_single_tick() {
		let ticker = ManualTicker::new();
		let mut scheduler = Scheduler::new(Box::new(ticker.clone()));
		let mut ids = SlotMap::<EdgeId, ()>::with_key();
		let (a, b) = (ids.insert(()), ids.insert(()));

		scheduler.queue(a);
		scheduler.queue(b);
		scheduler.queue(a);
		assert_eq!(scheduler.len(), 2);
		assert_eq!(ticker.arms(), 3);
		assert_eq!(ticker.cancels(), 2);
		assert!(ticker.fire());
		assert!(!ticker.fire());
	}

	#[test]
	fn next_is_shallowest_then_earliest() {
		let mut scheduler = Scheduler::new(Box::new(ManualTicker::new()));
		let mut depths = SlotMap::<EdgeId, usize>::with_key();
		let deep = depths.insert(3);
		let shallow = depths.insert(1);
		let also_shallow = depths.insert(1);
		let removed = depths.insert(0);
		for edge in [deep, shallow, removed, also_shallow] {
			scheduler.queue(edge);
		}
		depths.remove(removed);

		let depth = |edge| depths.get(edge).copied();
		assert_eq!(scheduler.take_next(depth), Some(shallow));
		assert_eq!(scheduler.take_next(depth), Some(also_shallow));
		assert_eq!(scheduler.take_next(depth), Some(deep));
		assert_eq!(scheduler.take_next(depth), None);
	}

	#[test]
	fn unqueue_and_clear() {
		let ticker = ManualTicker::new();
		let mut scheduler = Scheduler::new(Box::new(ticker.clone()));
		let mut ids = SlotMap::<EdgeId, ()>::with_key();
		let (a, b) = (ids.insert(()), ids.insert(()));
		scheduler.queue(a);
		scheduler.queue(b);
		assert!(scheduler.unqueue(a));
		assert!(!scheduler.unqueue(a));
		assert!(!scheduler.is_queued(a));
		assert!(scheduler.is_queued(b));
		scheduler.clear();
		assert!(scheduler.is_empty());
		assert!(!ticker.is_armed());
	}
}
