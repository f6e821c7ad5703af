//! The contract class-backed components fulfil towards the [`Tree`](`crate::Tree`).

use crate::{
	edge::EdgeId,
	error::BoxError,
	scheduler::Scheduler,
	slot::{Child, Props},
};
use core::cell::RefCell;
use std::rc::Weak;
use tracing::{trace, warn};

/// A stateful, class-backed component.
///
/// Instances are created through [`Construct`] when their slot first mounts and are kept for as long as matching slots keep arriving at the same position.
pub trait Component: 'static {
	/// Called once, right after construction.
	/// Store `updater` to request re-renders later on.
	fn initialize(&mut self, updater: Updater) {
		drop(updater);
	}

	/// Called before each render except the first one.
	fn update_props(&mut self, props: &Props);

	/// Produces this component's children.
	///
	/// # Errors
	///
	/// A failed render is reported and leaves the previous output of this component in place.
	fn render(&mut self) -> Result<Vec<Child>, BoxError>;

	/// Whether there is a pending state change.
	/// If not and the props are deeply equal, re-rendering this component is skipped.
	fn needs_update(&self) -> bool {
		false
	}

	/// Called after this component's children have been rendered.
	/// Descendants settle before their ancestors.
	fn settle(&mut self) {}

	/// Called after all of this component's children were unmounted.
	/// Descendants are torn down before their ancestors.
	fn unmount(&mut self) {}
}

/// Creates a [`Component`] from the props of its first slot.
pub trait Construct: Component + Sized {
	fn construct(props: &Props) -> Self;
}

/// Requests a re-render of one mounted component or function component.
///
/// Requests are batched: Any number of them made during one synchronous burst result in one flush on the next tick.
/// Requests made after the component was unmounted or the [`Tree`](`crate::Tree`) was dropped are ignored.
/// A request made while the scheduler itself is borrowed (which only a [`Ticker`](`crate::scheduler::Ticker`) that runs ticks from inside `arm` can cause) is dropped with a warning.
#[derive(Debug, Clone)]
pub struct Updater {
	scheduler: Weak<RefCell<Scheduler>>,
	edge: EdgeId,
}
impl Updater {
	pub(crate) fn new(scheduler: Weak<RefCell<Scheduler>>, edge: EdgeId) -> Self {
		Self { scheduler, edge }
	}

	pub fn request(&self) {
		let scheduler = match self.scheduler.upgrade() {
			Some(scheduler) => scheduler,
			None => return trace!("Ignoring re-render request for a dropped tree."),
		};
		match scheduler.try_borrow_mut() {
			Ok(mut scheduler) => scheduler.queue(self.edge),
			Err(_) => warn!("Scheduler busy. Dropping re-render request for {:?}.", self.edge),
		};
	}
}
