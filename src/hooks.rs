//! The runtime backing function components across renders.
//!
//! While a function component runs, its [`HookRuntime`] is active on the current thread and the `use_*` functions in this module operate on it.
//! Hooks are matched by call order, so a function component must call the same hooks in the same order on every render.

use crate::component::Updater;
use core::{
	any::{type_name, Any},
	cell::RefCell,
	fmt::{self, Debug, Formatter},
};
use std::rc::{Rc, Weak};
use tracing::{trace, trace_span};

thread_local! {
	static ACTIVE: RefCell<Vec<Rc<HookRuntime>>> = RefCell::new(Vec::new());
}

type Cleanup = Box<dyn FnOnce()>;
type Effect = Box<dyn FnOnce() -> Cleanup>;

#[derive(Default)]
struct HookState {
	hooks: Vec<Box<dyn Any>>,
	index: usize,
	updater: Option<Updater>,
	dirty: bool,
	effects: Vec<(usize, Box<dyn Any>, Effect)>,
}

struct EffectHook {
	deps: Option<Box<dyn Any>>,
	cleanup: Option<Cleanup>,
}

/// Stateful carrier of one mounted function component.
#[derive(Default)]
pub struct HookRuntime {
	state: RefCell<HookState>,
}
impl HookRuntime {
	#[must_use]
	pub fn new() -> Rc<Self> {
		Rc::new(Self::default())
	}

	/// Stores the re-render requester. Called once, on creation.
	pub fn initialize(&self, updater: Updater) {
		self.state.borrow_mut().updater = Some(updater);
	}

	/// Makes this runtime's hooks available on the current thread.
	pub fn activate(self: &Rc<Self>) {
		self.state.borrow_mut().index = 0;
		ACTIVE.with(|active| active.borrow_mut().push(Rc::clone(self)));
	}

	pub fn deactivate(self: &Rc<Self>) {
		ACTIVE.with(|active| {
			let mut active = active.borrow_mut();
			if let Some(position) = active.iter().rposition(|runtime| Rc::ptr_eq(runtime, self)) {
				active.remove(position);
			}
		});
	}

	/// Marks the pending update as being performed.
	pub fn perform_update(&self) {
		self.state.borrow_mut().dirty = false;
	}

	#[must_use]
	pub fn needs_update(&self) -> bool {
		self.state.borrow().dirty
	}

	/// Runs effects whose dependencies changed during the last render.
	pub fn trigger_render(&self) {
		let effects = core::mem::take(&mut self.state.borrow_mut().effects);
		for (index, deps, effect) in effects {
			let span = trace_span!("Running effect", index);
			let _enter = span.enter();
			if let Some(cleanup) = self.effect_hook(index, move |hook| {
				hook.deps = Some(deps);
				hook.cleanup.take()
			}) {
				cleanup();
			}
			let cleanup = effect();
			self.effect_hook(index, move |hook| {
				hook.cleanup = Some(cleanup);
				Some(())
			});
		}
	}

	/// Drops the effects queued by a render that failed. Their dependencies count as unseen.
	pub fn discard_effects(&self) {
		let mut state = self.state.borrow_mut();
		if !state.effects.is_empty() {
			trace!("Discarding {} effect(s) of a failed render.", state.effects.len());
			state.effects.clear();
		}
	}

	/// Runs all remaining effect cleanups.
	pub fn trigger_unmount(&self) {
		let cleanups: Vec<Cleanup> = {
			let mut state = self.state.borrow_mut();
			state.effects.clear();
			state
				.hooks
				.iter_mut()
				.filter_map(|hook| hook.downcast_mut::<EffectHook>().and_then(|hook| hook.cleanup.take()))
				.collect()
		};
		trace!("Running {} effect cleanup(s).", cleanups.len());
		for cleanup in cleanups {
			cleanup();
		}
	}

	fn request_update(&self) {
		let updater = {
			let mut state = self.state.borrow_mut();
			state.dirty = true;
			state.updater.clone()
		};
		if let Some(updater) = updater {
			updater.request();
		}
	}

	fn effect_hook<R>(&self, index: usize, f: impl FnOnce(&mut EffectHook) -> Option<R>) -> Option<R> {
		self.state.borrow_mut().hooks.get_mut(index).and_then(|hook| hook.downcast_mut::<EffectHook>()).and_then(f)
	}

	/// Returns the index of the next hook, initializing it with `init` on first use.
	fn next_hook<T: Any>(&self, init: impl FnOnce() -> T) -> usize {
		let mut state = self.state.borrow_mut();
		let index = state.index;
		state.index += 1;
		if index == state.hooks.len() {
			state.hooks.push(Box::new(init()));
		} else if !state.hooks[index].is::<T>() {
			panic!("Hook {} changed its type to {}. Hooks must be called in the same order on every render.", index, type_name::<T>());
		}
		index
	}
}
impl Debug for HookRuntime {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let state = self.state.borrow();
		f.debug_struct("HookRuntime").field("hooks", &state.hooks.len()).field("dirty", &state.dirty).finish()
	}
}

fn active() -> Rc<HookRuntime> {
	ACTIVE
		.with(|active| active.borrow().last().cloned())
		.unwrap_or_else(|| panic!("Hooks can only be used while a function component renders."))
}

/// Sets a [`use_state`] value and requests a re-render.
pub struct StateSetter<T> {
	cell: Rc<RefCell<T>>,
	runtime: Weak<HookRuntime>,
}
impl<T> Clone for StateSetter<T> {
	fn clone(&self) -> Self {
		Self {
			cell: Rc::clone(&self.cell),
			runtime: Weak::clone(&self.runtime),
		}
	}
}
impl<T> StateSetter<T> {
	pub fn set(&self, value: T) {
		*self.cell.borrow_mut() = value;
		if let Some(runtime) = self.runtime.upgrade() {
			runtime.request_update();
		}
	}

	pub fn update(&self, f: impl FnOnce(&mut T)) {
		f(&mut self.cell.borrow_mut());
		if let Some(runtime) = self.runtime.upgrade() {
			runtime.request_update();
		}
	}
}
impl<T> Debug for StateSetter<T> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("StateSetter").field("type", &type_name::<T>()).finish()
	}
}

/// A piece of state that survives re-renders.
///
/// # Panics
///
/// Iff called outside of a rendering function component or out of order.
pub fn use_state<T: Clone + 'static>(init: impl FnOnce() -> T) -> (T, StateSetter<T>) {
	let runtime = active();
	let index = runtime.next_hook(|| Rc::new(RefCell::new(init())));
	let cell = {
		let state = runtime.state.borrow();
		state.hooks[index].downcast_ref::<Rc<RefCell<T>>>().map(Rc::clone)
	}
	.unwrap_or_else(|| unreachable!());
	let value = cell.borrow().clone();
	(
		value,
		StateSetter {
			cell,
			runtime: Rc::downgrade(&runtime),
		},
	)
}

/// Runs `effect` after the render settled, whenever `deps` changed since the previous run.
/// The returned cleanup runs before the next run and on unmount.
///
/// # Panics
///
/// Iff called outside of a rendering function component or out of order.
pub fn use_effect<D, F, C>(deps: D, effect: F)
where
	D: PartialEq + 'static,
	F: FnOnce() -> C + 'static,
	C: FnOnce() + 'static,
{
	let runtime = active();
	let index = runtime.next_hook(|| EffectHook { deps: None, cleanup: None });
	let mut state = runtime.state.borrow_mut();
	let changed = match state.hooks[index].downcast_ref::<EffectHook>() {
		Some(hook) => hook.deps.as_ref().and_then(|previous| previous.downcast_ref::<D>()).map_or(true, |previous| *previous != deps),
		None => unreachable!(),
	};
	if changed {
		let effect: Effect = Box::new(move || Box::new(effect()) as Cleanup);
		state.effects.push((index, Box::new(deps), effect));
	}
}

/// The re-render requester of the active function component.
///
/// # Panics
///
/// Iff called outside of a rendering function component.
#[must_use]
pub fn use_updater() -> Option<Updater> {
	active().state.borrow().updater.clone()
}
