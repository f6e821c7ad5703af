//! Declarative descriptions consumed by the [`Tree`](`crate::Tree`).
//!
//! A [`Slot`] describes one renderable unit. Children of a slot are [`Child`]ren, which can also be plain text or nothing at all.

use crate::{component::Component, error::BoxError, Construct};
use core::{
	any::{type_name, Any, TypeId},
	cell::RefCell,
	fmt::{self, Debug, Formatter},
	mem::size_of,
};
use indexmap::IndexMap;
use std::{borrow::Cow, rc::Rc};

/// Prop names that identify a slot instead of describing its host node.
pub(crate) const RESERVED_PROPS: [&str; 2] = ["key", "ref"];

/// The signature of a function-backed component: current props, previous props (if any) and rendered children.
pub type RenderFn = dyn Fn(&Props, Option<&Props>) -> Result<Vec<Child>, BoxError>;

/// A class-backed component type, compared by its Rust type.
#[derive(Clone)]
pub struct ClassType {
	id: TypeId,
	name: &'static str,
	construct: fn(&Props) -> Rc<RefCell<dyn Component>>,
}
impl ClassType {
	#[must_use]
	pub fn of<C: Construct>() -> Self {
		fn construct<C: Construct>(props: &Props) -> Rc<RefCell<dyn Component>> {
			Rc::new(RefCell::new(C::construct(props)))
		}

		Self {
			id: TypeId::of::<C>(),
			name: type_name::<C>(),
			construct: construct::<C>,
		}
	}

	#[must_use]
	pub fn name(&self) -> &'static str {
		self.name
	}

	pub(crate) fn construct(&self, props: &Props) -> Rc<RefCell<dyn Component>> {
		(self.construct)(props)
	}
}

/// A plain function pointer usable as function-backed component.
pub type RenderFnPtr = fn(&Props, Option<&Props>) -> Result<Vec<Child>, BoxError>;

/// What makes two [`FunctionType`]s the same component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FunctionIdentity {
	/// Function items and closures without captures. Each has a distinct zero-sized type.
	Type(TypeId),
	/// [`RenderFnPtr`]s, by address.
	Pointer(usize),
	/// Anything else, by the address of its allocation. Only clones of one [`FunctionType`] match.
	Instance(*const ()),
}

/// A function-backed component.
///
/// Function items, closures without captures and [`RenderFnPtr`]s are the same component whenever they refer to the same function.
/// Closures with captures (and boxed functions) are only the same component as clones of the same [`FunctionType`],
/// so recreating one on each render remounts it. Create the [`FunctionType`] once and reuse it through [`Slot::function_type`] to avoid that.
#[derive(Clone)]
pub struct FunctionType {
	id: FunctionIdentity,
	name: &'static str,
	call: Rc<RenderFn>,
}
impl FunctionType {
	pub fn of<F>(function: F) -> Self
	where
		F: Fn(&Props, Option<&Props>) -> Result<Vec<Child>, BoxError> + 'static,
	{
		let pointer = (&function as &dyn Any).downcast_ref::<RenderFnPtr>().map(|&pointer| pointer as usize);
		let call: Rc<RenderFn> = Rc::new(function);
		let id = match pointer {
			Some(address) => FunctionIdentity::Pointer(address),
			None if size_of::<F>() == 0 => FunctionIdentity::Type(TypeId::of::<F>()),
			None => FunctionIdentity::Instance(Rc::as_ptr(&call).cast::<()>()),
		};
		Self {
			id,
			name: type_name::<F>(),
			call,
		}
	}

	#[must_use]
	pub fn name(&self) -> &'static str {
		self.name
	}

	pub(crate) fn call(&self, props: &Props, previous_props: Option<&Props>) -> Result<Vec<Child>, BoxError> {
		(self.call)(props, previous_props)
	}
}

/// What a [`Slot`] renders as.
#[derive(Clone)]
pub enum Content {
	Class(ClassType),
	Function(FunctionType),
	/// A host element with the given tag.
	Element(Rc<str>),
	/// Pass-through grouping of children without a host node of its own.
	Fragment,
}
impl Content {
	#[must_use]
	pub fn is_component(&self) -> bool {
		matches!(self, Content::Class(_) | Content::Function(_))
	}
}
impl PartialEq for Content {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Content::Class(a), Content::Class(b)) => a.id == b.id,
			(Content::Function(a), Content::Function(b)) => a.id == b.id,
			(Content::Element(a), Content::Element(b)) => a == b,
			(Content::Fragment, Content::Fragment) => true,
			_ => false,
		}
	}
}
impl Eq for Content {}
impl Debug for Content {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Content::Class(class) => write!(f, "Class({})", class.name),
			Content::Function(function) => write!(f, "Function({})", function.name),
			Content::Element(tag) => write!(f, "Element({:?})", tag),
			Content::Fragment => f.write_str("Fragment"),
		}
	}
}

/// Sibling identity token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
	Int(i64),
	Str(Rc<str>),
}
impl From<i64> for Key {
	fn from(key: i64) -> Self {
		Key::Int(key)
	}
}
impl From<i32> for Key {
	fn from(key: i32) -> Self {
		Key::Int(key.into())
	}
}
impl From<&str> for Key {
	fn from(key: &str) -> Self {
		Key::Str(key.into())
	}
}
impl From<String> for Key {
	fn from(key: String) -> Self {
		Key::Str(key.into())
	}
}

/// An event handler assigned to a host node as a live property.
///
/// Handlers compare by identity, so re-creating a closure on every render causes it to be reassigned on every patch.
#[derive(Clone)]
pub struct Handler(Rc<dyn Fn(&dyn Any)>);
impl Handler {
	pub fn new(handler: impl Fn(&dyn Any) + 'static) -> Self {
		Self(Rc::new(handler))
	}

	pub fn call(&self, event: &dyn Any) {
		(self.0)(event)
	}
}
impl PartialEq for Handler {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}
impl Debug for Handler {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Handler").field(&Rc::as_ptr(&self.0).cast::<()>()).finish()
	}
}

/// A prop value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
	/// Same as an absent prop.
	Null,
	Bool(bool),
	Int(i64),
	Float(f64),
	Str(Rc<str>),
	Handler(Handler),
}
impl Value {
	#[must_use]
	pub fn is_null(&self) -> bool {
		matches!(self, Value::Null)
	}

	#[must_use]
	pub fn is_handler(&self) -> bool {
		matches!(self, Value::Handler(_))
	}

	#[must_use]
	pub fn as_str(&self) -> Option<&str> {
		match self {
			Value::Str(value) => Some(value),
			_ => None,
		}
	}

	#[must_use]
	pub fn as_int(&self) -> Option<i64> {
		match *self {
			Value::Int(value) => Some(value),
			_ => None,
		}
	}

	#[must_use]
	pub fn as_bool(&self) -> Option<bool> {
		match *self {
			Value::Bool(value) => Some(value),
			_ => None,
		}
	}

	/// The attribute text for plain values. [`None`] for [`Value::Null`] and handlers.
	#[must_use]
	pub fn to_attribute(&self) -> Option<Cow<'_, str>> {
		match self {
			Value::Null | Value::Handler(_) => None,
			Value::Bool(value) => Some(Cow::Borrowed(if *value { "true" } else { "false" })),
			Value::Int(value) => Some(Cow::Owned(value.to_string())),
			Value::Float(value) => Some(Cow::Owned(value.to_string())),
			Value::Str(value) => Some(Cow::Borrowed(value)),
		}
	}
}
impl From<bool> for Value {
	fn from(value: bool) -> Self {
		Value::Bool(value)
	}
}
impl From<i64> for Value {
	fn from(value: i64) -> Self {
		Value::Int(value)
	}
}
impl From<i32> for Value {
	fn from(value: i32) -> Self {
		Value::Int(value.into())
	}
}
impl From<f64> for Value {
	fn from(value: f64) -> Self {
		Value::Float(value)
	}
}
impl From<&str> for Value {
	fn from(value: &str) -> Self {
		Value::Str(value.into())
	}
}
impl From<String> for Value {
	fn from(value: String) -> Self {
		Value::Str(value.into())
	}
}
impl From<Handler> for Value {
	fn from(handler: Handler) -> Self {
		Value::Handler(handler)
	}
}
impl<T: Into<Value>> From<Option<T>> for Value {
	fn from(value: Option<T>) -> Self {
		value.map_or(Value::Null, Into::into)
	}
}

/// A copy-on-write property bag. Iterates in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Props(Rc<IndexMap<Rc<str>, Value>>);
impl Props {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert(&mut self, name: impl Into<Rc<str>>, value: impl Into<Value>) {
		Rc::make_mut(&mut self.0).insert(name.into(), value.into());
	}

	#[must_use]
	pub fn get(&self, name: &str) -> Option<&Value> {
		self.0.get(name)
	}

	#[must_use]
	pub fn contains(&self, name: &str) -> bool {
		self.0.contains_key(name)
	}

	#[must_use]
	pub fn get_str(&self, name: &str) -> Option<&str> {
		self.get(name).and_then(Value::as_str)
	}

	#[must_use]
	pub fn get_int(&self, name: &str) -> Option<i64> {
		self.get(name).and_then(Value::as_int)
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
		self.0.iter().map(|(name, value)| (&**name, value))
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.0.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}
impl PartialEq for Props {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0) || self.0 == other.0
	}
}

/// What a [`Ref`] currently points at.
#[derive(Clone)]
pub enum Referent {
	Component(Rc<RefCell<dyn Component>>),
	/// A host node, type-erased. Use [`Ref::node`] to get it back.
	Node(Rc<dyn Any>),
}
impl Debug for Referent {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Referent::Component(_) => f.write_str("Component(..)"),
			Referent::Node(_) => f.write_str("Node(..)"),
		}
	}
}

/// An external handle that the [`Tree`](`crate::Tree`) points at the component instance or host node of a slot while it is mounted.
#[derive(Debug, Clone, Default)]
pub struct Ref(Rc<RefCell<Option<Referent>>>);
impl Ref {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn get(&self) -> Option<Referent> {
		self.0.borrow().clone()
	}

	#[must_use]
	pub fn is_set(&self) -> bool {
		self.0.borrow().is_some()
	}

	/// The host node this ref points at, if it points at a node of type `N`.
	#[must_use]
	pub fn node<N: Clone + 'static>(&self) -> Option<N> {
		match &*self.0.borrow() {
			Some(Referent::Node(node)) => node.downcast_ref::<N>().cloned(),
			_ => None,
		}
	}

	#[must_use]
	pub fn component(&self) -> Option<Rc<RefCell<dyn Component>>> {
		match &*self.0.borrow() {
			Some(Referent::Component(component)) => Some(Rc::clone(component)),
			_ => None,
		}
	}

	#[must_use]
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}

	pub(crate) fn set(&self, referent: Referent) {
		*self.0.borrow_mut() = Some(referent);
	}

	pub(crate) fn clear(&self) {
		*self.0.borrow_mut() = None;
	}
}

/// Points `next` at `referent` and clears `previous`, unless they are the same handle.
pub(crate) fn swap_ref(previous: Option<&Ref>, next: Option<&Ref>, referent: impl FnOnce() -> Referent) {
	if let Some(previous) = previous {
		if !next.map_or(false, |next| next.ptr_eq(previous)) {
			previous.clear();
		}
	}
	if let Some(next) = next {
		if !previous.map_or(false, |previous| previous.ptr_eq(next)) {
			next.set(referent());
		}
	}
}

/// An immutable description of one renderable unit.
///
/// Cloning is cheap. The only mutation is the assignment of rendered children to component slots, which the [`Tree`](`crate::Tree`) does once per render pass.
#[derive(Clone)]
pub struct Slot {
	content: Content,
	props: Props,
	key: Option<Key>,
	node_ref: Option<Ref>,
	children: Rc<[Child]>,
}
impl Slot {
	#[must_use]
	pub fn new(content: Content) -> Self {
		Self {
			content,
			props: Props::new(),
			key: None,
			node_ref: None,
			children: Rc::from(Vec::new()),
		}
	}

	#[must_use]
	pub fn class<C: Construct>() -> Self {
		Self::new(Content::Class(ClassType::of::<C>()))
	}

	pub fn function<F>(function: F) -> Self
	where
		F: Fn(&Props, Option<&Props>) -> Result<Vec<Child>, BoxError> + 'static,
	{
		Self::function_type(FunctionType::of(function))
	}

	/// A slot for an existing [`FunctionType`], which keeps its identity across renders.
	#[must_use]
	pub fn function_type(function: FunctionType) -> Self {
		Self::new(Content::Function(function))
	}

	#[must_use]
	pub fn element(tag: &str) -> Self {
		Self::new(Content::Element(tag.into()))
	}

	pub fn fragment(children: impl IntoIterator<Item = impl Into<Child>>) -> Self {
		Self::new(Content::Fragment).children(children)
	}

	#[must_use]
	pub fn key(mut self, key: impl Into<Key>) -> Self {
		self.key = Some(key.into());
		self
	}

	#[must_use]
	pub fn node_ref(mut self, node_ref: &Ref) -> Self {
		self.node_ref = Some(node_ref.clone());
		self
	}

	#[must_use]
	pub fn prop(mut self, name: impl Into<Rc<str>>, value: impl Into<Value>) -> Self {
		self.props.insert(name, value);
		self
	}

	/// Shorthand for a [`Value::Handler`] prop.
	#[must_use]
	pub fn on(self, name: impl Into<Rc<str>>, handler: impl Fn(&dyn Any) + 'static) -> Self {
		self.prop(name, Handler::new(handler))
	}

	#[must_use]
	pub fn child(self, child: impl Into<Child>) -> Self {
		let mut children = self.children.to_vec();
		children.push(child.into());
		Self {
			children: children.into(),
			..self
		}
	}

	#[must_use]
	pub fn children(self, children: impl IntoIterator<Item = impl Into<Child>>) -> Self {
		let mut all = self.children.to_vec();
		all.extend(children.into_iter().map(Into::into));
		Self { children: all.into(), ..self }
	}

	#[must_use]
	pub fn content(&self) -> &Content {
		&self.content
	}

	#[must_use]
	pub fn props(&self) -> &Props {
		&self.props
	}

	#[must_use]
	pub fn get_key(&self) -> Option<&Key> {
		self.key.as_ref()
	}

	#[must_use]
	pub fn get_ref(&self) -> Option<&Ref> {
		self.node_ref.as_ref()
	}

	#[must_use]
	pub fn get_children(&self) -> &[Child] {
		&self.children
	}

	pub(crate) fn set_children(&mut self, children: Vec<Child>) {
		self.children = children.into();
	}

	/// Whether `self` and `other` describe the same logical unit (same content type and key).
	#[must_use]
	pub fn same_unit(&self, other: &Self) -> bool {
		self.content == other.content && self.key == other.key
	}

	/// Structural equality used to skip re-rendering.
	///
	/// The children of component slots are render output and not compared; component inputs travel in props.
	#[must_use]
	pub fn deep_eq(&self, other: &Self) -> bool {
		self.same_unit(other)
			&& self.props == other.props
			&& match (&self.node_ref, &other.node_ref) {
				(None, None) => true,
				(Some(a), Some(b)) => a.ptr_eq(b),
				_ => false,
			} && (self.content.is_component()
			|| (self.children.len() == other.children.len() && self.children.iter().zip(other.children.iter()).all(|(a, b)| a.deep_eq(b))))
	}
}
impl Debug for Slot {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Slot")
			.field("content", &self.content)
			.field("key", &self.key)
			.field("props", &self.props.len())
			.field("children", &self.children.len())
			.finish()
	}
}

/// A child position in a slot tree.
#[derive(Debug, Clone)]
pub enum Child {
	/// Renders nothing and contributes no host nodes.
	Empty,
	Text(Rc<str>),
	Slot(Slot),
}
impl Child {
	#[must_use]
	pub fn as_slot(&self) -> Option<&Slot> {
		match self {
			Child::Slot(slot) => Some(slot),
			_ => None,
		}
	}

	#[must_use]
	pub fn as_text(&self) -> Option<&str> {
		match self {
			Child::Text(text) => Some(text),
			_ => None,
		}
	}

	#[must_use]
	pub fn key(&self) -> Option<&Key> {
		self.as_slot().and_then(Slot::get_key)
	}

	/// Identity check deciding whether an existing edge may be reused for `self`.
	#[must_use]
	pub fn same_unit(&self, other: &Self) -> bool {
		match (self, other) {
			(Child::Empty, Child::Empty) | (Child::Text(_), Child::Text(_)) => true,
			(Child::Slot(a), Child::Slot(b)) => a.same_unit(b),
			_ => false,
		}
	}

	#[must_use]
	pub fn deep_eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Child::Empty, Child::Empty) => true,
			(Child::Text(a), Child::Text(b)) => a == b,
			(Child::Slot(a), Child::Slot(b)) => a.deep_eq(b),
			_ => false,
		}
	}
}
impl From<Slot> for Child {
	fn from(slot: Slot) -> Self {
		Child::Slot(slot)
	}
}
impl From<&str> for Child {
	fn from(text: &str) -> Self {
		Child::Text(text.into())
	}
}
impl From<String> for Child {
	fn from(text: String) -> Self {
		Child::Text(text.into())
	}
}
impl From<char> for Child {
	fn from(text: char) -> Self {
		Child::Text(text.to_string().into())
	}
}
impl From<i64> for Child {
	fn from(number: i64) -> Self {
		Child::Text(number.to_string().into())
	}
}
impl From<i32> for Child {
	fn from(number: i32) -> Self {
		Child::Text(number.to_string().into())
	}
}
impl From<usize> for Child {
	fn from(number: usize) -> Self {
		Child::Text(number.to_string().into())
	}
}
impl From<f64> for Child {
	fn from(number: f64) -> Self {
		Child::Text(number.to_string().into())
	}
}
impl<T: Into<Child>> From<Option<T>> for Child {
	fn from(child: Option<T>) -> Self {
		child.map_or(Child::Empty, Into::into)
	}
}
impl From<()> for Child {
	fn from((): ()) -> Self {
		Child::Empty
	}
}
