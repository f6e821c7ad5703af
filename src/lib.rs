#![doc(html_root_url = "https://docs.rs/slot-dom/0.1.0")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
//! A virtual-tree reconciler: keeps a declarative [`Slot`] tree mounted into a live [`Host`] tree.
//!
//! See the [README](https://github.com/Tamschi/slot-dom/blob/v0.1.0/README.md) for an example.

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

pub mod component;
pub mod edge;
pub mod error;
pub mod hooks;
pub mod host;
mod options;
pub mod scheduler;
pub mod slot;
mod tree;

pub use component::{Component, Construct, Updater};
pub use edge::{Edge, EdgeId};
pub use error::{BoxError, Error, ErrorReporter};
pub use host::{Host, HostError, Target};
pub use options::Options;
pub use slot::{Child, Key, Props, Ref, Slot, Value};
pub use tree::{Outcome, Tree, TreeBuilder};
