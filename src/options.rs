/// Tuning of a [`Tree`](`crate::Tree`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
	/// Edges deeper than this fail to render with [`Error::DepthLimit`](`crate::Error::DepthLimit`) instead of recursing further.
	pub depth_limit: usize,
}
impl Default for Options {
	fn default() -> Self {
		Self { depth_limit: 1024 }
	}
}
