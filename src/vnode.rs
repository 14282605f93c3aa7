use crate::{backend::Backend, hooks::NodeHooks};
use core::{any::Any, fmt};
use std::{cell::RefCell, rc::Rc};

/// Reserved selector marking a comment placeholder rather than an element.
pub const COMMENT_SELECTOR: &str = "!";

/// Shared handle to a [`VNode`].
///
/// Virtual nodes are single-threaded, interior-mutable handles: the patcher
/// caches live-node references on the tree it returns, and a caller may reuse
/// the identical handle across consecutive trees to skip a subtree entirely
/// (see [`crate::diff::Patcher`]).
pub type VNodeRef<B> = Rc<RefCell<VNode<B>>>;

/// Stable identity scalar distinguishing siblings across reorders.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Key {
	Text(String),
	Index(i64),
}

impl From<&str> for Key {
	fn from(text: &str) -> Self {
		Key::Text(text.to_owned())
	}
}

impl From<String> for Key {
	fn from(text: String) -> Self {
		Key::Text(text)
	}
}

impl From<i64> for Key {
	fn from(index: i64) -> Self {
		Key::Index(index)
	}
}

/// The attribute bag of a virtual node.
///
/// The reconciler itself reads only `key`, `ns` and `hooks`. `payload` is
/// carried opaquely for modules to interpret (attributes, classes, styles…);
/// modules downcast it to whatever shape their builder produced.
pub struct NodeData<B: Backend> {
	pub key: Option<Key>,
	pub ns: Option<String>,
	pub hooks: NodeHooks<B>,
	pub payload: Option<Rc<dyn Any>>,
}

impl<B: Backend> Default for NodeData<B> {
	fn default() -> Self {
		Self {
			key: None,
			ns: None,
			hooks: NodeHooks::default(),
			payload: None,
		}
	}
}

/// A lightweight description of a desired live node and its children.
///
/// Well-formedness (violations are not detected, and yield undefined
/// behaviour of the patch pass, not memory unsafety):
///
/// - at most one of `children` and `text` is set;
/// - `sel` of `None` means a plain text node, so `text` must be set;
/// - the [`COMMENT_SELECTOR`] implies no children.
///
/// `live` starts out unset and is assigned during materialization, or
/// inherited from the matched old node when the patcher reuses one.
pub struct VNode<B: Backend> {
	pub sel: Option<String>,
	pub data: Option<NodeData<B>>,
	pub children: Option<Vec<VNodeRef<B>>>,
	pub text: Option<String>,
	pub live: Option<B::Node>,
}

impl<B: Backend> VNode<B> {
	#[must_use]
	pub fn new(sel: Option<String>, data: Option<NodeData<B>>, children: Option<Vec<VNodeRef<B>>>, text: Option<String>) -> Self {
		Self {
			sel,
			data,
			children,
			text,
			live: None,
		}
	}

	/// A plain text node.
	#[must_use]
	pub fn text_node(text: impl Into<String>) -> Self {
		Self::new(None, None, None, Some(text.into()))
	}

	/// A comment placeholder.
	#[must_use]
	pub fn comment(text: impl Into<String>) -> Self {
		Self::new(Some(COMMENT_SELECTOR.to_owned()), None, None, Some(text.into()))
	}

	/// The empty stand-in passed as the old side of `create` callbacks.
	pub(crate) fn placeholder() -> Self {
		Self::new(Some(String::new()), Some(NodeData::default()), Some(Vec::new()), None)
	}

	#[must_use]
	pub fn into_ref(self) -> VNodeRef<B> {
		Rc::new(RefCell::new(self))
	}

	#[must_use]
	pub fn key(&self) -> Option<&Key> {
		self.data.as_ref().and_then(|data| data.key.as_ref())
	}
}

impl<B: Backend> fmt::Debug for VNode<B> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("VNode")
			.field("sel", &self.sel)
			.field("key", &self.key())
			.field("text", &self.text)
			.field("children", &self.children.as_ref().map(Vec::len))
			.field("live", &self.live.is_some())
			.finish()
	}
}

/// Whether two virtual nodes describe the *same logical node*, making the old
/// one eligible for in-place patching instead of replacement.
///
/// This is an identity test (key plus selector), not structural equality.
#[must_use]
pub fn same_node<B: Backend>(a: &VNode<B>, b: &VNode<B>) -> bool {
	a.key() == b.key() && a.sel == b.sel
}

/// Parsed form of the `tag#id.class1.class2` selector shorthand.
pub(crate) struct Selector<'a> {
	pub tag: &'a str,
	pub id: Option<&'a str>,
	pub classes: Option<String>,
}

impl<'a> Selector<'a> {
	pub fn parse(sel: &'a str) -> Self {
		let hash_idx = sel.find('#');
		let dot_idx = match hash_idx {
			Some(hash_idx) => sel[hash_idx..].find('.').map(|dot| hash_idx + dot),
			None => sel.find('.'),
		};
		// A marker at position 0 folds into the tag.
		let hash = hash_idx.filter(|idx| *idx > 0).unwrap_or_else(|| sel.len());
		let dot = dot_idx.filter(|idx| *idx > 0).unwrap_or_else(|| sel.len());
		let tag = if hash_idx.is_some() || dot_idx.is_some() {
			&sel[..hash.min(dot)]
		} else {
			sel
		};
		let id = if hash < dot { Some(&sel[hash + 1..dot]) } else { None };
		let classes = match dot_idx {
			Some(dot_idx) if dot_idx > 0 => Some(sel[dot_idx + 1..].replace('.', " ")),
			_ => None,
		};
		Self { tag, id, classes }
	}
}
