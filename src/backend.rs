/// Primitive operations of a render target.
///
/// The reconciler mutates the live tree exclusively through this trait and
/// carries no target-specific logic; any tree-shaped surface (a browser DOM
/// binding, a terminal scene graph, an in-memory test tree) can implement it.
///
/// `Node` handles are expected to be cheap to clone, in the way a `web_sys`
/// node reference is: clones alias the same underlying live node.
///
/// All operations are infallible. A backend observing impossible requests
/// (removing a node that is not a child, say) is free to ignore them; the
/// reconciler never issues them for well-formed input.
pub trait Backend {
	type Node: Clone;

	fn create_element(&self, tag: &str) -> Self::Node;
	fn create_element_ns(&self, ns: &str, tag: &str) -> Self::Node;
	fn create_text(&self, text: &str) -> Self::Node;
	fn create_comment(&self, text: &str) -> Self::Node;

	fn append_child(&self, parent: &Self::Node, child: &Self::Node);
	/// Inserts `child` into `parent` immediately before `anchor`.
	/// No anchor appends at the end. A child already attached elsewhere is
	/// moved, not duplicated.
	fn insert_before(&self, parent: &Self::Node, child: &Self::Node, anchor: Option<&Self::Node>);
	fn remove_child(&self, parent: &Self::Node, child: &Self::Node);

	fn parent_node(&self, node: &Self::Node) -> Option<Self::Node>;
	fn next_sibling(&self, node: &Self::Node) -> Option<Self::Node>;
	fn tag_name(&self, node: &Self::Node) -> String;

	/// Replaces the node's entire text content. On an element this drops all
	/// children; on a text or comment node it rewrites the character data.
	fn set_text_content(&self, node: &Self::Node, text: &str);
	fn set_attribute(&self, node: &Self::Node, name: &str, value: &str);
	/// Attribute readback, used only to bootstrap onto a previously unmanaged
	/// root (see [`crate::load`]).
	fn attribute(&self, node: &Self::Node, name: &str) -> Option<String>;
}
