use crate::{
	backend::Backend,
	vnode::{NodeData, VNode},
};

/// Reconstructs a minimal wrapper virtual node for a live root the reconciler
/// has never managed, so that a first patch can bootstrap onto it.
///
/// Only the tag name and the `id`/`class` attributes are read back, folded
/// into the selector shorthand (`div#app.a.b`); children and further
/// attributes are not loaded. The backend is never mutated.
#[must_use]
pub fn wrap_root<B: Backend>(backend: &B, root: &B::Node) -> VNode<B> {
	let mut sel = backend.tag_name(root).to_ascii_lowercase();
	if let Some(id) = backend.attribute(root, "id") {
		if !id.is_empty() {
			sel.push('#');
			sel.push_str(&id);
		}
	}
	if let Some(class) = backend.attribute(root, "class") {
		for name in class.split_whitespace() {
			sel.push('.');
			sel.push_str(name);
		}
	}
	let mut wrapper = VNode::new(Some(sel), Some(NodeData::default()), Some(Vec::new()), None);
	wrapper.live = Some(root.clone());
	wrapper
}
