use crate::{backend::Backend, removal::RemovalGate, vnode::VNode};
use std::rc::Rc;

/// Callback invoked with no node context (`pre`/`post`).
pub type BareHook = Rc<dyn Fn()>;
/// Callback over an (old, new) node pair (`create`/`update`/`prepatch`/`postpatch`).
pub type PairHook<B> = Rc<dyn Fn(&VNode<B>, &VNode<B>)>;
/// Callback over a single node (`insert`/`destroy`).
pub type NodeHook<B> = Rc<dyn Fn(&VNode<B>)>;
/// Mutating callback invoked before a node is first read for materialization.
pub type InitHook<B> = Rc<dyn Fn(&mut VNode<B>)>;
/// Cooperative-removal callback. Every party handed the gate must
/// [`RemovalGate::signal`] it exactly once, immediately or later; the live
/// node stays attached until all have.
pub type RemoveHook<B> = Rc<dyn Fn(&VNode<B>, Rc<RemovalGate<B>>)>;

/// Lifecycle hooks declared on a single virtual node, all optional.
pub struct NodeHooks<B: Backend> {
	/// Runs before the node's data is read for materialization; may replace it.
	pub init: Option<InitHook<B>>,
	/// Runs once the node's whole subtree has been materialized.
	pub create: Option<PairHook<B>>,
	/// Deferred until the end of the patch call, in creation order.
	pub insert: Option<NodeHook<B>>,
	pub prepatch: Option<PairHook<B>>,
	pub update: Option<PairHook<B>>,
	pub postpatch: Option<PairHook<B>>,
	pub destroy: Option<NodeHook<B>>,
	/// Declaring this takes over final detachment: the hook owns the last
	/// pending signal and the node stays attached until it fires the gate.
	pub remove: Option<RemoveHook<B>>,
}

impl<B: Backend> Default for NodeHooks<B> {
	fn default() -> Self {
		Self {
			init: None,
			create: None,
			insert: None,
			prepatch: None,
			update: None,
			postpatch: None,
			destroy: None,
			remove: None,
		}
	}
}

/// A bundle of lifecycle callbacks applied uniformly across all nodes.
///
/// Modules are how attribute, class, style or listener handling plugs into the
/// reconciler without the core knowing any of those concerns. Each member is
/// optional; a module typically captures its own backend handle to act on
/// `VNode::live`.
pub struct Module<B: Backend> {
	pub pre: Option<BareHook>,
	/// Runs right after an element is created, before its children attach.
	pub create: Option<PairHook<B>>,
	pub update: Option<PairHook<B>>,
	pub destroy: Option<NodeHook<B>>,
	pub remove: Option<RemoveHook<B>>,
	pub post: Option<BareHook>,
}

impl<B: Backend> Default for Module<B> {
	fn default() -> Self {
		Self {
			pre: None,
			create: None,
			update: None,
			destroy: None,
			remove: None,
			post: None,
		}
	}
}

/// Per-event callback lists, partitioned out of an ordered module list once at
/// initialization and immutable afterwards. List order is module registration
/// order.
pub(crate) struct ModuleHooks<B: Backend> {
	pub pre: Vec<BareHook>,
	pub create: Vec<PairHook<B>>,
	pub update: Vec<PairHook<B>>,
	pub destroy: Vec<NodeHook<B>>,
	pub remove: Vec<RemoveHook<B>>,
	pub post: Vec<BareHook>,
}

impl<B: Backend> ModuleHooks<B> {
	pub fn build(modules: Vec<Module<B>>) -> Self {
		let mut hooks = Self {
			pre: Vec::new(),
			create: Vec::new(),
			update: Vec::new(),
			destroy: Vec::new(),
			remove: Vec::new(),
			post: Vec::new(),
		};
		for module in modules {
			if let Some(pre) = module.pre {
				hooks.pre.push(pre);
			}
			if let Some(create) = module.create {
				hooks.create.push(create);
			}
			if let Some(update) = module.update {
				hooks.update.push(update);
			}
			if let Some(destroy) = module.destroy {
				hooks.destroy.push(destroy);
			}
			if let Some(remove) = module.remove {
				hooks.remove.push(remove);
			}
			if let Some(post) = module.post {
				hooks.post.push(post);
			}
		}
		hooks
	}
}
