use crate::{
	backend::Backend,
	hooks::{Module, ModuleHooks},
	load,
	removal::RemovalGate,
	vnode::{same_node, Key, Selector, VNode, VNodeRef, COMMENT_SELECTOR},
};
use core::{ops::Range, slice};
use hashbrown::{HashMap, HashSet};
use std::{cell::RefCell, rc::Rc};
use tracing::{error, trace, trace_span};

/// Freshly materialized nodes awaiting their deferred `insert` hook, in
/// creation order. Built during one patch call and discarded at its end.
type InsertQueue<B> = Vec<VNodeRef<B>>;

/// Reconciles virtual-node trees against the live tree of a [`Backend`].
///
/// Built once from an ordered module list; the partitioned per-event callback
/// lists are fixed for its lifetime. Each [`patch`](`Patcher::patch`) call is
/// a single synchronous pass: it diffs the new tree against the previous one,
/// applies the minimal mutations through the backend, and returns with every
/// node of the new tree carrying a live reference. The only work that may
/// outlive the call is a removal deferred through a [`RemovalGate`].
///
/// # Correct use
///
/// Hook and module callbacks must not re-enter the patcher, and the subtree
/// under reconciliation must not be mutated externally during a call. The
/// tree passed as `prev` must be the one the previous call returned (or a
/// bootstrap wrapper, see [`Patcher::patch_live`]).
pub struct Patcher<B: Backend> {
	backend: Rc<B>,
	hooks: ModuleHooks<B>,
}

impl<B: Backend> Patcher<B> {
	#[must_use]
	pub fn new(modules: Vec<Module<B>>, backend: B) -> Self {
		Self {
			backend: Rc::new(backend),
			hooks: ModuleHooks::build(modules),
		}
	}

	#[must_use]
	pub fn backend(&self) -> &B {
		&*self.backend
	}

	/// Patches the live tree from the state described by `prev` to the state
	/// described by `next`, returning `next` with live references assigned
	/// throughout its subtree.
	pub fn patch(&self, prev: &VNodeRef<B>, next: &VNodeRef<B>) -> VNodeRef<B> {
		self.run(Root::Tree(prev.clone()), next)
	}

	/// Like [`patch`](`Patcher::patch`), but bootstraps onto a live root the
	/// reconciler has never managed, via [`load::wrap_root`].
	pub fn patch_live(&self, root: &B::Node, next: &VNodeRef<B>) -> VNodeRef<B> {
		self.run(Root::Live(root.clone()), next)
	}

	fn run(&self, prev: Root<B>, next: &VNodeRef<B>) -> VNodeRef<B> {
		let span = trace_span!("patch");
		let _enter = span.enter();

		let mut queue = InsertQueue::new();
		for pre in &self.hooks.pre {
			pre();
		}

		// The wrapper is synthesized after the `pre` callbacks, which may
		// still touch the unmanaged root before it is read back.
		let prev = match prev {
			Root::Tree(tree) => tree,
			Root::Live(node) => Rc::new(RefCell::new(load::wrap_root(&*self.backend, &node))),
		};

		if same_ref(&prev, next) {
			self.patch_node(&prev, next, &mut queue);
		} else {
			let prev_live = prev.borrow().live.clone();
			self.create_node(next, &mut queue);
			match prev_live {
				None => error!("Previous root has no live reference; the new tree was built detached."),
				Some(prev_live) => {
					if let Some(parent) = self.backend.parent_node(&prev_live) {
						let next_live = next.borrow().live.clone();
						if let Some(next_live) = next_live {
							let anchor = self.backend.next_sibling(&prev_live);
							self.backend.insert_before(&parent, &next_live, anchor.as_ref());
						}
						self.remove_nodes(&parent, slice::from_ref(&prev));
					}
				}
			}
		}

		trace!("Flushing {} queued insert hook(s).", queue.len());
		for inserted in &queue {
			let hook = inserted.borrow().data.as_ref().and_then(|data| data.hooks.insert.clone());
			if let Some(hook) = hook {
				hook(&inserted.borrow());
			}
		}
		for post in &self.hooks.post {
			post();
		}
		next.clone()
	}

	/// Materializes `vnode` into a live node, assigned to its `live` field and
	/// returned. Children are built bottom-up; hook invocation is top-down,
	/// with module `create` callbacks running before children attach and the
	/// node's own `create` hook after the whole subtree is built.
	fn create_node(&self, vnode: &VNodeRef<B>, queue: &mut InsertQueue<B>) -> B::Node {
		let init = vnode.borrow().data.as_ref().and_then(|data| data.hooks.init.clone());
		if let Some(init) = init {
			// May replace `data`, so nothing of it is read before this point.
			init(&mut vnode.borrow_mut());
		}

		let sel = vnode.borrow().sel.clone();
		match sel {
			Some(sel) if sel == COMMENT_SELECTOR => {
				let mut node = vnode.borrow_mut();
				if node.text.is_none() {
					node.text = Some(String::new());
				}
				let live = self.backend.create_comment(node.text.as_deref().unwrap_or(""));
				node.live = Some(live.clone());
				live
			}
			Some(sel) => {
				let span = trace_span!("create_element", sel = sel.as_str());
				let _enter = span.enter();

				let parsed = Selector::parse(&sel);
				let ns = vnode.borrow().data.as_ref().and_then(|data| data.ns.clone());
				let live = match ns {
					Some(ns) => self.backend.create_element_ns(&ns, parsed.tag),
					None => self.backend.create_element(parsed.tag),
				};
				vnode.borrow_mut().live = Some(live.clone());
				if let Some(id) = parsed.id {
					self.backend.set_attribute(&live, "id", id);
				}
				if let Some(classes) = &parsed.classes {
					self.backend.set_attribute(&live, "class", classes);
				}

				let placeholder = VNode::placeholder();
				for create in &self.hooks.create {
					create(&placeholder, &vnode.borrow());
				}

				let children = vnode.borrow().children.clone();
				match children {
					Some(children) => {
						for child in &children {
							let child_live = self.create_node(child, queue);
							self.backend.append_child(&live, &child_live);
						}
					}
					None => {
						let text = vnode.borrow().text.clone();
						if let Some(text) = text {
							let text_live = self.backend.create_text(&text);
							self.backend.append_child(&live, &text_live);
						}
					}
				}

				let (create_hook, wants_insert) = match &vnode.borrow().data {
					Some(data) => (data.hooks.create.clone(), data.hooks.insert.is_some()),
					None => (None, false),
				};
				if let Some(create_hook) = create_hook {
					create_hook(&placeholder, &vnode.borrow());
				}
				if wants_insert {
					queue.push(vnode.clone());
				}
				live
			}
			None => {
				let text = vnode.borrow().text.clone().unwrap_or_default();
				let live = self.backend.create_text(&text);
				vnode.borrow_mut().live = Some(live.clone());
				live
			}
		}
	}

	fn add_nodes(&self, parent: &B::Node, anchor: Option<&B::Node>, vnodes: &[VNodeRef<B>], queue: &mut InsertQueue<B>) {
		for vnode in vnodes {
			let live = self.create_node(vnode, queue);
			self.backend.insert_before(parent, &live, anchor);
		}
	}

	/// Pre-order teardown notification over a discarded subtree: the node's
	/// own `destroy` hook first, then every registered `destroy` callback,
	/// then the element children. Plain text children carry no hooks and are
	/// not descended into.
	fn destroy_chain(&self, vnode: &VNodeRef<B>) {
		if vnode.borrow().data.is_none() {
			return;
		}
		let destroy = vnode.borrow().data.as_ref().and_then(|data| data.hooks.destroy.clone());
		if let Some(destroy) = destroy {
			destroy(&vnode.borrow());
		}
		for destroy in &self.hooks.destroy {
			destroy(&vnode.borrow());
		}
		let children = vnode.borrow().children.clone();
		if let Some(children) = children {
			for child in &children {
				let is_element = child.borrow().sel.is_some();
				if is_element {
					self.destroy_chain(child);
				}
			}
		}
	}

	/// Removes each entry's live node from `parent`. Elements go through the
	/// destroy chain and the cooperative removal protocol; plain text nodes
	/// detach immediately.
	fn remove_nodes(&self, parent: &B::Node, vnodes: &[VNodeRef<B>]) {
		for vnode in vnodes {
			let (is_element, live) = {
				let node = vnode.borrow();
				(node.sel.is_some(), node.live.clone())
			};
			let live = match live {
				Some(live) => live,
				None => {
					error!("Node scheduled for removal has no live reference; skipping it.");
					continue;
				}
			};
			if is_element {
				self.destroy_chain(vnode);
				let gate = RemovalGate::new(self.hooks.remove.len() + 1, Rc::clone(&self.backend), live);
				for remove in &self.hooks.remove {
					remove(&vnode.borrow(), Rc::clone(&gate));
				}
				let own = vnode.borrow().data.as_ref().and_then(|data| data.hooks.remove.clone());
				match own {
					// The node's own hook owns the final signal, so it can
					// defer detachment past the end of this call.
					Some(own) => own(&vnode.borrow(), Rc::clone(&gate)),
					None => gate.signal(),
				}
			} else {
				self.backend.remove_child(parent, &live);
			}
		}
	}

	/// Dual-ended keyed diff over two sibling sequences.
	///
	/// Four direct cursor comparisons cover append, prepend, swap and reverse
	/// patterns without any indexing; only when none of them match is a
	/// key→index map built, once, over the unconsumed old range. Matched old
	/// slots are tombstoned in a consumed-flag sequence parallel to `old_ch`
	/// and skipped by the cursors.
	fn update_children(&self, parent: &B::Node, old_ch: &[VNodeRef<B>], new_ch: &[VNodeRef<B>], queue: &mut InsertQueue<B>) {
		let span = trace_span!("update_children", old = old_ch.len(), new = new_ch.len());
		let _enter = span.enter();

		debug_assert_eq!(
			new_ch.iter().filter(|child| child.borrow().key().is_some()).count(),
			new_ch.iter().filter_map(|child| child.borrow().key().cloned()).collect::<HashSet<_>>().len(),
			"Duplicate key among sibling nodes"
		);

		let mut consumed = vec![false; old_ch.len()];
		let mut old_start = 0;
		let mut old_end = old_ch.len();
		let mut new_start = 0;
		let mut new_end = new_ch.len();
		let mut key_map: Option<HashMap<Key, usize>> = None;

		while old_start < old_end && new_start < new_end {
			if consumed[old_start] {
				old_start += 1;
			} else if consumed[old_end - 1] {
				old_end -= 1;
			} else if same_ref(&old_ch[old_start], &new_ch[new_start]) {
				self.patch_node(&old_ch[old_start], &new_ch[new_start], queue);
				old_start += 1;
				new_start += 1;
			} else if same_ref(&old_ch[old_end - 1], &new_ch[new_end - 1]) {
				self.patch_node(&old_ch[old_end - 1], &new_ch[new_end - 1], queue);
				old_end -= 1;
				new_end -= 1;
			} else if same_ref(&old_ch[old_start], &new_ch[new_end - 1]) {
				// Moved towards the end: right after the node the old end
				// cursor sits on, which delimits the untouched middle.
				self.patch_node(&old_ch[old_start], &new_ch[new_end - 1], queue);
				let anchor = live_of(&old_ch[old_end - 1]).and_then(|live| self.backend.next_sibling(&live));
				match live_of(&old_ch[old_start]) {
					Some(moved) => self.backend.insert_before(parent, &moved, anchor.as_ref()),
					None => error!("Node moved towards the end has no live reference."),
				}
				old_start += 1;
				new_end -= 1;
			} else if same_ref(&old_ch[old_end - 1], &new_ch[new_start]) {
				// Moved towards the start.
				self.patch_node(&old_ch[old_end - 1], &new_ch[new_start], queue);
				let anchor = live_of(&old_ch[old_start]);
				match live_of(&old_ch[old_end - 1]) {
					Some(moved) => self.backend.insert_before(parent, &moved, anchor.as_ref()),
					None => error!("Node moved towards the start has no live reference."),
				}
				old_end -= 1;
				new_start += 1;
			} else {
				let map = key_map.get_or_insert_with(|| key_to_index(old_ch, old_start..old_end, &consumed));
				let key = new_ch[new_start].borrow().key().cloned();
				let old_idx = key.and_then(|key| map.get(&key).copied());
				let anchor = live_of(&old_ch[old_start]);
				match old_idx {
					None => {
						// Unknown key (or none): a brand-new entry.
						let live = self.create_node(&new_ch[new_start], queue);
						self.backend.insert_before(parent, &live, anchor.as_ref());
					}
					Some(old_idx) => {
						let matched = &old_ch[old_idx];
						let reusable = matched.borrow().sel == new_ch[new_start].borrow().sel;
						if reusable {
							self.patch_node(matched, &new_ch[new_start], queue);
							consumed[old_idx] = true;
							match live_of(matched) {
								Some(moved) => self.backend.insert_before(parent, &moved, anchor.as_ref()),
								None => error!("Keyed node has no live reference after patching."),
							}
						} else {
							// Same key, different selector: the old entry
							// cannot be reused and stays in place until the
							// trailing removal pass collects it.
							let live = self.create_node(&new_ch[new_start], queue);
							self.backend.insert_before(parent, &live, anchor.as_ref());
						}
					}
				}
				new_start += 1;
			}
		}

		if old_start >= old_end {
			// Old range exhausted first: everything left on the new side is
			// fresh, anchored before the first already-placed trailing node.
			let anchor = new_ch.get(new_end).and_then(live_of);
			self.add_nodes(parent, anchor.as_ref(), &new_ch[new_start..new_end], queue);
		} else if new_start >= new_end {
			let leftovers = old_ch[old_start..old_end]
				.iter()
				.enumerate()
				.filter(|(offset, _)| !consumed[old_start + offset])
				.map(|(_, child)| child.clone())
				.collect::<Vec<_>>();
			self.remove_nodes(parent, &leftovers);
		}
	}

	/// In-place update of a live node. Caller guarantees
	/// [`same_node`]`(old, new)`.
	fn patch_node(&self, old: &VNodeRef<B>, new: &VNodeRef<B>, queue: &mut InsertQueue<B>) {
		let prepatch = new.borrow().data.as_ref().and_then(|data| data.hooks.prepatch.clone());
		if let Some(prepatch) = prepatch {
			prepatch(&old.borrow(), &new.borrow());
		}
		if Rc::ptr_eq(old, new) {
			// Identical handle: a memoized subtree, nothing can have changed.
			return;
		}
		let live = old.borrow().live.clone();
		new.borrow_mut().live = live.clone();
		let live = match live {
			Some(live) => live,
			None => {
				error!("Patched node has no live reference; skipping its content update.");
				return;
			}
		};

		if new.borrow().data.is_some() {
			for update in &self.hooks.update {
				update(&old.borrow(), &new.borrow());
			}
			let own = new.borrow().data.as_ref().and_then(|data| data.hooks.update.clone());
			if let Some(own) = own {
				own(&old.borrow(), &new.borrow());
			}
		}

		// Text takes precedence over children.
		let new_text = new.borrow().text.clone();
		let old_text = old.borrow().text.clone();
		match new_text {
			None => {
				let old_children = old.borrow().children.clone();
				let new_children = new.borrow().children.clone();
				match (old_children, new_children) {
					(Some(old_children), Some(new_children)) => {
						self.update_children(&live, &old_children, &new_children, queue);
					}
					(None, Some(new_children)) => {
						if old_text.is_some() {
							self.backend.set_text_content(&live, "");
						}
						self.add_nodes(&live, None, &new_children, queue);
					}
					(Some(old_children), None) => {
						self.remove_nodes(&live, &old_children);
					}
					(None, None) => {
						if old_text.is_some() {
							self.backend.set_text_content(&live, "");
						}
					}
				}
			}
			Some(new_text) => {
				if old_text.as_deref() != Some(new_text.as_str()) {
					let old_children = old.borrow().children.clone();
					if let Some(old_children) = old_children {
						self.remove_nodes(&live, &old_children);
					}
					self.backend.set_text_content(&live, &new_text);
				}
			}
		}

		let postpatch = new.borrow().data.as_ref().and_then(|data| data.hooks.postpatch.clone());
		if let Some(postpatch) = postpatch {
			postpatch(&old.borrow(), &new.borrow());
		}
	}
}

/// Previous root of a patch call: either the tree the last call returned, or
/// a live node the reconciler has never managed.
enum Root<B: Backend> {
	Tree(VNodeRef<B>),
	Live(B::Node),
}

fn same_ref<B: Backend>(a: &VNodeRef<B>, b: &VNodeRef<B>) -> bool {
	same_node(&a.borrow(), &b.borrow())
}

fn live_of<B: Backend>(vnode: &VNodeRef<B>) -> Option<B::Node> {
	vnode.borrow().live.clone()
}

/// Key→index mapping over the unconsumed slots of `range`, built lazily on
/// the first fallback lookup and scoped to one reconciliation pass.
fn key_to_index<B: Backend>(children: &[VNodeRef<B>], range: Range<usize>, consumed: &[bool]) -> HashMap<Key, usize> {
	let mut map = HashMap::new();
	for idx in range {
		if consumed[idx] {
			continue;
		}
		if let Some(key) = children[idx].borrow().key().cloned() {
			if let Some(previous) = map.insert(key, idx) {
				error!("Duplicate key among sibling nodes (slots {} and {}); keeping the later entry.", previous, idx);
			}
		}
	}
	map
}
