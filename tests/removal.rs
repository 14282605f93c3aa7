
use mem_backend_::{element, element_with, labelled, text, MemBackend};
use regraft::{
	backend::Backend as _,
	diff::Patcher,
	hooks::Module,
	removal::RemovalGate,
	vnode::{NodeData, VNode},
};
use std::{cell::RefCell, rc::Rc};

type Gate = Rc<RemovalGate<MemBackend>>;
type GateSlot = Rc<RefCell<Option<Gate>>>;

fn holding_module(slot: &GateSlot) -> Module<MemBackend> {
	Module {
		remove: Some(Rc::new({
			let slot = slot.clone();
			move |_node: &VNode<MemBackend>, gate: Gate| {
				*slot.borrow_mut() = Some(gate);
			}
		})),
		..Module::default()
	}
}

#[test]
fn deferred_module_signal_keeps_node_attached() {
	let slot: GateSlot = Rc::new(RefCell::new(None));
	let backend = MemBackend::new();
	let patcher = Patcher::new(vec![holding_module(&slot)], backend.clone());
	let body = backend.create_element("body");
	let mount = backend.create_element("div");
	backend.append_child(&body, &mount);
	let tree = patcher.patch_live(&mount, &element("div", vec![labelled("li", "x")]));
	backend.reset_counts();

	patcher.patch(&tree, &element("div", vec![]));

	// The patch pass has returned, but the module still holds its signal.
	assert_eq!(backend.counts().removed, 0);
	assert_eq!(body.child(0).child_count(), 1);

	let gate = slot.borrow_mut().take().unwrap();
	assert_eq!(gate.pending(), 1);
	gate.signal();

	assert_eq!(backend.counts().removed, 1);
	assert_eq!(body.child(0).child_count(), 0);
}

#[test]
fn own_remove_hook_owns_final_detach() {
	let slot: GateSlot = Rc::new(RefCell::new(None));
	let mut data = NodeData::default();
	data.hooks.remove = Some(Rc::new({
		let slot = slot.clone();
		move |_node: &VNode<MemBackend>, gate: Gate| {
			*slot.borrow_mut() = Some(gate);
		}
	}));

	let backend = MemBackend::new();
	let patcher = Patcher::new(Vec::new(), backend.clone());
	let body = backend.create_element("body");
	let mount = backend.create_element("div");
	backend.append_child(&body, &mount);
	let leaving = VNode::new(Some("li".to_owned()), Some(data), None, Some("x".to_owned())).into_ref();
	let tree = patcher.patch_live(&mount, &element("div", vec![leaving]));
	backend.reset_counts();

	patcher.patch(&tree, &element("div", vec![]));

	assert_eq!(backend.counts().removed, 0);
	assert_eq!(body.child(0).child_count(), 1);

	slot.borrow_mut().take().unwrap().signal();
	assert_eq!(backend.counts().removed, 1);
	assert_eq!(body.child(0).child_count(), 0);
}

#[test]
fn every_party_must_signal_before_detach() {
	let first: GateSlot = Rc::new(RefCell::new(None));
	let second: GateSlot = Rc::new(RefCell::new(None));
	let own: GateSlot = Rc::new(RefCell::new(None));

	let mut data = NodeData::default();
	data.hooks.remove = Some(Rc::new({
		let own = own.clone();
		move |_node: &VNode<MemBackend>, gate: Gate| {
			*own.borrow_mut() = Some(gate);
		}
	}));

	let backend = MemBackend::new();
	let patcher = Patcher::new(vec![holding_module(&first), holding_module(&second)], backend.clone());
	let body = backend.create_element("body");
	let mount = backend.create_element("div");
	backend.append_child(&body, &mount);
	let leaving = VNode::new(Some("li".to_owned()), Some(data), None, Some("x".to_owned())).into_ref();
	let tree = patcher.patch_live(&mount, &element("div", vec![leaving]));
	backend.reset_counts();

	patcher.patch(&tree, &element("div", vec![]));

	first.borrow_mut().take().unwrap().signal();
	assert_eq!(body.child(0).child_count(), 1);
	second.borrow_mut().take().unwrap().signal();
	assert_eq!(body.child(0).child_count(), 1);
	own.borrow_mut().take().unwrap().signal();
	assert_eq!(body.child(0).child_count(), 0);
	assert_eq!(backend.counts().removed, 1);
}

#[test]
fn extra_signals_are_ignored() {
	let slot: GateSlot = Rc::new(RefCell::new(None));
	let backend = MemBackend::new();
	let patcher = Patcher::new(vec![holding_module(&slot)], backend.clone());
	let body = backend.create_element("body");
	let mount = backend.create_element("div");
	backend.append_child(&body, &mount);
	let tree = patcher.patch_live(&mount, &element("div", vec![labelled("li", "x")]));
	backend.reset_counts();

	patcher.patch(&tree, &element("div", vec![]));

	let gate = slot.borrow_mut().take().unwrap();
	gate.signal();
	assert_eq!(backend.counts().removed, 1);
	gate.signal();
	assert_eq!(backend.counts().removed, 1);
	assert_eq!(body.child(0).child_count(), 0);
}

#[test]
fn destroy_chain_is_preorder_and_precedes_remove() {
	let log: Rc<RefCell<Vec<(String, String)>>> = Rc::new(RefCell::new(Vec::new()));
	let module = Module {
		destroy: Some(Rc::new({
			let log = log.clone();
			move |node: &VNode<MemBackend>| {
				log.borrow_mut().push(("module destroy".to_owned(), node.sel.clone().unwrap_or_default()));
			}
		})),
		remove: Some(Rc::new({
			let log = log.clone();
			move |node: &VNode<MemBackend>, gate: Gate| {
				log.borrow_mut().push(("module remove".to_owned(), node.sel.clone().unwrap_or_default()));
				gate.signal();
			}
		})),
		..Module::default()
	};

	let own_destroy = |log: &Rc<RefCell<Vec<(String, String)>>>| {
		let log = log.clone();
		Rc::new(move |node: &VNode<MemBackend>| {
			log.borrow_mut().push(("own destroy".to_owned(), node.sel.clone().unwrap_or_default()));
		})
	};

	let mut ul_data = NodeData::default();
	ul_data.hooks.destroy = Some(own_destroy(&log));
	let mut li_data = NodeData::default();
	li_data.hooks.destroy = Some(own_destroy(&log));

	let backend = MemBackend::new();
	let patcher = Patcher::new(vec![module], backend.clone());
	let body = backend.create_element("body");
	let mount = backend.create_element("div");
	backend.append_child(&body, &mount);
	let subtree = element_with("ul", ul_data, vec![element_with("li", li_data, vec![text("x")])]);
	let tree = patcher.patch_live(&mount, &element("div", vec![subtree]));
	backend.reset_counts();

	patcher.patch(&tree, &element("div", vec![]));

	assert_eq!(
		*log.borrow(),
		vec![
			("own destroy".to_owned(), "ul".to_owned()),
			("module destroy".to_owned(), "ul".to_owned()),
			("own destroy".to_owned(), "li".to_owned()),
			("module destroy".to_owned(), "li".to_owned()),
			("module remove".to_owned(), "ul".to_owned()),
		]
	);
	assert_eq!(backend.counts().removed, 1);
	assert_eq!(body.child(0).child_count(), 0);
}

#[test]
fn text_nodes_detach_without_protocol() {
	let calls = Rc::new(RefCell::new(0_usize));
	let module = Module {
		remove: Some(Rc::new({
			let calls = calls.clone();
			move |_node: &VNode<MemBackend>, gate: Gate| {
				*calls.borrow_mut() += 1;
				gate.signal();
			}
		})),
		..Module::default()
	};
	let backend = MemBackend::new();
	let patcher = Patcher::new(vec![module], backend.clone());
	let body = backend.create_element("body");
	let mount = backend.create_element("div");
	backend.append_child(&body, &mount);
	let tree = patcher.patch_live(&mount, &element("div", vec![text("a")]));
	backend.reset_counts();

	patcher.patch(&tree, &element("div", vec![]));

	assert_eq!(backend.counts().removed, 1);
	assert_eq!(*calls.borrow(), 0);
	assert_eq!(body.child(0).child_count(), 0);
}
