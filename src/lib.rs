#![doc(html_root_url = "https://docs.rs/regraft/0.1.0")]
#![warn(clippy::pedantic)]

//! A keyed virtual-node reconciler with pluggable render backends.

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

pub mod backend;
pub mod diff;
pub mod hooks;
pub mod load;
pub mod removal;
pub mod vnode;
