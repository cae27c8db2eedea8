//! sosodesk - headless API workbench for a sosotest backend.
//!
//! Wires the tab store, catalog pager and environment resolver to either a
//! live backend or the in-memory one, and keeps remembered environments in
//! the local cache between runs.

mod workbench;

pub use workbench::{Backend, Workbench};
