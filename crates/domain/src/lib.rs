//! Sosodesk Domain - Core business types
//!
//! This crate defines the domain model for the sosodesk API workbench:
//! interface definitions and the drafts edited from them, open tabs,
//! response snapshots, environments and settings.
//! All types here are pure Rust with no I/O dependencies.

pub mod connection;
pub mod environment;
pub mod error;
pub mod id;
pub mod interface;
pub mod request;
pub mod response;
pub mod settings;
pub mod tab;

pub use connection::ConnectionState;
pub use environment::{
    EnvironmentEntry, EnvironmentGroup, EnvironmentOption, build_options, dedupe_by_key,
    pick_default,
};
pub use error::{DomainError, DomainResult};
pub use id::generate_run_id;
pub use interface::{
    InterfaceDefinition, InterfacePage, InterfaceSummary, SAVE_ALLOW_LIST, apply_draft, to_draft,
};
pub use request::{EncodedPairs, HttpMethod, KeyValue, PairEncoding, RequestDraft, TestSnippet};
pub use response::{DebugPayload, ResponseHeader, ResponseSnapshot, reason_phrase};
pub use settings::{ClientSettings, LayoutPreferences};
pub use tab::{HydrationState, Tab, TabId};
