//! Request editing types

mod draft;
mod method;
mod pairs;

pub use draft::{RequestDraft, TestSnippet};
pub use method::HttpMethod;
pub use pairs::{EncodedPairs, KeyValue, PairEncoding, RAW_ENTRY_KEY};
