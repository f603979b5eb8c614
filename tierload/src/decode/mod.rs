//! Decoding: load paths, decode paths and the per-request helper.

mod helper;
mod path;

pub use helper::{DecodeHelper, ALLOW_FIXED_OUTPUT};
pub use path::{DecodePath, IdentityTranscoder, LoadPath, ResourceDecoder, ResourceTranscoder};

pub(crate) use path::PathError;
