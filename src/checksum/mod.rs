//! Integrity checks for downloaded files.
//!
//! [`ChecksumRegistry`] maps file names to the digests published in the corpus
//! manifest, and [`verify`] hashes a local file and compares it to one of them.

mod registry;
mod verifier;

pub use registry::{ChecksumRegistry, ManifestLayout};
pub use verifier::{sha256_file, verify};
