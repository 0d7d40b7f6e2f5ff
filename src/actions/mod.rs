//! Command actions.
//!
//! - [`generate`]: hash a directory into a new manifest
//! - [`verify`]: recompute digests and compare with a manifest
//! - [`collisions`]: run the collision analysis for a directory
//! - [`dedup`] and [`prompt`]: interactive removal of true duplicates
//!
//! ```no_run
//! use rustsums::actions::generate::{generate, GenerateOptions};
//! use rustsums::hashing::{HashAlgorithm, Hasher};
//! use std::path::Path;
//!
//! let options = GenerateOptions::new(HashAlgorithm::Sha1);
//! let summary = generate(Path::new("."), &options, &Hasher::new()).unwrap();
//! println!("wrote {}", summary.path.display());
//! ```

pub mod collisions;
pub mod dedup;
pub mod generate;
pub mod prompt;
pub mod verify;

pub use collisions::{find_collisions, report_exit_code};
pub use dedup::{dedup_clusters, remove_file, DedupOptions, DedupResult, DeleteError, RemovalMode};
pub use generate::{generate, GenerateError, GenerateOptions, GenerateSummary};
pub use prompt::{ask_keep, InvalidChoice, PromptOutcome, PromptState};
pub use verify::{verify, VerifyFailure, VerifyReport};
