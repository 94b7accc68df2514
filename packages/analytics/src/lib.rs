#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! In-memory analytics pipeline for the crime dashboard.
//!
//! Raw records pass through [`validate`] into the working set. Each
//! filter selection narrows the working set with [`filter::apply_all`],
//! and the result feeds [`stats::derive_view`] and the [`hotspot`]
//! functions. Nothing here performs I/O except [`export::write_to_file`],
//! and every function is total over its input.

pub mod export;
pub mod filter;
pub mod hotspot;
pub mod stats;
pub mod time;
pub mod validate;

pub use export::{ExportError, ExportFormat};
pub use validate::RecordDefect;
