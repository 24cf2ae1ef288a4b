//! Filesystem layer for Conduit
//!
//! Provides atomic, locked writes for record files, format-agnostic loading
//! of definition/config files and the canonical checksum format used for
//! contract fingerprints.

pub mod checksum;
pub mod config;
pub mod error;
pub mod io;
pub mod path;

pub use checksum::compute_content_checksum;
pub use config::{ConfigStore, Format};
pub use error::{Error, Result};
pub use io::LockFile;
pub use path::NormalizedPath;
