//! Records persisted and exchanged by the synchronization engine

mod contract;
mod definition;
mod job_log;
mod mapping;
mod trace;

pub use contract::{ContractStatus, SynchronizationContract};
pub use definition::{MappingReference, MappingSource, SynchronizationDefinition};
pub use job_log::JobLog;
pub use mapping::MappingRecord;
pub use trace::{LogLevel, RunTrace, TraceBuilder};

use semver::Version;

/// Version assigned to newly created definitions and mappings
pub fn initial_version() -> Version {
    Version::new(0, 0, 1)
}

/// Increment the patch component, clearing pre-release and build metadata.
pub fn bump_patch(version: &Version) -> Version {
    Version::new(version.major, version.minor, version.patch + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bump_patch() {
        let bumped = bump_patch(&Version::parse("1.4.9-beta+build").unwrap());
        assert_eq!(bumped.to_string(), "1.4.10");
        assert_eq!(bump_patch(&initial_version()).to_string(), "0.0.2");
    }
}
