pub mod report;
pub mod snapshot;
pub mod sqlite;

pub use report::{ArtifactPaths, write_error_map, write_failure_list};
pub use snapshot::SnapshotStore;
pub use sqlite::TargetSource;
