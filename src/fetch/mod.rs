//! Repository acquisition: URL validation, commit resolution, cloning.

pub mod acquire;
pub mod context;
pub mod remote;
pub mod resolve;
pub mod transport;

pub use acquire::SnapshotAcquirer;
pub use context::WorkingCopy;
pub use remote::{RepoUrl, LOCAL_PROVIDER};
pub use resolve::resolve_commit;
pub use transport::{CloneOptions, GitTransport, LibGitTransport, RemoteRef};
