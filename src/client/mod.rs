pub mod fs;
#[cfg(test)]
pub(crate) mod mock;
mod options;
mod session;
pub mod sync;

pub use options::{ClientOptions, ConflictPolicy, SyncOptions, WalkOptions};
pub use session::SftpClient;
