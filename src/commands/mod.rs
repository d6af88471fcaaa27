//! CLI commands implementation

pub mod ask;
pub mod diagnose;
pub mod index;
pub mod init;
pub mod query;
pub mod recommend;
pub mod tables;

pub use ask::*;
pub use diagnose::*;
pub use index::*;
pub use init::*;
pub use query::*;
pub use recommend::*;
pub use tables::*;
