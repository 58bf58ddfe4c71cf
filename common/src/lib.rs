pub mod chunk;
pub mod error;
pub mod job;
pub mod results;
pub mod store;
pub mod task;
pub mod wordcount;
pub mod worker;

pub use chunk::*;
pub use error::{DispatchError, StoreError};
pub use job::*;
pub use results::*;
pub use store::{ChunkStore, FsStore, MemoryStore};
pub use task::*;
pub use worker::*;

#[cfg(feature = "s3")]
pub use store::S3Store;
