mod indexer;
pub mod search_engine;
pub mod snapshot;
pub mod store;
pub mod synchronizer;

pub use search_engine::{EngineStats, SearchEngine};
pub use snapshot::{EngineSnapshot, SNAPSHOT_VERSION};
pub use store::{DocumentStore, StoredDocument, Visibility};
pub use synchronizer::VectorSynchronizer;
