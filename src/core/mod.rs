pub mod error;
pub mod models;
pub mod query;
pub mod search;
pub mod storage;

pub use error::{ErrorKind, ServiceError};
pub use models::{Category, FileRecord, UserProfile};
pub use query::{QueryState, ResultPage, SearchRequest, SearchResponse, SortDir, SortField};
pub use search::{SearchEngine, SearchFilter};
pub use storage::{JsonFileStore, KeyValueStore, MemoryStore};
