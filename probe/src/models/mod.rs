mod metadata;
mod query;
mod search;

pub use metadata::{BoundingBox, Coverage, MetadataDocument};
pub use query::{Query, QueryValue};
pub use search::{DatasetEntry, DatasetListResponse, ResultProperties, SearchResult};
