mod document;
mod result;
mod tenant;

pub use document::Document;
pub use result::{SearchHit, SearchResult};
pub use tenant::TenantId;
