pub mod multipart;
pub mod orderedheaders;
pub mod redirect;
pub mod requestbody;
pub mod response;
pub mod streamfactory;
pub mod transaction;

// Re-exports for convenience
pub use orderedheaders::{HeaderKind, OrderedHeaderMap};
pub use requestbody::RequestBody;
pub use response::HttpResponse;
