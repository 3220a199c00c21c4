// Payload caching: a two-tier blob store plus the resource hub that routes
// each upstream resource through its TTL bucket.

pub mod blob;
pub mod hub;

pub use blob::BlobCache;
pub use hub::{Resource, ResourceHub, TtlConfig};
