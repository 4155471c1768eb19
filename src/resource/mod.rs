mod catalog;
mod loader;
mod transport;

pub use catalog::{Chunk, ResourceCatalog, ResourceCatalogEntry};
pub use loader::{ResourceLoader, MANIFEST_NAME};
pub use transport::{resolve_uri, DefaultTransport, FileTransport, HttpTransport, Transport};
