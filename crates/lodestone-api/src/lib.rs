//! The API serialization layer: turns decoded world data into JSON and
//! binary responses, negotiates content by trailing path extension, and
//! gates member-only endpoints through the directory capability.

pub mod assets;
pub mod config;
pub mod directory;
pub mod handlers;
pub mod routes;
pub mod stats;

pub use assets::AssetTables;
pub use config::Config;
pub use directory::{Directory, StaticDirectory};
pub use routes::{ApiTree, Response};

/// Everything a handler needs, constructed once at startup. Immutable for
/// the life of the process; requests share it without locking.
pub struct ApiContext {
    pub directory: Box<dyn Directory>,
    pub tables: AssetTables,
}
