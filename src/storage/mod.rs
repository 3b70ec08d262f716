pub mod durable;
pub mod memory;
pub mod seed;
pub mod sqlite;
pub mod text;
pub mod tiered;
pub mod traits;

pub use durable::{DurableStore, MigrationReport};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use text::TextFileStore;
pub use tiered::{Mirror, TieredStore};
pub use traits::{FallbackStore, PrimaryStore};
