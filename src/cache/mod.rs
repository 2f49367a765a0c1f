pub mod memory;
pub mod mysql_cache;
pub mod port;

pub use memory::InMemoryIdentityCache;
pub use mysql_cache::MySqlIdentityCache;
pub use port::IdentityCache;
