pub mod memory;
pub mod mysql_directory;
pub mod port;

pub use memory::InMemoryUserDirectory;
pub use mysql_directory::MySqlUserDirectory;
pub use port::{UpsertUser, UserDirectory};
