pub mod blocking;
pub mod mysql_adapter;
pub mod port;

#[cfg(test)]
pub(crate) mod testing;

pub use mysql_adapter::MySqlDb;
pub use port::{Db, Param, Row, Value};
