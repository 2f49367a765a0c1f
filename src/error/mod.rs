pub mod auth_proxy;
pub mod directory;
pub mod resolve;

pub use auth_proxy::AuthProxyError;
pub use directory::DirectoryError;
pub use resolve::ResolveError;
