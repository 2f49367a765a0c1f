pub mod auth_proxy;
pub mod extract;

pub use auth_proxy::{auth_proxy_logout, auth_proxy_middleware, with_auth_proxy, AuthProxy};
pub use extract::SignedIn;
