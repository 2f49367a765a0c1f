pub mod key;
pub mod resolver;

pub use key::{derive_key, derive_key_with_extras, CACHE_PREFIX};
pub use resolver::{AuthProxyResolver, ResolverSettings};
