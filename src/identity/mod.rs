pub mod model;

pub use model::{AdditionalValues, ExternalIdentity, HeaderProperty, InternalUser, OrgRole, SignedInUser};
