pub mod provider;
pub mod resolver;

pub use provider::{IdentityProvider, IdentityRecord};
pub use resolver::IdentityResolver;
