pub mod cache;
pub mod resolver;
pub mod service;

pub use cache::IdentityCache;
pub use resolver::{
    DisplayIdentity, IdentityResolver, ResolutionError, ResolvedProfile, StaticIdentityResolver,
};
pub use service::{IdentityService, IdentityServiceConfig};
