//! Usage: OAuth flow helpers: authorization URL construction, token endpoint
//! collaborators, and identity lookup.

pub(crate) mod authorize;
pub(crate) mod identity;
pub(crate) mod token_exchange;
