//! ESI endpoints and location resolution.

mod location;
mod service;

pub use location::{CloneSystems, LocationResolver};
pub use service::{ESI_BASE_URL, EsiService, SSO_VERIFY_URL};
