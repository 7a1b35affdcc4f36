//! Domain models for the country profile pipeline.

mod policy;
mod profile;
mod values;

pub use policy::*;
pub use profile::*;
pub use values::*;

pub use country_profile_remote::{DataPointRow, QueryRequest, ScopeMetadata};
