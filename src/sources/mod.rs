//! External data collaborators.
//!
//! The analyzers read their supporting data through the traits defined
//! here. The bundled implementations return fixed example data until real
//! search and on-chain sources are wired in.

pub mod features;
pub mod search;

pub use features::{estimate_risk, FeatureSource, FixtureFeatures, StaticFeatures};
pub use search::{EvidenceSearch, StaticSearch};
