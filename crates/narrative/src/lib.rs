pub mod cache;
pub mod collaborator;
pub mod fingerprint;
pub mod rate_limit;

pub use cache::NarrativeCache;
pub use collaborator::{AnalysisBackend, NarrativeCollaborator};
pub use fingerprint::{customer_fingerprint, route_fingerprint, CustomerSnapshot, RouteSnapshot};
pub use rate_limit::RateLimiter;
