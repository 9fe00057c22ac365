pub mod registry;
pub mod scoring;
pub mod session;
pub mod storage;
pub mod types;

pub use registry::SessionRegistry;
pub use session::{ScoringParams, Session};
pub use storage::{PostgresSupervisionStorage, SupervisionStorage};
pub use types::{ItemDetail, ProcessVisitOutcome, SessionRecord, SessionSnapshot, SessionStatus, Visit};
