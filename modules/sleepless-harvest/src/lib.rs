pub mod harvester;
pub mod resume;
pub mod session;
pub mod shutdown;
pub mod source;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use harvester::{HarvestReport, Harvester, RunEnd};
pub use resume::{load_tolerant, resume_corpus};
pub use session::{HarvestState, PollDecision, Session};
pub use source::{PostSource, SearchRequest, SourceError};
