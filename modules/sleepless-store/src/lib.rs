pub mod analysis;
pub mod author;
pub mod corpus;
pub mod error;
pub mod index;
pub mod key;
pub mod store;
pub mod wakefulness;

pub use analysis::{score_authors, suspects, ScoringStats, Suspect};
pub use author::Author;
pub use corpus::{
    encode_corpus, load_corpus, load_from_reader, save_to_writer, set_aside,
    write_atomic, LoadStats,
};
pub use error::{Result, StoreError};
pub use index::{AuthorTable, ChainedTable, OrderedIndex};
pub use key::{AuthorKey, KeySpace};
pub use store::{ActivityStore, IngestOutcome, MAX_BUCKETS};
pub use wakefulness::{apply_wakefulness, max_awake_span, Wakefulness, AWAKE_HOURS, MIN_SLEEP_HOURS};
