pub mod criteria;
pub mod model;
pub mod store;

pub use criteria::{Criteria, DiscoveryQuery, GroupEncoding, StateFilter};
pub use model::{Alias, Record, RecordSnapshot};
pub use store::{RecordStore, ResolveOutcome, short_name_hash};
