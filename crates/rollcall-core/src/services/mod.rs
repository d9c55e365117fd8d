//! Services shared by every Rollcall front-end.

mod cache;
mod checkin;
mod local_store;
mod offline;

pub use cache::ResolutionCache;
pub use checkin::{
    can_undo_at, CheckinService, DEFAULT_UNDO_REASON, DEFAULT_UNDO_TIME_LIMIT_MS,
};
pub use local_store::LocalStore;
pub use offline::{OfflineCheckin, ReplayReport, SearchOutcome, SearchSource, Submission};
