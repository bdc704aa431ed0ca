pub mod controller;
pub mod history;
pub mod replay;
pub mod snapshot;
pub mod state;

pub use controller::{Capabilities, Outcome, OutcomeKind, Refusal, SessionController};
pub use history::{HistoryStack, HistorySummary, MAX_DEPTH};
pub use replay::{ReplayGuard, ReplayPermit};
pub use snapshot::{Adjustments, Field, Snapshot, FACTOR_MAX, FACTOR_MIN, IDENTITY_FACTOR};
pub use state::{
    Activity, Banner, BannerKind, Connection, Phase, SessionState, SessionView, ViewState,
};
