// =============================================================================
// Position guard — trailing state, tier ladder, stop decisions, monitor loop
// =============================================================================

pub mod decision;
pub mod monitor;
pub mod tier;
pub mod trailing;

pub use decision::{decide, Decision};
pub use monitor::{run_monitor, Notifier, OrderExecutor, PositionSource};
pub use tier::{classify, Tier};
pub use trailing::TrailingStore;
