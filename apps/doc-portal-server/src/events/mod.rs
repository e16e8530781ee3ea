//! Real-time document events
//!
//! - `EventBus`: process-wide topic registry with per-subscriber queues
//! - `StreamSession`: the lifecycle of one observer connection
//!
//! Events are notifications, not records. The document store is the source
//! of truth; an observer that connects late, or whose queue overflowed,
//! re-reads the store.

mod bus;
mod session;
mod types;

pub use bus::{BusStats, EventBus, SubscriberId, Subscription};
pub use session::{SessionState, StreamSession};
pub use types::{DocumentEvent, EventKind, Topic};
