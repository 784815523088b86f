//! Live-update subsystem.
//!
//! # Data Flow
//! ```text
//! WebSocket connect
//!     → broadcaster.rs (count client, ensure single polling worker)
//!     → worker re-reads each freshness source once per interval
//!     → changed fingerprint → push event on the fan-out channel
//!     → websocket.rs forwards the event to every live connection
//! WebSocket disconnect
//!     → count drops; worker exits within one interval of reaching zero
//! ```
//!
//! # Design Decisions
//! - At most one worker at any time (CAS on an active flag)
//! - Level triggered: no retries, no replay of missed events
//! - A failing client affects only its own connection

pub mod broadcaster;
pub mod sources;

pub use broadcaster::ChangeBroadcaster;
pub use sources::{
    FreshnessSource, PushEvent, EVENT_NEW_LOGS, EVENT_UPDATE_SERVICES, FIELD_LAST_LOGID,
    FIELD_LAST_TIMESTAMP,
};
