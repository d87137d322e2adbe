//! Links support-desk ticket ids on issue-tracker pages.
//!
//! The heavy lifting lives in the `linker` crate; this crate adds the host
//! side: coalescing page events into passes and filtering out the mutations
//! the linker causes itself.

pub mod host;
pub mod trigger;

pub use crate::host::{HostConfig, TicketLinker, is_relevant};
pub use crate::trigger::{DEFAULT_DEBOUNCE_MS, Debouncer, NavigationKind, RescanTrigger};
pub use dom;
pub use linker;
