//! Glue: The host-facing side of the bridge.
//!
//! The host platform calls into a [`Glue`] from its own callback thread.
//! Notifications that hand over a resource (window, input queue, activity
//! state, saved state) are rendezvous: the call returns only after the
//! event loop has applied them. Everything else is posted and returns
//! immediately.

mod activity;
pub(crate) mod converge;
#[allow(clippy::module_inception)]
mod glue;
mod host;

pub use activity::ActivityState;
pub use converge::Converge;
pub use glue::{Glue, GlueBuilder};
pub use host::{DetachedHost, Host};
