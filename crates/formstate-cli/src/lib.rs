//! Scenario runner for the formstate controller.
//!
//! Scenarios script a user's session against a form. The runner replays them
//! with scripted transports and reports what the controller published.

pub mod harness;
pub mod logging;
pub mod replay;
pub mod scenario;
