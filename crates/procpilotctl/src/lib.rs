//! Procpilot Control - CLI front end for the procpilot engine
//!
//! Session handling, REPL, terminal display and tracing setup. The binary
//! in `main.rs` only parses arguments and wires the real collaborators.

pub mod display;
pub mod logging;
pub mod repl;
pub mod session;

pub use display::Display;
pub use session::{Reply, Session};

/// Version embedded at build time
pub const VERSION: &str = env!("PROCPILOT_VERSION");
