//! caredesk - terminal front end for a healthcare directory and intake portal
//!
//! The library holds everything that is independent of the terminal:
//! resource schemas, the generic resource controller, transports, feedback
//! notifications and configuration. The `caredesk` binary adds the ratatui
//! shell on top.

pub mod config;
pub mod notification;
pub mod resource;
pub mod transport;
