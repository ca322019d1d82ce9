//! Resource abstraction layer
//!
//! Every healthcare resource type (clinics, hospitals, pharmacies,
//! medications, orders, ...) is driven by the same generic machinery,
//! parameterized only by a [`ResourceSchema`]. Schemas are loaded from JSON
//! files at compile time, so a new resource type needs no code changes.
//!
//! # Architecture
//!
//! - [`registry`] - Loads and caches resource schemas from embedded JSON
//! - [`record`] - Record and identifier types
//! - [`validation`] - Required-field checks producing an [`ErrorMap`]
//! - [`store`] - Record set cache with per-record in-flight tracking
//! - [`dialog`] - Create/edit dialog state machine
//! - [`controller`] - Orchestrates the above with a transport and notifier
//!
//! # Example
//!
//! ```ignore
//! use caredesk::resource::{schema_handle, ResourceController};
//!
//! let schema = schema_handle("clinics").unwrap();
//! let controller = ResourceController::new(schema, transport, notifier);
//! controller.mount().await;
//! controller.on_create_requested();
//! controller.on_field_changed("name", "Acme".into())?;
//! let feedback = controller.on_save_requested().await;
//! ```

pub mod controller;
pub mod dialog;
pub mod record;
pub mod registry;
pub mod store;
pub mod validation;

pub use controller::ResourceController;
pub use dialog::{DialogController, DialogError, DialogState, DialogView, DraftMode, Submission};
pub use record::{Record, RecordId};
pub use registry::*;
pub use store::{ResourceStore, StoreError, DEFAULT_TIMEOUT};
pub use validation::{validate, ErrorMap};
