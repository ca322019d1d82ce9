//! Resource Controller
//!
//! Ties a schema, its [`ResourceStore`], its [`DialogController`] and a
//! [`Notifier`] into the full list/create/edit/delete flow. One controller
//! exists per resource type; the presentation layer only calls the
//! `on_*` handlers and reads snapshots.
//!
//! Handlers never fail: every transport or local rejection ends as an
//! error [`FeedbackEvent`], and the record set and draft stay at their
//! last consistent state. The dialog lock is never held across an await,
//! so the record set remains readable while calls are in flight.
//!
//! Choice fields may be fed by an option list the backend serves, and
//! reference fields pick from another controller's records; both are
//! exposed through [`ResourceController::choices`].

use super::dialog::{DialogController, DialogError, DialogView, DraftMode, Submission};
use super::record::{Record, RecordId};
use super::registry::{format_value, FieldChoice, FieldDef, FieldKind, ResourceSchema};
use super::store::{ResourceStore, StoreError};
use crate::notification::{FeedbackEvent, Notifier, Operation};
use crate::transport::{format_transport_error, Transport};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Records a reference field picks from
struct ReferenceSource {
    schema: Arc<ResourceSchema>,
    store: ResourceStore,
}

pub struct ResourceController {
    schema: Arc<ResourceSchema>,
    store: ResourceStore,
    dialog: Mutex<DialogController>,
    notifier: Arc<dyn Notifier>,
    // Served option lists by field key
    options: Mutex<HashMap<String, Vec<FieldChoice>>>,
    references: HashMap<String, ReferenceSource>,
}

impl ResourceController {
    pub fn new(
        schema: Arc<ResourceSchema>,
        transport: Arc<dyn Transport>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            dialog: Mutex::new(DialogController::new(Arc::clone(&schema))),
            store: ResourceStore::new(transport),
            schema,
            notifier,
            options: Mutex::new(HashMap::new()),
            references: HashMap::new(),
        }
    }

    /// Let reference field `field_key` pick from `target`'s records.
    /// The record set is shared, so later loads of `target` show up here.
    pub fn with_reference(mut self, field_key: &str, target: &ResourceController) -> Self {
        self.references.insert(
            field_key.to_string(),
            ReferenceSource {
                schema: Arc::clone(&target.schema),
                store: target.store.clone(),
            },
        );
        self
    }

    /// Bound every transport call by `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.store = self.store.with_timeout(timeout);
        self
    }

    pub fn schema(&self) -> &ResourceSchema {
        &self.schema
    }

    pub fn store(&self) -> &ResourceStore {
        &self.store
    }

    pub fn records(&self) -> Vec<Record> {
        self.store.records()
    }

    pub fn dialog(&self) -> DialogView {
        self.dialog_mut().view()
    }

    // =========================================================================
    // List
    // =========================================================================

    /// Initial fetch of the records and option lists. Only failures
    /// produce feedback; the returned event is the record load's.
    pub async fn mount(&self) -> Option<FeedbackEvent> {
        let loaded = match self.store.load().await {
            Ok(_) => None,
            Err(err) => Some(self.emit(self.failure(Operation::Load, &err))),
        };
        self.load_options().await;
        loaded
    }

    /// Fetch the served option list of every choice field that has one.
    /// A field with built-in options falls back to them quietly; a field
    /// without any is reported.
    pub async fn load_options(&self) -> Vec<FeedbackEvent> {
        let mut failures = Vec::new();

        for field in &self.schema.fields {
            let Some(path) = field.options_endpoint.as_deref() else {
                continue;
            };
            match self.store.fetch_options(path).await {
                Ok(values) => {
                    let choices = values.into_iter().map(FieldChoice::from_value).collect();
                    self.options_mut().insert(field.key.clone(), choices);
                },
                Err(err) if !field.options.is_empty() => {
                    tracing::warn!("Using built-in {} options for {}: {}", field.key, self.schema.key, err);
                },
                Err(err) => {
                    tracing::warn!("No {} options for {}: {}", field.key, self.schema.key, err);
                    let reason = match &err {
                        StoreError::Transport(transport) => format_transport_error(transport),
                        other => format!("{}.", other),
                    };
                    failures.push(self.emit(FeedbackEvent::error(
                        &self.schema.key,
                        Operation::Load,
                        format!("Failed to load {} options: {}", field.label.to_lowercase(), reason),
                    )));
                },
            }
        }

        failures
    }

    /// User-requested reload
    pub async fn on_refresh_requested(&self) -> FeedbackEvent {
        match self.store.load().await {
            Ok(records) => self.emit(FeedbackEvent::success(
                &self.schema.key,
                Operation::Load,
                format!("{} {} loaded.", records.len(), self.schema.display_name.to_lowercase()),
            )),
            Err(err) => self.emit(self.failure(Operation::Load, &err)),
        }
    }

    // =========================================================================
    // Choices
    // =========================================================================

    /// Values a choice or reference field can take, in display order.
    /// Served options win over built-in ones once they are loaded.
    pub fn choices(&self, field_key: &str) -> Vec<FieldChoice> {
        let Some(field) = self.schema.field(field_key) else {
            return Vec::new();
        };

        match field.kind {
            FieldKind::Reference => self
                .references
                .get(field_key)
                .map(|source| {
                    source
                        .store
                        .records()
                        .iter()
                        .filter_map(|record| {
                            Some(FieldChoice {
                                value: serde_json::to_value(record.id.as_ref()?).ok()?,
                                label: source.schema.record_label(record),
                            })
                        })
                        .collect()
                })
                .unwrap_or_default(),
            FieldKind::Choice => {
                let served = self.options_mut().get(field_key).cloned().unwrap_or_default();
                if !served.is_empty() {
                    return served;
                }
                field
                    .options
                    .iter()
                    .map(|o| FieldChoice::from_value(Value::String(o.clone())))
                    .collect()
            },
            _ => Vec::new(),
        }
    }

    /// Text shown for `field` of `record`. References show the label of
    /// the record they point at when it is loaded.
    pub fn display_value(&self, field: &FieldDef, record: &Record) -> String {
        let value = record.get(&field.key);

        if let (Some(source), Some(value)) = (self.references.get(&field.key), value) {
            let target = serde_json::from_value::<RecordId>(value.clone())
                .ok()
                .and_then(|id| source.store.get(&id));
            if let Some(target) = target {
                return source.schema.record_label(&target);
            }
        }

        format_value(value)
    }

    // =========================================================================
    // Dialog
    // =========================================================================

    pub fn on_create_requested(&self) {
        self.dialog_mut().open_create();
    }

    pub fn on_edit_requested(&self, record: &Record) {
        let opened = self.dialog_mut().open_edit(record);
        if let Err(err) = opened {
            tracing::warn!("Cannot edit {} record: {}", self.schema.key, err);
            self.emit(FeedbackEvent::error(
                &self.schema.key,
                Operation::Update,
                format!("This {} cannot be edited: {}.", self.singular_lower(), err),
            ));
        }
    }

    pub fn on_field_changed(&self, key: &str, value: Value) -> Result<(), DialogError> {
        self.dialog_mut().set_field(key, value)
    }

    pub fn on_cancel_requested(&self) {
        self.dialog_mut().cancel();
    }

    /// Validate the draft, send it, and report the outcome
    pub async fn on_save_requested(&self) -> FeedbackEvent {
        match self.begin_save() {
            Ok(submission) => self.finish_save(submission).await,
            Err(rejected) => rejected,
        }
    }

    /// Synchronous half of a save: validate and move the dialog to
    /// Submitting. Once this returns `Ok`, a repeated save is rejected even
    /// if [`Self::finish_save`] has not been polled yet. A rejection has
    /// already been emitted when it is returned.
    pub fn begin_save(&self) -> Result<Submission, FeedbackEvent> {
        let submission = self.dialog_mut().begin_submit();

        submission.map_err(|err| match err {
            DialogError::Invalid(errors) => self.emit(FeedbackEvent::error(
                &self.schema.key,
                Operation::Validate,
                format!(
                    "Please correct the highlighted field{}.",
                    if errors.len() == 1 { "" } else { "s" }
                ),
            )),
            err => self.emit(FeedbackEvent::error(
                &self.schema.key,
                Operation::Validate,
                format!("Cannot save: {}.", err),
            )),
        })
    }

    /// Send a submission taken by [`Self::begin_save`] and settle the dialog
    pub async fn finish_save(&self, submission: Submission) -> FeedbackEvent {
        let (operation, result) = match &submission.mode {
            DraftMode::Create => (
                Operation::Create,
                self.store.create(&submission.draft).await.map(|_| ()),
            ),
            DraftMode::Edit(_) => (
                Operation::Update,
                self.store.update(&submission.draft).await.map(|_| ()),
            ),
        };

        match result {
            Ok(()) => {
                if !self.dialog_mut().complete_submit(submission.generation) {
                    tracing::debug!("Save finished after the {} dialog moved on", self.schema.key);
                }
                self.emit(self.success(operation))
            },
            Err(err) => {
                tracing::warn!("Failed to {} {}: {}", operation.verb(), self.schema.key, err);
                self.dialog_mut().fail_submit(submission.generation);
                self.emit(self.failure(operation, &err))
            },
        }
    }

    // =========================================================================
    // Delete
    // =========================================================================

    /// Delete without going through the dialog
    pub async fn on_delete_requested(&self, id: &RecordId) -> FeedbackEvent {
        match self.store.remove(id).await {
            Ok(()) => self.emit(self.success(Operation::Delete)),
            Err(err) => {
                tracing::warn!("Failed to delete {} {}: {}", self.schema.key, id, err);
                self.emit(self.failure(Operation::Delete, &err))
            },
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn dialog_mut(&self) -> MutexGuard<'_, DialogController> {
        self.dialog.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn options_mut(&self) -> MutexGuard<'_, HashMap<String, Vec<FieldChoice>>> {
        self.options.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: FeedbackEvent) -> FeedbackEvent {
        self.notifier.notify(event.clone());
        event
    }

    fn singular_lower(&self) -> String {
        self.schema.singular.to_lowercase()
    }

    fn success(&self, operation: Operation) -> FeedbackEvent {
        FeedbackEvent::success(
            &self.schema.key,
            operation,
            format!("{} {}.", self.schema.singular, operation.past_tense()),
        )
    }

    fn failure(&self, operation: Operation, err: &StoreError) -> FeedbackEvent {
        let message = match err {
            StoreError::Busy(id) => format!(
                "{} {} is busy. Wait for the current operation to finish.",
                self.schema.singular, id
            ),
            StoreError::Transport(transport) if operation == Operation::Load => format!(
                "Failed to load {}: {}",
                self.schema.display_name.to_lowercase(),
                format_transport_error(transport)
            ),
            StoreError::Transport(transport) => format!(
                "Failed to {} {}: {}",
                operation.verb(),
                self.singular_lower(),
                format_transport_error(transport)
            ),
            StoreError::MissingId | StoreError::UnknownRecord(_) => format!(
                "Failed to {} {}: {}.",
                operation.verb(),
                self.singular_lower(),
                err
            ),
        };
        FeedbackEvent::error(&self.schema.key, operation, message)
    }
}
