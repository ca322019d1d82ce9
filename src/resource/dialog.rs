//! Dialog Controller
//!
//! State machine for the create/edit dialog of one resource type:
//!
//! ```text
//! Closed --new--> CreatingDraft --save(valid)--> Submitting --ok--> Closed
//! Closed --edit-> EditingDraft  --save(valid)--> Submitting --err-> (back, draft kept)
//! CreatingDraft/EditingDraft --cancel--> Closed
//! ```
//!
//! Every open, cancel and submit bumps a generation counter. A transport
//! response is applied to the dialog only if its generation is still
//! current, so a late reply never closes or rewinds a dialog the user has
//! since cancelled or reopened.

use super::record::{Record, RecordId};
use super::registry::ResourceSchema;
use super::validation::{validate, ErrorMap};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// What a submission will do once it reaches the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftMode {
    Create,
    Edit(RecordId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogState {
    Closed,
    CreatingDraft,
    EditingDraft(RecordId),
    Submitting(DraftMode),
}

impl DialogState {
    pub fn is_open(&self) -> bool {
        !matches!(self, DialogState::Closed)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DialogError {
    #[error("no draft is open")]
    NotEditing,

    #[error("a save is already in progress")]
    AlreadySubmitting,

    #[error("unknown field: {0}")]
    UnknownField(String),

    #[error("record has no id")]
    MissingId,

    #[error("{} field(s) need attention", .0.len())]
    Invalid(ErrorMap),
}

/// A validated draft handed to the store
#[derive(Debug, Clone)]
pub struct Submission {
    pub generation: u64,
    pub mode: DraftMode,
    pub draft: Record,
}

/// Render-ready copy of the dialog
#[derive(Debug, Clone, PartialEq)]
pub struct DialogView {
    pub state: DialogState,
    pub draft: Option<Record>,
    pub errors: ErrorMap,
}

#[derive(Debug)]
pub struct DialogController {
    schema: Arc<ResourceSchema>,
    state: DialogState,
    draft: Option<Record>,
    errors: ErrorMap,
    generation: u64,
}

impl DialogController {
    pub fn new(schema: Arc<ResourceSchema>) -> Self {
        Self {
            schema,
            state: DialogState::Closed,
            draft: None,
            errors: ErrorMap::new(),
            generation: 0,
        }
    }

    pub fn state(&self) -> &DialogState {
        &self.state
    }

    pub fn draft(&self) -> Option<&Record> {
        self.draft.as_ref()
    }

    pub fn errors(&self) -> &ErrorMap {
        &self.errors
    }

    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }

    pub fn view(&self) -> DialogView {
        DialogView {
            state: self.state.clone(),
            draft: self.draft.clone(),
            errors: self.errors.clone(),
        }
    }

    /// Open an empty draft, discarding whatever was open before
    pub fn open_create(&mut self) {
        self.generation += 1;
        self.state = DialogState::CreatingDraft;
        self.draft = Some(Record::blank(&self.schema));
        self.errors.clear();
    }

    /// Open a copy of `record` for editing, discarding whatever was open before
    pub fn open_edit(&mut self, record: &Record) -> Result<(), DialogError> {
        let id = match &record.id {
            Some(id) if !id.is_empty() => id.clone(),
            _ => return Err(DialogError::MissingId),
        };
        self.generation += 1;
        self.state = DialogState::EditingDraft(id);
        self.draft = Some(record.to_draft(&self.schema));
        self.errors.clear();
        Ok(())
    }

    /// Close and drop the draft. An in-flight submission keeps running but
    /// can no longer affect the dialog.
    pub fn cancel(&mut self) -> bool {
        let was_open = self.is_open();
        self.generation += 1;
        self.state = DialogState::Closed;
        self.draft = None;
        self.errors.clear();
        was_open
    }

    pub fn set_field(&mut self, key: &str, value: Value) -> Result<(), DialogError> {
        match self.state {
            DialogState::CreatingDraft | DialogState::EditingDraft(_) => {},
            DialogState::Submitting(_) => return Err(DialogError::AlreadySubmitting),
            DialogState::Closed => return Err(DialogError::NotEditing),
        }
        if self.schema.field(key).is_none() {
            return Err(DialogError::UnknownField(key.to_string()));
        }
        let draft = self.draft.as_mut().ok_or(DialogError::NotEditing)?;
        draft.set(key, value);
        Ok(())
    }

    /// Validate and, if clean, move to `Submitting`. On validation failure
    /// the state is unchanged and the errors are kept for display.
    pub fn begin_submit(&mut self) -> Result<Submission, DialogError> {
        let mode = match &self.state {
            DialogState::CreatingDraft => DraftMode::Create,
            DialogState::EditingDraft(id) => DraftMode::Edit(id.clone()),
            DialogState::Submitting(_) => return Err(DialogError::AlreadySubmitting),
            DialogState::Closed => return Err(DialogError::NotEditing),
        };
        let draft = self.draft.as_ref().ok_or(DialogError::NotEditing)?;

        self.errors = validate(draft, &self.schema);
        if !self.errors.is_empty() {
            return Err(DialogError::Invalid(self.errors.clone()));
        }

        let mut draft = draft.clone();
        if let DraftMode::Edit(id) = &mode {
            draft.id = Some(id.clone());
        }

        self.generation += 1;
        self.state = DialogState::Submitting(mode.clone());
        Ok(Submission {
            generation: self.generation,
            mode,
            draft,
        })
    }

    /// Transport succeeded: close if the submission is still current
    pub fn complete_submit(&mut self, generation: u64) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        self.state = DialogState::Closed;
        self.draft = None;
        self.errors.clear();
        true
    }

    /// Transport failed: return to the pre-submit state with the draft intact
    pub fn fail_submit(&mut self, generation: u64) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        self.state = match &self.state {
            DialogState::Submitting(DraftMode::Create) => DialogState::CreatingDraft,
            DialogState::Submitting(DraftMode::Edit(id)) => DialogState::EditingDraft(id.clone()),
            other => other.clone(),
        };
        true
    }

    fn is_current(&self, generation: u64) -> bool {
        generation == self.generation && matches!(self.state, DialogState::Submitting(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::registry::FieldDef;
    use serde_json::json;

    fn controller() -> DialogController {
        let schema = ResourceSchema::new("clinics", "Clinic", "clinics")
            .with_field(FieldDef::required("name"))
            .with_field(FieldDef::required("address"));
        DialogController::new(Arc::new(schema))
    }

    fn fill(dialog: &mut DialogController) {
        dialog.set_field("name", json!("Acme")).unwrap();
        dialog.set_field("address", json!("1 Main St")).unwrap();
    }

    #[test]
    fn test_new_opens_blank_draft() {
        let mut dialog = controller();
        dialog.open_create();
        assert_eq!(dialog.state(), &DialogState::CreatingDraft);
        assert_eq!(
            dialog.draft().unwrap().to_json(),
            json!({"name": "", "address": ""})
        );
    }

    #[test]
    fn test_edit_copies_record() {
        let mut dialog = controller();
        let record = Record::new().with_id("42").with_field("name", "Acme");
        dialog.open_edit(&record).unwrap();
        assert_eq!(dialog.state(), &DialogState::EditingDraft(RecordId::from("42")));
        assert_eq!(dialog.draft().unwrap().get("name"), Some(&json!("Acme")));
    }

    #[test]
    fn test_edit_requires_persisted_record() {
        let mut dialog = controller();
        assert_eq!(
            dialog.open_edit(&Record::new()),
            Err(DialogError::MissingId)
        );
        assert!(!dialog.is_open());
    }

    #[test]
    fn test_cancel_discards_draft_and_errors() {
        let mut dialog = controller();
        dialog.open_create();
        assert!(dialog.begin_submit().is_err());
        assert!(!dialog.errors().is_empty());

        assert!(dialog.cancel());
        assert_eq!(dialog.state(), &DialogState::Closed);
        assert!(dialog.draft().is_none());
        assert!(dialog.errors().is_empty());
    }

    #[test]
    fn test_invalid_save_stays_open() {
        let mut dialog = controller();
        dialog.open_create();
        dialog.set_field("address", json!("X")).unwrap();

        let err = dialog.begin_submit().unwrap_err();
        let DialogError::Invalid(errors) = err else {
            panic!("expected validation errors");
        };
        assert_eq!(errors.get("name"), Some("Name is required."));
        assert_eq!(dialog.state(), &DialogState::CreatingDraft);
        assert_eq!(dialog.errors(), &errors);
    }

    #[test]
    fn test_errors_recomputed_on_every_attempt() {
        let mut dialog = controller();
        dialog.open_create();
        assert_eq!(dialog.begin_submit().map(|_| ()).unwrap_err().to_string(), "2 field(s) need attention");

        dialog.set_field("name", json!("Acme")).unwrap();
        assert!(dialog.begin_submit().is_err());
        assert_eq!(dialog.errors().len(), 1);
        assert!(dialog.errors().get("name").is_none());
    }

    #[test]
    fn test_submit_success_closes() {
        let mut dialog = controller();
        dialog.open_create();
        fill(&mut dialog);
        let submission = dialog.begin_submit().unwrap();
        assert_eq!(submission.mode, DraftMode::Create);
        assert_eq!(dialog.state(), &DialogState::Submitting(DraftMode::Create));

        assert!(dialog.complete_submit(submission.generation));
        assert_eq!(dialog.state(), &DialogState::Closed);
        assert!(dialog.draft().is_none());
    }

    #[test]
    fn test_submit_failure_restores_draft() {
        let mut dialog = controller();
        let record = Record::new().with_id(7).with_field("name", "Old");
        dialog.open_edit(&record).unwrap();
        dialog.set_field("name", json!("New")).unwrap();
        dialog.set_field("address", json!("Somewhere")).unwrap();
        let submission = dialog.begin_submit().unwrap();
        assert_eq!(submission.draft.id, Some(RecordId::Int(7)));

        assert!(dialog.fail_submit(submission.generation));
        assert_eq!(dialog.state(), &DialogState::EditingDraft(RecordId::Int(7)));
        assert_eq!(dialog.draft().unwrap().get("name"), Some(&json!("New")));
    }

    #[test]
    fn test_fields_locked_while_submitting() {
        let mut dialog = controller();
        dialog.open_create();
        fill(&mut dialog);
        dialog.begin_submit().unwrap();
        assert_eq!(
            dialog.set_field("name", json!("x")),
            Err(DialogError::AlreadySubmitting)
        );
        assert_eq!(
            dialog.begin_submit().unwrap_err(),
            DialogError::AlreadySubmitting
        );
    }

    #[test]
    fn test_unknown_field_rejected() {
        let mut dialog = controller();
        dialog.open_create();
        assert_eq!(
            dialog.set_field("nope", json!(1)),
            Err(DialogError::UnknownField("nope".into()))
        );
        assert_eq!(
            controller().set_field("name", json!("x")),
            Err(DialogError::NotEditing)
        );
    }

    #[test]
    fn test_late_response_after_cancel_is_ignored() {
        let mut dialog = controller();
        dialog.open_create();
        fill(&mut dialog);
        let submission = dialog.begin_submit().unwrap();
        dialog.cancel();

        assert!(!dialog.fail_submit(submission.generation));
        assert!(!dialog.complete_submit(submission.generation));
        assert_eq!(dialog.state(), &DialogState::Closed);
    }

    #[test]
    fn test_reopen_discards_previous_draft() {
        let mut dialog = controller();
        dialog.open_create();
        dialog.set_field("name", json!("First")).unwrap();
        dialog.open_create();
        assert_eq!(dialog.draft().unwrap().get("name"), Some(&json!("")));

        fill(&mut dialog);
        let stale = dialog.begin_submit().unwrap();
        dialog.open_create();
        assert!(!dialog.complete_submit(stale.generation));
        assert_eq!(dialog.state(), &DialogState::CreatingDraft);
    }
}
