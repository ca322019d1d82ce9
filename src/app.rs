//! Application State
//!
//! Central application state for caredesk. Every resource type gets its own
//! [`ResourceController`]; key handlers call its `on_*` handlers, and the
//! ones that reach the backend run on spawned tasks so the UI keeps
//! drawing while a call is in flight.

use anyhow::{Context, Result};
use caredesk::config::Config;
use caredesk::notification::{ChannelNotifier, DetailLevel, FeedbackEvent, NotificationManager};
use caredesk::resource::{
    get_all_resource_keys, get_resource, schema_handle, DialogState, DialogView, FieldChoice,
    FieldDef, FieldKind, Record, RecordId, ResourceController, ResourceSchema,
};
use caredesk::transport::{HttpTransport, MemoryTransport, Transport};
use crossterm::event::KeyCode;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::ops::Range;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinSet;

// =========================================================================
// Configuration Constants
// =========================================================================

/// Default viewport height (will be updated during render based on terminal size)
const DEFAULT_VIEWPORT_HEIGHT: usize = 20;

/// Application modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,        // Viewing list
    Command,       // : command input
    Help,          // ? help popup
    Form,          // Create/edit dialog
    Confirm,       // Delete confirmation
    Notifications, // Feedback history panel
}

/// Where records come from
#[derive(Debug, Clone)]
pub enum Backend {
    Http {
        base_url: String,
        client: reqwest::Client,
    },
    /// In-process memory store, no server needed
    Offline,
}

impl Backend {
    /// One shared reqwest client for every resource endpoint
    pub fn http(base_url: &str, timeout: Duration) -> Result<Self> {
        url::Url::parse(base_url).with_context(|| format!("Invalid base URL: {}", base_url))?;

        let client = reqwest::Client::builder()
            .user_agent(concat!("caredesk/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self::Http {
            base_url: base_url.to_string(),
            client,
        })
    }

    pub fn describe(&self) -> &str {
        match self {
            Self::Http { base_url, .. } => base_url,
            Self::Offline => "offline",
        }
    }

    fn transport_for(&self, schema: &ResourceSchema, timeout: Duration) -> Result<Arc<dyn Transport>> {
        let transport: Arc<dyn Transport> = match self {
            Self::Http { base_url, client } => Arc::new(HttpTransport::with_client(
                client.clone(),
                base_url,
                &schema.endpoint,
                timeout,
            )?),
            Self::Offline => Arc::new(MemoryTransport::new(&schema.endpoint)),
        };
        Ok(transport)
    }
}

/// Result of a background task, reaped on every tick
#[derive(Debug)]
pub enum TaskOutcome {
    /// A list fetch for this resource finished
    Loaded(String),
    Finished,
}

/// Delete waiting for a y/n answer
#[derive(Debug, Clone)]
pub struct PendingDelete {
    pub resource_key: String,
    pub id: RecordId,
    pub message: String,
    pub selected_yes: bool,
}

/// Raw text of each form field, in schema order
#[derive(Debug, Clone, Default)]
pub struct FormState {
    pub selected_field: usize,
    pub inputs: Vec<String>,
}

impl FormState {
    fn from_draft(controller: &ResourceController, draft: Option<&Record>) -> Self {
        let inputs = controller
            .schema()
            .fields
            .iter()
            .map(|field| {
                draft
                    .map(|d| controller.display_value(field, d))
                    .unwrap_or_default()
            })
            .collect();
        Self {
            selected_field: 0,
            inputs,
        }
    }
}

/// Main application state
pub struct App {
    pub backend: Backend,
    pub timeout: Duration,

    // One controller per resource type, created on first visit
    controllers: HashMap<String, Arc<ResourceController>>,
    notifier: ChannelNotifier,
    feedback_rx: UnboundedReceiver<FeedbackEvent>,
    tasks: JoinSet<TaskOutcome>,
    pub loading: HashSet<String>,

    // Current resource being viewed
    pub current_resource_key: String,
    pub items: Vec<Record>,
    pub filtered_items: Vec<Record>,

    // Name filter
    pub filter_text: String,
    pub filter_active: bool,

    // Navigation state
    pub selected: usize,
    pub mode: Mode,

    // Command input
    pub command_text: String,
    pub command_suggestions: Vec<String>,
    pub command_suggestion_selected: usize,
    pub command_preview: Option<String>,

    // Dialogs
    pub pending_delete: Option<PendingDelete>,
    pub form: FormState,

    // UI state
    pub error_message: Option<String>,

    // Persistent configuration
    pub config: Config,

    // Key press tracking
    pub last_key_press: Option<(KeyCode, Instant)>,

    // Notifications
    pub notification_manager: NotificationManager,
    pub notifications_selected: usize,

    // Virtual scrolling
    pub viewport_height: usize,
    pub scroll_offset: usize,
}

impl App {
    pub fn new(config: Config, backend: Backend, timeout: Duration, resource_key: &str) -> Self {
        let (notifier, feedback_rx) = ChannelNotifier::new();

        // Initialize notification manager with config settings
        let mut notification_manager = NotificationManager::new();
        notification_manager.detail_level =
            DetailLevel::from_str(&config.notifications.detail_level);
        notification_manager.toast_duration =
            Duration::from_secs(config.notifications.toast_duration_secs);
        notification_manager.max_history = config.notifications.max_history;

        Self {
            backend,
            timeout,
            controllers: HashMap::new(),
            notifier,
            feedback_rx,
            tasks: JoinSet::new(),
            loading: HashSet::new(),
            current_resource_key: resource_key.to_string(),
            items: Vec::new(),
            filtered_items: Vec::new(),
            filter_text: String::new(),
            filter_active: false,
            selected: 0,
            mode: Mode::Normal,
            command_text: String::new(),
            command_suggestions: Vec::new(),
            command_suggestion_selected: 0,
            command_preview: None,
            pending_delete: None,
            form: FormState::default(),
            error_message: None,
            config,
            last_key_press: None,
            notification_manager,
            notifications_selected: 0,
            viewport_height: DEFAULT_VIEWPORT_HEIGHT,
            scroll_offset: 0,
        }
    }

    // =========================================================================
    // Resource Access
    // =========================================================================

    pub fn current_resource(&self) -> Option<&'static ResourceSchema> {
        get_resource(&self.current_resource_key)
    }

    pub fn current_controller(&self) -> Option<&Arc<ResourceController>> {
        self.controllers.get(&self.current_resource_key)
    }

    pub fn dialog_view(&self) -> Option<DialogView> {
        self.current_controller().map(|c| c.dialog())
    }

    pub fn is_loading(&self) -> bool {
        self.loading.contains(&self.current_resource_key)
    }

    /// Records held for a resource that has been visited this session
    pub fn cached_count(&self, resource_key: &str) -> Option<usize> {
        self.controllers
            .get(resource_key)
            .map(|c| c.store().len())
    }

    /// True while an update or delete for this record is in flight
    pub fn is_busy(&self, record: &Record) -> bool {
        match (self.current_controller(), &record.id) {
            (Some(controller), Some(id)) => controller.store().is_pending(id),
            _ => false,
        }
    }

    pub fn pending_count(&self) -> usize {
        self.current_controller()
            .map(|c| c.store().pending_count())
            .unwrap_or(0)
    }

    pub fn get_available_commands(&self) -> Vec<String> {
        let mut commands: Vec<String> = get_all_resource_keys()
            .iter()
            .map(|s| s.to_string())
            .collect();

        // Add built-in commands
        commands.push("new".to_string());
        commands.push("refresh".to_string());
        commands.push("help".to_string());
        commands.push("notifications".to_string());
        commands.push("notifications clear".to_string());
        commands.push("quit".to_string());

        commands.sort();
        commands
    }

    fn ensure_controller(&mut self, key: &str) -> Result<Arc<ResourceController>> {
        if let Some(controller) = self.controllers.get(key) {
            return Ok(Arc::clone(controller));
        }

        let schema = schema_handle(key).with_context(|| format!("Unknown resource: {}", key))?;
        let transport = self.backend.transport_for(&schema, self.timeout)?;
        let mut controller =
            ResourceController::new(Arc::clone(&schema), transport, Arc::new(self.notifier.clone()))
                .with_timeout(self.timeout);

        // Reference fields pick from the target resource's own controller
        for field in schema.fields.iter().filter(|f| f.kind == FieldKind::Reference) {
            let Some(target_key) = field.reference.as_deref().filter(|k| *k != key) else {
                continue;
            };
            let target = self.ensure_controller(target_key)?;
            controller = controller.with_reference(&field.key, &target);
        }
        let controller = Arc::new(controller);

        tracing::debug!("Created controller for {}", key);
        self.controllers
            .insert(key.to_string(), Arc::clone(&controller));
        Ok(controller)
    }

    // =========================================================================
    // Data Fetching
    // =========================================================================

    /// Load the starting resource in the foreground (used behind the splash)
    pub async fn mount_current(&mut self) -> Result<()> {
        let key = self.current_resource_key.clone();
        let controller = self.ensure_controller(&key)?;
        for (_, target) in self.referenced_controllers(controller.schema()) {
            target.mount().await;
        }
        controller.mount().await;
        self.tick();
        Ok(())
    }

    /// Mount `controller` and the resources its reference fields pick from
    fn spawn_mount(&mut self, key: &str, controller: Arc<ResourceController>) {
        for (target_key, target) in self.referenced_controllers(controller.schema()) {
            self.spawn_load(target_key, target);
        }
        self.spawn_load(key.to_string(), controller);
    }

    fn spawn_load(&mut self, key: String, controller: Arc<ResourceController>) {
        self.loading.insert(key.clone());
        self.tasks.spawn(async move {
            controller.mount().await;
            TaskOutcome::Loaded(key)
        });
    }

    fn referenced_controllers(&self, schema: &ResourceSchema) -> Vec<(String, Arc<ResourceController>)> {
        schema
            .referenced_resources()
            .filter_map(|key| {
                self.controllers
                    .get(key)
                    .map(|c| (key.to_string(), Arc::clone(c)))
            })
            .collect()
    }

    pub fn refresh_current(&mut self) {
        let Some(controller) = self.current_controller().cloned() else {
            return;
        };
        let key = self.current_resource_key.clone();
        self.error_message = None;
        self.loading.insert(key.clone());
        self.tasks.spawn(async move {
            controller.on_refresh_requested().await;
            TaskOutcome::Loaded(key)
        });
    }

    /// Reap finished tasks, collect feedback and resync the table.
    /// Called once per event loop iteration.
    pub fn tick(&mut self) {
        while let Some(joined) = self.tasks.try_join_next() {
            match joined {
                Ok(TaskOutcome::Loaded(key)) => {
                    self.loading.remove(&key);
                },
                Ok(TaskOutcome::Finished) => {},
                Err(e) => tracing::error!("Background task failed: {}", e),
            }
        }

        while let Ok(event) = self.feedback_rx.try_recv() {
            self.record_feedback(event);
        }

        self.sync_items();

        // A successful save closes the dialog from the background task
        if self.mode == Mode::Form
            && !self
                .dialog_view()
                .map(|view| view.state.is_open())
                .unwrap_or(false)
        {
            self.mode = Mode::Normal;
        }
    }

    fn record_feedback(&mut self, event: FeedbackEvent) {
        if event.is_error() {
            tracing::warn!("[{}] {}", event.resource, event.message);
        } else {
            tracing::info!("[{}] {}", event.resource, event.message);
        }

        if self.config.notifications.enabled {
            self.notification_manager.push(event);
        } else if event.is_error() {
            self.error_message = Some(event.message);
        }
    }

    fn sync_items(&mut self) {
        self.items = self
            .current_controller()
            .map(|c| c.records())
            .unwrap_or_default();
        self.apply_filter();
    }

    // =========================================================================
    // Filtering
    // =========================================================================

    /// Keep the records whose name contains the filter text, ignoring case
    pub fn apply_filter(&mut self) {
        let needle = self.filter_text.trim().to_lowercase();

        self.filtered_items = match self.current_resource() {
            Some(schema) if !needle.is_empty() => self
                .items
                .iter()
                .filter(|record| schema.record_label(record).to_lowercase().contains(&needle))
                .cloned()
                .collect(),
            _ => self.items.clone(),
        };

        if self.selected >= self.filtered_items.len() {
            self.selected = self.filtered_items.len().saturating_sub(1);
        }
    }

    pub fn start_filter(&mut self) {
        self.filter_active = true;
    }

    /// Filter text changed; indices into the old list are meaningless now
    pub fn update_filter(&mut self) {
        self.selected = 0;
        self.scroll_offset = 0;
        self.apply_filter();
    }

    pub fn clear_filter(&mut self) {
        self.filter_text.clear();
        self.filter_active = false;
        self.update_filter();
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    pub fn selected_item(&self) -> Option<&Record> {
        self.filtered_items.get(self.selected)
    }

    pub fn next(&mut self) {
        match self.mode {
            Mode::Notifications => {
                let len = self.notification_manager.notifications.len();
                if len > 0 {
                    self.notifications_selected = (self.notifications_selected + 1).min(len - 1);
                }
            },
            _ => {
                if !self.filtered_items.is_empty() {
                    self.selected = (self.selected + 1).min(self.filtered_items.len() - 1);
                }
            },
        }
    }

    pub fn previous(&mut self) {
        match self.mode {
            Mode::Notifications => {
                self.notifications_selected = self.notifications_selected.saturating_sub(1);
            },
            _ => {
                self.selected = self.selected.saturating_sub(1);
            },
        }
    }

    pub fn go_to_top(&mut self) {
        self.selected = 0;
    }

    pub fn go_to_bottom(&mut self) {
        if !self.filtered_items.is_empty() {
            self.selected = self.filtered_items.len() - 1;
        }
    }

    pub fn page_down(&mut self, page_size: usize) {
        if !self.filtered_items.is_empty() {
            self.selected = (self.selected + page_size).min(self.filtered_items.len() - 1);
        }
    }

    pub fn page_up(&mut self, page_size: usize) {
        self.selected = self.selected.saturating_sub(page_size);
    }

    // =========================================================================
    // Mode Transitions
    // =========================================================================

    pub fn enter_command_mode(&mut self) {
        self.mode = Mode::Command;
        self.command_text.clear();
        self.command_suggestions = self.get_available_commands();
        self.command_suggestion_selected = 0;
        self.update_preview();
    }

    pub fn update_command_suggestions(&mut self) {
        let input = self.command_text.to_lowercase();
        let all_commands = self.get_available_commands();

        if input.is_empty() {
            self.command_suggestions = all_commands;
        } else {
            self.command_suggestions = all_commands
                .into_iter()
                .filter(|cmd| cmd.starts_with(&input))
                .collect();
        }

        if self.command_suggestion_selected >= self.command_suggestions.len() {
            self.command_suggestion_selected = 0;
        }

        self.update_preview();
    }

    fn update_preview(&mut self) {
        self.command_preview = self
            .command_suggestions
            .get(self.command_suggestion_selected)
            .cloned();
    }

    pub fn next_suggestion(&mut self) {
        if !self.command_suggestions.is_empty() {
            self.command_suggestion_selected =
                (self.command_suggestion_selected + 1) % self.command_suggestions.len();
            self.update_preview();
        }
    }

    pub fn prev_suggestion(&mut self) {
        if !self.command_suggestions.is_empty() {
            if self.command_suggestion_selected == 0 {
                self.command_suggestion_selected = self.command_suggestions.len() - 1;
            } else {
                self.command_suggestion_selected -= 1;
            }
            self.update_preview();
        }
    }

    pub fn apply_suggestion(&mut self) {
        if let Some(preview) = &self.command_preview {
            self.command_text = preview.clone();
            self.update_command_suggestions();
        }
    }

    pub fn enter_help_mode(&mut self) {
        self.mode = Mode::Help;
    }

    pub fn enter_notifications_mode(&mut self) {
        self.notifications_selected = 0;
        self.notification_manager.dismiss_toast();
        self.mode = Mode::Notifications;
    }

    pub fn exit_mode(&mut self) {
        self.mode = Mode::Normal;
        self.pending_delete = None;
    }

    // =========================================================================
    // Create / Edit
    // =========================================================================

    pub fn open_create_form(&mut self) {
        let Some(controller) = self.current_controller().cloned() else {
            return;
        };
        controller.on_create_requested();
        self.open_form(&controller);
    }

    pub fn open_edit_form(&mut self) {
        let Some(record) = self.selected_item().cloned() else {
            return;
        };
        let Some(controller) = self.current_controller().cloned() else {
            return;
        };
        controller.on_edit_requested(&record);
        self.open_form(&controller);
    }

    fn open_form(&mut self, controller: &ResourceController) {
        let view = controller.dialog();
        if !view.state.is_open() {
            return;
        }
        self.form = FormState::from_draft(controller, view.draft.as_ref());
        self.mode = Mode::Form;
    }

    pub fn is_submitting(&self) -> bool {
        matches!(
            self.dialog_view().map(|v| v.state),
            Some(DialogState::Submitting(_))
        )
    }

    pub fn next_field(&mut self) {
        let count = self.form.inputs.len();
        if count > 0 {
            self.form.selected_field = (self.form.selected_field + 1) % count;
        }
    }

    pub fn prev_field(&mut self) {
        let count = self.form.inputs.len();
        if count > 0 {
            self.form.selected_field = (self.form.selected_field + count - 1) % count;
        }
    }

    pub fn form_input_char(&mut self, c: char) {
        if self.picks_from_list() {
            return;
        }
        if let Some(input) = self.form.inputs.get_mut(self.form.selected_field) {
            input.push(c);
        }
        self.push_selected_field();
    }

    pub fn form_backspace(&mut self) {
        if self.picks_from_list() {
            if let Some(input) = self.form.inputs.get_mut(self.form.selected_field) {
                input.clear();
            }
            if let Some(field) = self.selected_field() {
                self.set_selected_value(field.empty_value());
            }
            return;
        }
        if let Some(input) = self.form.inputs.get_mut(self.form.selected_field) {
            input.pop();
        }
        self.push_selected_field();
    }

    /// Step a choice or reference field through the values it can take
    pub fn cycle_choice(&mut self, forward: bool) {
        let choices = self.selected_choices();
        if choices.is_empty() {
            return;
        }
        let Some(input) = self.form.inputs.get_mut(self.form.selected_field) else {
            return;
        };

        let len = choices.len();
        let next = match choices.iter().position(|c| &c.label == input) {
            Some(idx) if forward => (idx + 1) % len,
            Some(idx) => (idx + len - 1) % len,
            None if forward => 0,
            None => len - 1,
        };
        *input = choices[next].label.clone();
        self.set_selected_value(choices[next].value.clone());
    }

    fn selected_field(&self) -> Option<&'static FieldDef> {
        self.current_resource()?.fields.get(self.form.selected_field)
    }

    fn selected_choices(&self) -> Vec<FieldChoice> {
        self.selected_field()
            .map(|field| self.field_choices(field))
            .unwrap_or_default()
    }

    pub fn field_choices(&self, field: &FieldDef) -> Vec<FieldChoice> {
        match self.current_controller() {
            Some(controller) if field.kind.is_selectable() => controller.choices(&field.key),
            _ => Vec::new(),
        }
    }

    /// Selectable fields take typed input only while nothing is offered
    fn picks_from_list(&self) -> bool {
        !self.selected_choices().is_empty()
    }

    fn push_selected_field(&mut self) {
        let Some(field) = self.selected_field() else {
            return;
        };
        let Some(input) = self.form.inputs.get(self.form.selected_field) else {
            return;
        };
        self.set_selected_value(field.parse_input(input));
    }

    fn set_selected_value(&self, value: Value) {
        let (Some(field), Some(controller)) = (self.selected_field(), self.current_controller()) else {
            return;
        };
        if let Err(e) = controller.on_field_changed(&field.key, value) {
            tracing::debug!("Ignored edit of {}: {}", field.key, e);
        }
    }

    pub fn save_form(&mut self) {
        if self.is_submitting() {
            return;
        }
        let Some(controller) = self.current_controller().cloned() else {
            return;
        };
        // Submitting before the task exists, so a second Enter finds it busy
        let Ok(submission) = controller.begin_save() else {
            return;
        };
        self.tasks.spawn(async move {
            controller.finish_save(submission).await;
            TaskOutcome::Finished
        });
    }

    pub fn cancel_form(&mut self) {
        if let Some(controller) = self.current_controller() {
            controller.on_cancel_requested();
        }
        self.form = FormState::default();
        self.mode = Mode::Normal;
    }

    // =========================================================================
    // Delete
    // =========================================================================

    pub fn request_delete(&mut self) {
        let Some(record) = self.selected_item() else {
            return;
        };
        let Some(schema) = self.current_resource() else {
            return;
        };
        let Some(id) = record.id.clone() else {
            self.error_message = Some("Record has no id".to_string());
            return;
        };

        let label = schema.record_label(record);
        self.pending_delete = Some(PendingDelete {
            resource_key: self.current_resource_key.clone(),
            message: format!("Delete {} '{}'?", schema.singular.to_lowercase(), label),
            id,
            selected_yes: false,
        });
        self.mode = Mode::Confirm;
    }

    pub fn confirm_delete(&mut self) {
        let Some(pending) = self.pending_delete.take() else {
            return;
        };
        let Some(controller) = self.controllers.get(&pending.resource_key).cloned() else {
            return;
        };
        self.tasks.spawn(async move {
            controller.on_delete_requested(&pending.id).await;
            TaskOutcome::Finished
        });
    }

    // =========================================================================
    // Resource Navigation
    // =========================================================================

    pub fn navigate_to_resource(&mut self, resource_key: &str) {
        if get_resource(resource_key).is_none() {
            self.error_message = Some(format!("Unknown resource: {}", resource_key));
            return;
        }

        let controller = match self.ensure_controller(resource_key) {
            Ok(controller) => controller,
            Err(e) => {
                self.error_message = Some(format!("{:#}", e));
                return;
            },
        };

        self.current_resource_key = resource_key.to_string();
        self.filter_text.clear();
        self.filter_active = false;
        self.selected = 0;
        self.scroll_offset = 0;
        self.error_message = None;
        self.mode = Mode::Normal;

        self.spawn_mount(resource_key, controller);
        self.sync_items();

        if let Err(e) = self.config.set_last_resource(resource_key) {
            tracing::warn!("Failed to save last resource to config: {}", e);
        }
    }

    // =========================================================================
    // Command Execution
    // =========================================================================

    /// Run the command bar's text; returns true if the app should quit
    pub fn execute_command(&mut self) -> bool {
        let command_text = if self.command_text.is_empty() {
            self.command_preview.clone().unwrap_or_default()
        } else if let Some(preview) = &self.command_preview {
            if preview.starts_with(&self.command_text) {
                preview.clone()
            } else {
                self.command_text.clone()
            }
        } else {
            self.command_text.clone()
        };

        let parts: Vec<&str> = command_text.split_whitespace().collect();
        let Some(&cmd) = parts.first() else {
            return false;
        };

        match cmd {
            "q" | "quit" => return true,
            "help" => {
                self.enter_help_mode();
            },
            "refresh" => {
                self.exit_mode();
                self.refresh_current();
            },
            "new" => {
                self.exit_mode();
                self.open_create_form();
            },
            "notifications" => {
                if parts.get(1) == Some(&"clear") {
                    self.notification_manager.clear();
                    self.exit_mode();
                } else {
                    self.enter_notifications_mode();
                }
            },
            _ => {
                if get_resource(cmd).is_some() {
                    self.navigate_to_resource(cmd);
                } else {
                    self.exit_mode();
                    self.error_message = Some(format!("Unknown command: {}", cmd));
                }
            },
        }

        false
    }

    // =========================================================================
    // Virtual Scrolling
    // =========================================================================

    /// Update the viewport height (called from UI during render)
    pub fn update_viewport(&mut self, height: usize) {
        self.viewport_height = height.max(1);
    }

    /// Ensure the selected item is visible in the viewport
    pub fn ensure_visible(&mut self) {
        if self.filtered_items.is_empty() {
            self.scroll_offset = 0;
            return;
        }

        let visible_height = self.viewport_height;
        let margin = 2; // Keep cursor at least this far from edge

        if self.selected < self.scroll_offset + margin {
            self.scroll_offset = self.selected.saturating_sub(margin);
        } else if self.selected >= self.scroll_offset + visible_height.saturating_sub(margin) {
            self.scroll_offset = self
                .selected
                .saturating_sub(visible_height.saturating_sub(margin + 1));
        }

        let max_offset = self.filtered_items.len().saturating_sub(self.viewport_height);
        self.scroll_offset = self.scroll_offset.min(max_offset);
    }

    /// Get the range of visible items based on scroll offset and viewport
    pub fn visible_range(&self) -> Range<usize> {
        let start = self.scroll_offset.min(self.filtered_items.len());
        let end = (self.scroll_offset + self.viewport_height).min(self.filtered_items.len());
        start..end
    }

    #[cfg(test)]
    async fn settle(&mut self) {
        while let Some(joined) = self.tasks.join_next().await {
            if let Ok(TaskOutcome::Loaded(key)) = joined {
                self.loading.remove(&key);
            }
        }
        self.tick();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn offline_app(resource: &str) -> App {
        App::new(Config::default(), Backend::Offline, Duration::from_secs(5), resource)
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.form_input_char(c);
        }
    }

    #[tokio::test]
    async fn test_offline_create_shows_row_and_toast() {
        let mut app = offline_app("medications");
        app.mount_current().await.unwrap();
        assert!(app.items.is_empty());

        app.open_create_form();
        assert_eq!(app.mode, Mode::Form);
        type_text(&mut app, "Ibuprofen");
        app.next_field();
        type_text(&mut app, "4.5");
        app.save_form();
        app.settle().await;

        assert_eq!(app.mode, Mode::Normal);
        assert_eq!(app.items.len(), 1);
        assert_eq!(app.items[0].get("price"), Some(&json!(4.5)));
        let toast = app.notification_manager.current_toast().unwrap();
        assert_eq!(toast.event.message, "Medication created.");
    }

    #[tokio::test]
    async fn test_invalid_form_stays_open_with_errors() {
        let mut app = offline_app("medications");
        app.mount_current().await.unwrap();
        app.open_create_form();
        app.save_form();
        app.settle().await;

        assert_eq!(app.mode, Mode::Form);
        let view = app.dialog_view().unwrap();
        assert!(view.errors.get("name").is_some());
        assert!(app.notification_manager.current_toast().unwrap().event.is_error());
    }

    #[tokio::test]
    async fn test_cancel_closes_form_without_saving() {
        let mut app = offline_app("medications");
        app.mount_current().await.unwrap();
        app.open_create_form();
        type_text(&mut app, "Draft only");
        app.cancel_form();
        app.settle().await;

        assert_eq!(app.mode, Mode::Normal);
        assert!(app.items.is_empty());
        assert!(!app.dialog_view().unwrap().state.is_open());
    }

    #[tokio::test]
    async fn test_edit_then_delete_with_confirmation() {
        let mut app = offline_app("medications");
        app.mount_current().await.unwrap();
        app.open_create_form();
        type_text(&mut app, "Aspirin");
        app.next_field();
        type_text(&mut app, "3");
        app.save_form();
        app.settle().await;

        app.open_edit_form();
        assert_eq!(app.form.inputs[0], "Aspirin");
        type_text(&mut app, " 100mg");
        app.save_form();
        app.settle().await;
        assert_eq!(app.items[0].get("name"), Some(&json!("Aspirin 100mg")));

        app.request_delete();
        assert_eq!(app.mode, Mode::Confirm);
        assert_eq!(
            app.pending_delete.as_ref().unwrap().message,
            "Delete medication 'Aspirin 100mg'?"
        );
        app.confirm_delete();
        app.exit_mode();
        app.settle().await;
        assert!(app.items.is_empty());
    }

    #[tokio::test]
    async fn test_choice_field_cycles_options() {
        let mut app = offline_app("medical-insurances");
        app.mount_current().await.unwrap();
        app.open_create_form();

        let schema = app.current_resource().unwrap();
        let idx = schema
            .fields
            .iter()
            .position(|f| f.kind == FieldKind::Choice)
            .unwrap();
        let options = schema.fields[idx].options.clone();
        app.form.selected_field = idx;

        app.form_input_char('x');
        assert_eq!(app.form.inputs[idx], "");
        app.cycle_choice(true);
        assert_eq!(app.form.inputs[idx], options[0]);
        app.cycle_choice(false);
        assert_eq!(&app.form.inputs[idx], options.last().unwrap());
    }

    #[tokio::test]
    async fn test_command_suggestions_match_prefix() {
        let mut app = offline_app("clinics");
        app.enter_command_mode();
        app.command_text = "ord".to_string();
        app.update_command_suggestions();
        assert_eq!(app.command_suggestions, vec!["orders".to_string()]);
        assert_eq!(app.command_preview.as_deref(), Some("orders"));

        app.command_text = "q".to_string();
        app.update_command_suggestions();
        assert!(app.execute_command());
    }

    #[tokio::test]
    async fn test_unknown_command_sets_error() {
        let mut app = offline_app("clinics");
        app.enter_command_mode();
        app.command_text = "spaceships".to_string();
        app.update_command_suggestions();
        assert!(!app.execute_command());
        assert_eq!(app.error_message.as_deref(), Some("Unknown command: spaceships"));
        assert_eq!(app.mode, Mode::Normal);
    }

    #[tokio::test]
    async fn test_navigation_clamps_to_items() {
        let mut app = offline_app("clinics");
        app.items = (0..5).map(|i| Record::new().with_id(i)).collect();
        app.apply_filter();
        app.go_to_bottom();
        assert_eq!(app.selected, 4);
        app.next();
        assert_eq!(app.selected, 4);
        app.page_up(10);
        assert_eq!(app.selected, 0);
        app.previous();
        assert_eq!(app.selected, 0);
    }

    #[tokio::test]
    async fn test_ensure_visible_keeps_selection_in_view() {
        let mut app = offline_app("clinics");
        app.items = (0..100).map(|i| Record::new().with_id(i)).collect();
        app.apply_filter();
        app.update_viewport(10);

        app.selected = 50;
        app.ensure_visible();
        assert!(app.visible_range().contains(&50));

        app.selected = 0;
        app.ensure_visible();
        assert_eq!(app.visible_range(), 0..10);

        app.selected = 99;
        app.ensure_visible();
        assert_eq!(app.visible_range(), 90..100);
    }

    #[tokio::test]
    async fn test_filter_matches_names_case_insensitively() {
        let mut app = offline_app("hospitals");
        app.items = ["St. Mary", "General", "Mary Lane Clinic"]
            .iter()
            .enumerate()
            .map(|(i, name)| {
                Record::new()
                    .with_id(i as i64 + 1)
                    .with_field("hospitalNumber", format!("H-{}", i))
                    .with_field("hospitalName", *name)
            })
            .collect();
        app.apply_filter();
        assert_eq!(app.filtered_items.len(), 3);

        app.start_filter();
        app.filter_text = "MARY".to_string();
        app.update_filter();
        let names: Vec<_> = app
            .filtered_items
            .iter()
            .map(|r| r.get("hospitalName").cloned().unwrap())
            .collect();
        assert_eq!(names, vec![json!("St. Mary"), json!("Mary Lane Clinic")]);

        // selection and delete work on the filtered view
        app.go_to_bottom();
        assert_eq!(app.selected, 1);
        app.request_delete();
        assert_eq!(app.pending_delete.as_ref().unwrap().id, RecordId::Int(3));

        app.exit_mode();
        app.clear_filter();
        assert!(!app.filter_active);
        assert_eq!(app.filtered_items.len(), 3);
        assert_eq!(app.selected, 0);
    }

    #[tokio::test]
    async fn test_filter_survives_background_refresh() {
        let mut app = offline_app("pharmacies");
        app.mount_current().await.unwrap();
        for name in ["Corner", "Central", "Harbor"] {
            app.open_create_form();
            type_text(&mut app, name);
            app.next_field();
            type_text(&mut app, "1 Main St");
            app.next_field();
            type_text(&mut app, "555");
            app.save_form();
            app.settle().await;
        }

        app.filter_text = "c".to_string();
        app.update_filter();
        assert_eq!(app.filtered_items.len(), 2);

        app.refresh_current();
        app.settle().await;
        assert_eq!(app.items.len(), 3);
        assert_eq!(app.filtered_items.len(), 2);
    }

    #[tokio::test]
    async fn test_repeated_save_sends_one_create() {
        let mut app = offline_app("pharmacies");
        app.mount_current().await.unwrap();
        app.open_create_form();
        type_text(&mut app, "Corner");
        app.next_field();
        type_text(&mut app, "2 High St");
        app.next_field();
        type_text(&mut app, "555-0100");

        app.save_form();
        assert!(app.is_submitting());
        app.save_form();
        app.settle().await;

        assert_eq!(app.mode, Mode::Normal);
        assert_eq!(app.items.len(), 1);
        let history = &app.notification_manager.notifications;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].event.message, "Pharmacy created.");
    }

    #[tokio::test]
    async fn test_order_form_picks_medication_by_name() {
        let mut app = offline_app("medications");
        app.mount_current().await.unwrap();
        for (name, price) in [("Aspirin", "3"), ("Ibuprofen", "4.5")] {
            app.open_create_form();
            type_text(&mut app, name);
            app.next_field();
            type_text(&mut app, price);
            app.save_form();
            app.settle().await;
        }

        // switch without touching the config file
        app.current_resource_key = "orders".to_string();
        let orders = app.ensure_controller("orders").unwrap();
        app.spawn_mount("orders", orders);
        app.settle().await;
        app.open_create_form();
        assert_eq!(app.form.selected_field, 0);

        // typing is ignored while records are offered
        app.form_input_char('x');
        assert_eq!(app.form.inputs[0], "");
        app.cycle_choice(true);
        app.cycle_choice(true);
        assert_eq!(app.form.inputs[0], "Ibuprofen");

        let draft = app.dialog_view().unwrap().draft.unwrap();
        assert_eq!(draft.get("medication"), Some(&json!(2)));

        app.form_backspace();
        assert_eq!(app.form.inputs[0], "");
        let draft = app.dialog_view().unwrap().draft.unwrap();
        assert_eq!(draft.get("medication"), Some(&Value::Null));
    }

    #[tokio::test]
    async fn test_choice_without_options_accepts_typing() {
        let mut app = offline_app("reservations");
        app.mount_current().await.unwrap();
        app.open_create_form();

        let schema = app.current_resource().unwrap();
        let idx = schema.fields.iter().position(|f| f.key == "clinic").unwrap();
        app.form.selected_field = idx;
        type_text(&mut app, "East");

        assert_eq!(app.form.inputs[idx], "East");
        let draft = app.dialog_view().unwrap().draft.unwrap();
        assert_eq!(draft.get("clinic"), Some(&json!("East")));
    }
}
