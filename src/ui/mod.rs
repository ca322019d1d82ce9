//! Terminal User Interface rendering module
//!
//! This module handles all UI rendering for caredesk using the ratatui
//! framework. Every resource type is shown through the same table and
//! form, driven by its schema.
//!
//! # Architecture
//!
//! - [`splash`] - Startup splash screen
//! - `header` - Header bar with backend and resource info
//! - `help` - Help overlay showing keybindings
//! - `dialog` - Delete confirmation
//! - `form` - Create/edit form
//! - `command_box` - Command mode input (`:` key)
//! - `notifications` - Feedback history panel
//!
//! # Virtual Scrolling
//!
//! The table rendering uses virtual scrolling for performance with large datasets.
//! Only visible rows are rendered, with a scrollbar indicating position.

mod command_box;
mod dialog;
mod form;
mod header;
mod help;
mod notifications;
pub mod splash;

use crate::app::{App, Mode};
use caredesk::notification::FeedbackKind;
use caredesk::resource::format_value;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{
        Block, Borders, Cell, Paragraph, Row, Scrollbar, ScrollbarOrientation, ScrollbarState,
        Table, TableState,
    },
    Frame,
};

/// Width of the id column
const ID_COLUMN_WIDTH: u16 = 8;

pub fn render(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5), // Header (multi-line)
            Constraint::Min(1),    // Main content
            Constraint::Length(1), // Footer/crumb
        ])
        .split(f.area());

    header::render(f, app, chunks[0]);
    render_main_content(f, app, chunks[1]);
    render_crumb(f, app, chunks[2]);

    // Overlays
    match app.mode {
        Mode::Help => help::render(f, app),
        Mode::Confirm => dialog::render(f, app),
        Mode::Form => form::render(f, app),
        Mode::Command => command_box::render(f, app),
        Mode::Notifications => notifications::render(f, app),
        Mode::Normal => {},
    }
}

fn render_main_content(f: &mut Frame, app: &mut App, area: Rect) {
    // If filter is active or has text, show filter input above table
    let show_filter = app.filter_active || !app.filter_text.is_empty();

    if show_filter {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(1)])
            .split(area);

        render_filter_bar(f, app, chunks[0]);
        render_dynamic_table(f, app, chunks[1]);
    } else {
        render_dynamic_table(f, app, area);
    }
}

fn render_filter_bar(f: &mut Frame, app: &App, area: Rect) {
    let style = if app.filter_active {
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    f.render_widget(Paragraph::new(Span::styled(filter_display(app), style)), area);
}

fn filter_display(app: &App) -> String {
    if app.filter_active {
        format!("/{}_", app.filter_text)
    } else {
        format!("/{}  (Esc clears)", app.filter_text)
    }
}

/// Render the record table for the current resource schema.
/// Uses virtual scrolling for performance with large datasets
fn render_dynamic_table(f: &mut Frame, app: &mut App, area: Rect) {
    let Some(resource) = app.current_resource() else {
        let msg = Paragraph::new("Unknown resource").style(Style::default().fg(Color::Red));
        f.render_widget(msg, area);
        return;
    };

    let title = {
        let busy = app.pending_count();
        if busy > 0 {
            format!(" {}[{}] ({} busy) ", resource.display_name, app.filtered_items.len(), busy)
        } else {
            format!(" {}[{}] ", resource.display_name, app.filtered_items.len())
        }
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            title,
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ))
        .title_alignment(Alignment::Center);

    let inner_area = block.inner(area);
    f.render_widget(block, area);

    if app.filtered_items.is_empty() {
        let text = if app.is_loading() {
            "Loading..."
        } else if !app.items.is_empty() {
            "No records match the filter."
        } else {
            "No records. Press n to create one."
        };
        let msg = Paragraph::new(text)
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center);
        f.render_widget(msg, inner_area);
        return;
    }

    // Calculate viewport - account for header row
    let visible_height = (inner_area.height as usize).saturating_sub(1);
    app.update_viewport(visible_height);
    app.ensure_visible();

    let total_items = app.filtered_items.len();
    let needs_scrollbar = total_items > visible_height;

    let table_area = if needs_scrollbar {
        Rect {
            width: inner_area.width.saturating_sub(1),
            ..inner_area
        }
    } else {
        inner_area
    };

    let range = app.visible_range();

    let header_style = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD);
    let mut header_cells = vec![Cell::from(" ID").style(header_style)];
    header_cells.extend(
        resource
            .fields
            .iter()
            .map(|field| Cell::from(format!(" {}", field.label)).style(header_style)),
    );
    let header = Row::new(header_cells).height(1);

    let controller = app.current_controller();

    // Build only visible rows (virtual scrolling)
    let rows: Vec<Row> = app.filtered_items[range.clone()]
        .iter()
        .map(|record| {
            let busy = app.is_busy(record);
            let id = record.id.as_ref().map(ToString::to_string).unwrap_or_default();
            let marker = if busy { "↻" } else { " " };

            let mut cells = vec![Cell::from(format!("{}{}", marker, id))
                .style(Style::default().fg(Color::DarkGray))];
            cells.extend(resource.fields.iter().map(|field| {
                let value = match controller {
                    Some(controller) => controller.display_value(field, record),
                    None => format_value(record.get(&field.key)),
                };
                Cell::from(format!(
                    " {}",
                    truncate_string(&value, field.width.saturating_sub(1) as usize)
                ))
            }));

            let row = Row::new(cells);
            if busy {
                row.style(Style::default().fg(Color::Yellow))
            } else {
                row
            }
        })
        .collect();

    let mut widths = vec![Constraint::Length(ID_COLUMN_WIDTH)];
    widths.extend(
        resource
            .fields
            .iter()
            .map(|field| Constraint::Length(field.width)),
    );

    let table = Table::new(rows, widths).header(header).row_highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    );

    // Adjust selected index for virtual scrolling
    let mut state = TableState::default();
    if app.selected >= range.start && app.selected < range.end {
        state.select(Some(app.selected - range.start));
    }

    f.render_stateful_widget(table, table_area, &mut state);

    if needs_scrollbar {
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .symbols(symbols::scrollbar::VERTICAL)
            .begin_symbol(Some("↑"))
            .end_symbol(Some("↓"));

        let mut scrollbar_state = ScrollbarState::new(total_items.saturating_sub(visible_height))
            .position(app.scroll_offset);

        f.render_stateful_widget(scrollbar, inner_area, &mut scrollbar_state);
    }
}

/// Truncate string for display (Unicode-safe)
pub(crate) fn truncate_string(s: &str, max_len: usize) -> String {
    let char_count = s.chars().count();
    if char_count > max_len {
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", truncated)
    } else {
        s.to_string()
    }
}

pub(crate) fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

fn render_crumb(f: &mut Frame, app: &App, area: Rect) {
    let toast = app.notification_manager.current_toast();
    let toast_text = toast.map(|notif| notif.toast_message(app.notification_manager.detail_level));

    let notification_indicator = {
        let errors = app.notification_manager.error_count();
        let total = app.notification_manager.notifications.len();
        if errors > 0 {
            format!(" [✗{}]", errors)
        } else if total > 0 {
            " [N]".to_string()
        } else {
            String::new()
        }
    };

    let status_text = if let Some(err) = &app.error_message {
        format!("Error: {}", err)
    } else if let Some(ref toast) = toast_text {
        toast.clone()
    } else if app.is_loading() {
        "Loading...".to_string()
    } else {
        match app.mode {
            Mode::Form => "Tab: next field | ←/→: choose | Enter: save | Esc: cancel".to_string(),
            _ => "n:new e:edit d:delete /:filter R:refresh".to_string(),
        }
    };

    let style = if app.error_message.is_some() {
        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
    } else if let Some(notif) = toast {
        match notif.event.kind {
            FeedbackKind::Success => Style::default().fg(Color::Green),
            FeedbackKind::Error => Style::default().fg(Color::Red),
        }
    } else if app.is_loading() {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let indicator_style = if app.notification_manager.error_count() > 0 {
        Style::default().fg(Color::Red)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let crumb = Line::from(vec![
        Span::styled(
            format!("<{}>", app.current_resource_key),
            Style::default().fg(Color::Black).bg(Color::Cyan),
        ),
        Span::raw(" "),
        Span::styled(status_text, style),
        Span::styled(notification_indicator, indicator_style),
    ]);

    f.render_widget(Paragraph::new(crumb), area);
}
