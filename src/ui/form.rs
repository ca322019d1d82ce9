//! Form Dialog
//!
//! Create/edit form for the current resource: one line per schema field
//! with its required marker, the raw input and any validation message.
//! Choice and reference fields show the label of the picked value.

use super::centered_rect;
use crate::app::App;
use caredesk::resource::{DialogState, FieldKind};
use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

const LABEL_WIDTH: usize = 24;

pub fn render(f: &mut Frame, app: &App) {
    let Some(resource) = app.current_resource() else {
        return;
    };
    let Some(view) = app.dialog_view() else {
        return;
    };

    let (title, submitting) = match &view.state {
        DialogState::CreatingDraft => (format!(" New {} ", resource.singular), false),
        DialogState::EditingDraft(id) => (format!(" Edit {} {} ", resource.singular, id), false),
        DialogState::Submitting(_) => (format!(" {} ", resource.singular), true),
        DialogState::Closed => return,
    };

    // Two lines per field plus the footer
    let wanted = (resource.fields.len() as u16) * 2 + 4;
    let area = f.area();
    let base = centered_rect(70, 100, area);
    let height = wanted.min(area.height);
    let popup_area = Rect {
        y: area.y + (area.height - height) / 2,
        height,
        ..base
    };

    f.render_widget(Clear, popup_area);

    let border_color = if submitting { Color::Yellow } else { Color::Cyan };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(Span::styled(
            title,
            Style::default()
                .fg(border_color)
                .add_modifier(Modifier::BOLD),
        ));

    let mut lines: Vec<Line> = Vec::new();
    for (idx, field) in resource.fields.iter().enumerate() {
        let focused = idx == app.form.selected_field && !submitting;
        let input = app.form.inputs.get(idx).map(String::as_str).unwrap_or("");

        let marker = if field.required { "*" } else { " " };
        let label = format!(
            "{}{:<width$}",
            marker,
            field.label,
            width = LABEL_WIDTH - 1
        );
        let label_style = if focused {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        let offered = field.kind.is_selectable() && !app.field_choices(field).is_empty();
        let value = if offered {
            format!("< {} >", if input.is_empty() { "-" } else { input })
        } else if focused {
            format!("{}_", input)
        } else {
            input.to_string()
        };
        let value_style = if focused {
            Style::default().fg(Color::White).bg(Color::DarkGray)
        } else {
            Style::default().fg(Color::White)
        };

        lines.push(Line::from(vec![
            Span::styled(label, label_style),
            Span::styled(value, value_style),
        ]));

        let hint = match view.errors.get(&field.key) {
            Some(error) => Span::styled(
                format!("{:width$}{}", "", error, width = LABEL_WIDTH),
                Style::default().fg(Color::Red),
            ),
            None if field.kind == FieldKind::List && focused => Span::styled(
                format!("{:width$}comma separated", "", width = LABEL_WIDTH),
                Style::default().fg(Color::DarkGray),
            ),
            None if field.kind.is_selectable() && !offered && focused => Span::styled(
                format!("{:width$}nothing to pick from yet, type a value", "", width = LABEL_WIDTH),
                Style::default().fg(Color::DarkGray),
            ),
            None => Span::raw(""),
        };
        lines.push(Line::from(hint));
    }

    lines.push(Line::from(""));
    lines.push(if submitting {
        Line::from(Span::styled(
            "Saving...",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ))
        .alignment(Alignment::Center)
    } else {
        Line::from(Span::styled(
            "Enter: save  Tab/↑↓: move  ←/→: choose  Esc: cancel",
            Style::default().fg(Color::DarkGray),
        ))
        .alignment(Alignment::Center)
    });

    let paragraph = Paragraph::new(lines).block(block);
    f.render_widget(paragraph, popup_area);
}
