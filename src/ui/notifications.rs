//! Notifications Panel UI
//!
//! Feedback history, newest first, with the selected entry's full message
//! underneath since table rows are truncated.

use super::{centered_rect, truncate_string};
use crate::app::App;
use caredesk::notification::{FeedbackKind, Notification};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
    Frame,
};

fn kind_color(kind: FeedbackKind) -> Color {
    match kind {
        FeedbackKind::Success => Color::Green,
        FeedbackKind::Error => Color::Red,
    }
}

fn history_row(notif: &Notification, message_width: usize) -> Row<'static> {
    let color = kind_color(notif.event.kind);
    Row::new(vec![
        Cell::from(notif.event.kind.icon()).style(Style::default().fg(color)),
        Cell::from(notif.time_display()),
        Cell::from(notif.event.operation.display_name()),
        Cell::from(truncate_string(&notif.event.resource, 18)),
        Cell::from(truncate_string(&notif.event.message, message_width)),
    ])
}

fn detail_lines(notif: &Notification) -> Vec<Line<'_>> {
    vec![
        Line::from(vec![
            Span::styled(
                format!("{} {} ", notif.event.kind.icon(), notif.event.operation.display_name()),
                Style::default()
                    .fg(kind_color(notif.event.kind))
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("{} at {}", notif.event.resource, notif.timestamp.format("%Y-%m-%d %H:%M:%S")),
                Style::default().fg(Color::DarkGray),
            ),
        ]),
        Line::from(notif.event.message.as_str()),
    ]
}

pub fn render(f: &mut Frame, app: &App) {
    let popup_area = centered_rect(80, 70, f.area());
    f.render_widget(Clear, popup_area);

    let manager = &app.notification_manager;
    let title = match manager.error_count() {
        0 => " Notifications ".to_string(),
        n => format!(" Notifications [{} failed] ", n),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Span::styled(
            title,
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ))
        .title_bottom(Line::from(" j/k move  c clear  q/N/Esc close ").centered());

    let inner = block.inner(popup_area);
    f.render_widget(block, popup_area);

    if manager.notifications.is_empty() {
        let msg = Paragraph::new("Nothing yet. Saves, deletes and failed loads show up here.")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center);
        f.render_widget(msg, inner);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(4)])
        .split(inner);

    let header = Row::new(["", "TIME", "ACTION", "RESOURCE", "MESSAGE"]).style(
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    );
    let message_width = chunks[0].width.saturating_sub(2 + 10 + 10 + 20 + 4) as usize;
    let rows = manager
        .notifications
        .iter()
        .map(|notif| history_row(notif, message_width));

    let table = Table::new(
        rows,
        [
            Constraint::Length(2),
            Constraint::Length(10),
            Constraint::Length(10),
            Constraint::Length(20),
            Constraint::Min(20),
        ],
    )
    .header(header)
    .column_spacing(1)
    .row_highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    );

    let mut state = TableState::default();
    state.select(Some(app.notifications_selected));
    f.render_stateful_widget(table, chunks[0], &mut state);

    if let Some(selected) = manager.notifications.get(app.notifications_selected) {
        let detail = Paragraph::new(detail_lines(selected))
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            )
            .wrap(Wrap { trim: true });
        f.render_widget(detail, chunks[1]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caredesk::notification::{FeedbackEvent, Operation};

    #[test]
    fn test_detail_keeps_full_message() {
        let long = "Failed to update clinic: Server temporarily unavailable. Please try again.";
        let notif = Notification::new(FeedbackEvent::error("clinics", Operation::Update, long));

        let lines = detail_lines(&notif);
        assert!(lines[0].to_string().contains("Update"));
        assert!(lines[0].to_string().contains("clinics at "));
        assert_eq!(lines[1].to_string(), long);
    }
}
