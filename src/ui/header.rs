//! Header Component
//!
//! Displays backend, resource and key hints.

use crate::app::App;
use crate::VERSION;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

pub fn render(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            format!(" caredesk v{} ", VERSION),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ))
        .title_alignment(Alignment::Center);

    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(inner);

    // Row 1: Backend
    let offline = matches!(app.backend, crate::app::Backend::Offline);
    let backend_line = Line::from(vec![
        Span::styled(" Backend: ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            app.backend.describe(),
            Style::default()
                .fg(if offline { Color::Yellow } else { Color::Green })
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled("Timeout: ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            format!("{}s", app.timeout.as_secs()),
            Style::default().fg(Color::White),
        ),
    ]);
    f.render_widget(Paragraph::new(backend_line), rows[0]);

    // Row 2: Current resource and count
    let resource_info = if let Some(resource) = app.current_resource() {
        Line::from(vec![
            Span::styled(" Resource: ", Style::default().fg(Color::DarkGray)),
            Span::styled(
                &resource.display_name,
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::styled("Count: ", Style::default().fg(Color::DarkGray)),
            Span::styled(
                format!("{}", app.filtered_items.len()),
                Style::default().fg(Color::White),
            ),
            if app.items.len() != app.filtered_items.len() {
                Span::styled(
                    format!(" (filtered from {})", app.items.len()),
                    Style::default().fg(Color::Yellow),
                )
            } else {
                Span::raw("")
            },
        ])
    } else {
        Line::from(vec![Span::styled(
            " No resource selected",
            Style::default().fg(Color::Red),
        )])
    };
    f.render_widget(Paragraph::new(resource_info), rows[1]);

    // Row 3: Help hint
    let help_line = Line::from(vec![Span::styled(
        " ?:help  ::cmd  /:filter  n:new  e:edit  d:delete  R:refresh  N:notifications  q:quit",
        Style::default().fg(Color::DarkGray),
    )]);
    f.render_widget(Paragraph::new(help_line), rows[2]);
}
