//! Command Box
//!
//! `:` prompt docked at the bottom with prefix completion. Resource
//! commands show how many records are already cached for them.

use crate::app::App;
use caredesk::resource::get_resource;
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table},
    Frame,
};

const MAX_SUGGESTIONS: usize = 8;

pub fn render(f: &mut Frame, app: &App) {
    let shown = app.command_suggestions.len().clamp(1, MAX_SUGGESTIONS) as u16;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(shown + 2),
            Constraint::Length(3),
        ])
        .split(f.area());

    f.render_widget(Clear, chunks[1]);
    f.render_widget(Clear, chunks[2]);

    let list_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            " ↑/↓ select  Tab complete  Enter run ",
            Style::default().fg(Color::DarkGray),
        ));

    if app.command_suggestions.is_empty() {
        let empty = Paragraph::new(Span::styled(
            format!("  no command starts with '{}'", app.command_text),
            Style::default().fg(Color::Red),
        ))
        .block(list_block);
        f.render_widget(empty, chunks[1]);
    } else {
        let rows = app
            .command_suggestions
            .iter()
            .enumerate()
            .take(MAX_SUGGESTIONS)
            .map(|(i, cmd)| {
                let style = if i == app.command_suggestion_selected {
                    Style::default()
                        .fg(Color::Black)
                        .bg(Color::Cyan)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::White)
                };
                let cached = app
                    .cached_count(cmd)
                    .map(|n| format!("{} cached", n))
                    .unwrap_or_default();
                Row::new(vec![
                    Cell::from(format!(" {}", cmd)).style(style),
                    Cell::from(describe_command(cmd)).style(Style::default().fg(Color::Gray)),
                    Cell::from(cached).style(Style::default().fg(Color::DarkGray)),
                ])
            });

        let table = Table::new(
            rows,
            [
                Constraint::Length(22),
                Constraint::Min(20),
                Constraint::Length(12),
            ],
        )
        .block(list_block);
        f.render_widget(table, chunks[1]);
    }

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Span::styled(
            " Command ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ));
    let input = Paragraph::new(input_line(&app.command_text, app.command_preview.as_deref()))
        .block(input_block);
    f.render_widget(input, chunks[2]);
}

/// Typed text followed by the rest of the previewed command in grey
fn input_line<'a>(typed: &'a str, preview: Option<&'a str>) -> Line<'a> {
    let ghost = preview
        .and_then(|p| p.strip_prefix(typed))
        .unwrap_or_default();

    Line::from(vec![
        Span::styled(":", Style::default().fg(Color::Cyan)),
        Span::styled(typed, Style::default().fg(Color::White)),
        Span::styled(ghost, Style::default().fg(Color::DarkGray)),
    ])
}

fn describe_command(cmd: &str) -> String {
    if let Some(resource) = get_resource(cmd) {
        return format!("Show {}", resource.display_name.to_lowercase());
    }
    match cmd {
        "new" => "Create a record",
        "refresh" => "Reload from backend",
        "help" => "Keyboard shortcuts",
        "notifications" => "Feedback history",
        "notifications clear" => "Forget feedback history",
        "quit" => "Exit caredesk",
        _ => "",
    }
    .to_string()
}
