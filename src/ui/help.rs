//! Help Overlay
//!
//! Keyboard shortcuts grouped by what they act on. The resource list at the
//! bottom comes from the registry, so new schema files show up here too.

use super::centered_rect;
use crate::app::App;
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

const KEY_WIDTH: usize = 12;

/// (section, [(keys, description, destructive)])
const SECTIONS: &[(&str, &[(&str, &str, bool)])] = &[
    (
        "Navigation",
        &[
            ("j/k, ↑/↓", "Move up/down", false),
            ("g / G", "Go to top / bottom", false),
            ("Ctrl+d/u", "Page down/up", false),
            ("/", "Filter by name (Enter keeps, Esc clears)", false),
        ],
    ),
    (
        "Records",
        &[
            ("n", "New record", false),
            ("e, Enter", "Edit selected record", false),
            ("d, Delete", "Delete selected record", true),
            ("R", "Reload from backend", false),
        ],
    ),
    (
        "Form",
        &[
            ("Tab, ↑/↓", "Move between fields", false),
            ("←/→", "Pick a choice or referenced record", false),
            ("Enter", "Save", false),
            ("Esc", "Cancel", false),
        ],
    ),
    (
        "General",
        &[
            (":", "Command mode", false),
            ("N", "Notification history", false),
            ("?, Esc", "Close help", false),
            ("q", "Quit", false),
        ],
    ),
];

fn help_lines(resource_keys: &[&str]) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    for (section, entries) in SECTIONS {
        lines.push(Line::from(Span::styled(
            *section,
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for (keys, description, destructive) in entries.iter() {
            let key_color = if *destructive { Color::Red } else { Color::Yellow };
            lines.push(Line::from(vec![
                Span::styled(
                    format!("  {:<width$}", keys, width = KEY_WIDTH),
                    Style::default().fg(key_color),
                ),
                Span::raw(*description),
            ]));
        }
        lines.push(Line::from(""));
    }

    lines.push(Line::from(Span::styled(
        "Resources",
        Style::default().add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(Span::styled(
        format!(
            "  {}",
            resource_keys
                .iter()
                .map(|k| format!(":{}", k))
                .collect::<Vec<_>>()
                .join("  ")
        ),
        Style::default().fg(Color::Cyan),
    )));

    lines
}

pub fn render(f: &mut Frame, _app: &App) {
    let popup_area = centered_rect(70, 80, f.area());
    f.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Span::styled(
            " Help ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ));

    let keys = caredesk::resource::get_all_resource_keys();
    let paragraph = Paragraph::new(help_lines(&keys))
        .block(block)
        .wrap(Wrap { trim: false });

    f.render_widget(paragraph, popup_area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_help_lists_resources_as_commands() {
        let lines = help_lines(&["clinics", "orders"]);
        let last = lines.last().unwrap().to_string();
        assert_eq!(last, "  :clinics  :orders");
    }

    #[test]
    fn test_keys_are_aligned() {
        let lines = help_lines(&[]);
        let edit = lines
            .iter()
            .map(|l| l.to_string())
            .find(|l| l.ends_with("Edit selected record"))
            .unwrap();
        assert_eq!(edit, format!("  {:<12}Edit selected record", "e, Enter"));
    }
}
