//! Splash Screen
//!
//! Startup checklist shown while the config is read, the backend is
//! prepared and the first resource is fetched.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, LineGauge, Paragraph},
    Frame,
};

const LOGO: [&str; 5] = [
    "                          _           _    ",
    "  ___ __ _ _ __ ___    __| | ___  ___| | __",
    " / __/ _` | '__/ _ \\  / _` |/ _ \\/ __| |/ /",
    "| (_| (_| | | |  __/ | (_| |  __/\\__ \\   < ",
    " \\___\\__,_|_|  \\___|  \\__,_|\\___||___/_|\\_\\",
];

const STARTUP_STEPS: [&str; 3] = ["Configuration", "Backend", "Records"];

pub struct SplashState {
    completed: usize,
    /// Detail for the step currently running
    message: String,
}

impl SplashState {
    pub fn new() -> Self {
        Self {
            completed: 0,
            message: String::new(),
        }
    }

    pub fn set_message(&mut self, message: &str) {
        self.message = message.to_string();
    }

    pub fn complete_step(&mut self) {
        self.completed = (self.completed + 1).min(STARTUP_STEPS.len());
        self.message.clear();
    }

    fn progress(&self) -> f64 {
        self.completed as f64 / STARTUP_STEPS.len() as f64
    }

    fn step_lines(&self) -> Vec<Line<'_>> {
        STARTUP_STEPS
            .iter()
            .enumerate()
            .map(|(idx, label)| {
                if idx < self.completed {
                    Line::from(vec![
                        Span::styled("✓ ", Style::default().fg(Color::Green)),
                        Span::styled(*label, Style::default().fg(Color::DarkGray)),
                    ])
                } else if idx == self.completed {
                    Line::from(vec![
                        Span::styled("› ", Style::default().fg(Color::Yellow)),
                        Span::styled(
                            format!("{:<15}", label),
                            Style::default()
                                .fg(Color::White)
                                .add_modifier(Modifier::BOLD),
                        ),
                        Span::styled(self.message.as_str(), Style::default().fg(Color::Gray)),
                    ])
                } else {
                    Line::from(Span::styled(
                        format!("  {}", label),
                        Style::default().fg(Color::DarkGray),
                    ))
                }
            })
            .collect()
    }
}

impl Default for SplashState {
    fn default() -> Self {
        Self::new()
    }
}

pub fn render(f: &mut Frame, state: &SplashState) {
    let height = (LOGO.len() + STARTUP_STEPS.len() + 6) as u16;
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(height),
            Constraint::Fill(1),
        ])
        .split(f.area());
    let area = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(60),
            Constraint::Fill(1),
        ])
        .split(rows[1])[1];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" starting ")
        .title_alignment(Alignment::Center);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(LOGO.len() as u16 + 1),
            Constraint::Length(STARTUP_STEPS.len() as u16),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(inner);

    let logo: Vec<Line> = LOGO
        .iter()
        .map(|row| Line::from(Span::styled(*row, Style::default().fg(Color::Cyan))))
        .collect();
    f.render_widget(Paragraph::new(logo).alignment(Alignment::Center), parts[0]);

    let steps = Paragraph::new(state.step_lines());
    f.render_widget(steps, parts[1].inner(ratatui::layout::Margin::new(4, 0)));

    let gauge = LineGauge::default()
        .filled_style(Style::default().fg(Color::Cyan))
        .unfilled_style(Style::default().fg(Color::DarkGray))
        .ratio(state.progress());
    f.render_widget(gauge, parts[3].inner(ratatui::layout::Margin::new(4, 0)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_is_capped() {
        let mut state = SplashState::new();
        assert_eq!(state.progress(), 0.0);
        for _ in 0..10 {
            state.complete_step();
        }
        assert_eq!(state.progress(), 1.0);
    }

    #[test]
    fn test_message_belongs_to_running_step() {
        let mut state = SplashState::new();
        state.complete_step();
        state.set_message("Connecting to http://localhost:8090/");

        let lines = state.step_lines();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].to_string().contains("Backend"));
        assert!(lines[1].to_string().ends_with("Connecting to http://localhost:8090/"));
        assert_eq!(lines[2].to_string(), "  Records");

        state.complete_step();
        assert!(!state.step_lines()[1].to_string().contains("Connecting"));
    }
}
