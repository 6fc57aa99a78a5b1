//! Terminal user interface for the record/play session.
//!
//! Draws the waveform, the elapsed-time label, the record/play/stop button row
//! and a status line, and turns key presses into session input.

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    prelude::*,
    style::{Color, Style},
    text::{Line, Span},
    widgets::Paragraph,
};
use std::io::{stdout, Stdout};
use std::time::Duration;

use super::visualizations::{units_for_area, Bar, WaveformWidget};
use crate::session::{Controls, SessionState};

/// User input during a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionInput {
    /// No key pressed before the timeout
    None,
    /// Record button ('r')
    Record,
    /// Play button ('p' or Space)
    Play,
    /// Stop button ('s')
    Stop,
    /// Leave the session (Escape, 'q' or Ctrl+C)
    Quit,
}

/// Everything the screen shows for one frame.
pub struct SessionFrame<'a> {
    pub state: SessionState,
    pub controls: Controls,
    pub elapsed: &'a str,
    pub bars: &'a [Bar],
    pub status: Option<&'a str>,
}

/// Areas of the session screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLayout {
    pub waveform: Rect,
    pub controls: Rect,
    pub status: Rect,
}

impl SessionLayout {
    /// Waveform on top, then one row of controls and one status row.
    pub fn split(area: Rect) -> Self {
        let footer_height = 2.min(area.height);
        let waveform = Rect {
            height: area.height - footer_height,
            ..area
        };
        let controls = Rect {
            y: waveform.y + waveform.height,
            height: footer_height.min(1),
            ..area
        };
        let status = Rect {
            y: controls.y + controls.height,
            height: footer_height.saturating_sub(1),
            ..area
        };
        Self {
            waveform,
            controls,
            status,
        }
    }
}

const BACKGROUND: Color = Color::Rgb(0, 0, 0);
const FOREGROUND: Color = Color::Rgb(206, 224, 220);
const DISABLED: Color = Color::Rgb(70, 70, 70);

/// Terminal session screen.
pub struct SessionTui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl SessionTui {
    /// Creates a new TUI instance and enters alternate screen mode.
    ///
    /// # Errors
    /// - If terminal cannot be initialized
    /// - If raw mode cannot be enabled
    /// - If alternate screen cannot be entered
    pub fn new() -> anyhow::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = stdout();
        execute!(stdout, crossterm::terminal::EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        Ok(SessionTui { terminal })
    }

    /// Size of the waveform area in view units for the current terminal size.
    pub fn waveform_units(&self) -> anyhow::Result<(f32, f32)> {
        let size = self.terminal.size()?;
        let area = Rect::new(0, 0, size.width, size.height);
        Ok(units_for_area(SessionLayout::split(area).waveform))
    }

    /// Renders one frame.
    ///
    /// # Errors
    /// - If terminal rendering fails
    pub fn render(&mut self, view: &SessionFrame<'_>) -> anyhow::Result<()> {
        self.terminal.draw(|frame| {
            let layout = SessionLayout::split(frame.area());

            frame.render_widget(
                Paragraph::new("").style(Style::default().bg(BACKGROUND)),
                layout.waveform,
            );
            frame.render_widget(WaveformWidget::new(view.bars), layout.waveform);

            frame.render_widget(
                Paragraph::new(controls_line(view)).style(
                    Style::default()
                        .fg(FOREGROUND)
                        .bg(BACKGROUND),
                ),
                layout.controls,
            );

            let status = view.status.unwrap_or(
                "r record · p play · s stop · q quit",
            );
            frame.render_widget(
                Paragraph::new(status).style(Style::default().fg(Color::Rgb(185, 207, 212))),
                layout.status,
            );
        })?;

        Ok(())
    }

    /// Waits up to `timeout` for a key press and maps it to session input.
    ///
    /// # Errors
    /// - If event polling fails
    pub fn handle_input(&mut self, timeout: Duration) -> anyhow::Result<SessionInput> {
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    return Ok(SessionInput::None);
                }
                return Ok(match key.code {
                    KeyCode::Char('r') => SessionInput::Record,
                    KeyCode::Char('p') | KeyCode::Char(' ') => SessionInput::Play,
                    KeyCode::Char('s') => SessionInput::Stop,
                    KeyCode::Char('q') | KeyCode::Esc => {
                        tracing::debug!("Escape or 'q' pressed: leaving session");
                        SessionInput::Quit
                    }
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        tracing::debug!("Ctrl+C pressed: leaving session");
                        SessionInput::Quit
                    }
                    _ => SessionInput::None,
                });
            }
        }
        Ok(SessionInput::None)
    }

    /// Cleans up terminal state and exits alternate screen mode.
    ///
    /// # Errors
    /// - If terminal mode cannot be disabled
    /// - If cursor cannot be shown
    pub fn cleanup(&mut self) -> anyhow::Result<()> {
        disable_raw_mode()?;
        execute!(
            self.terminal.backend_mut(),
            crossterm::terminal::LeaveAlternateScreen
        )?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

/// Button row: state indicator, elapsed time, then record/play/stop.
fn controls_line<'a>(view: &SessionFrame<'a>) -> Line<'a> {
    let indicator = match view.state {
        SessionState::Recording => Span::styled("● ", Style::default().fg(Color::Red)),
        SessionState::Playing => Span::styled("▶ ", Style::default().fg(Color::Green)),
        SessionState::Idle => Span::raw("  "),
    };
    // the record button turns into a stop-recording button while recording
    let record_label = if view.state == SessionState::Recording {
        "[■ rec]"
    } else {
        "[● rec]"
    };
    let play_label = if view.state == SessionState::Playing {
        "[■ play]"
    } else {
        "[▶ play]"
    };

    Line::from(vec![
        indicator,
        Span::raw(view.elapsed),
        Span::raw("  "),
        button(record_label, view.controls.record),
        Span::raw(" "),
        button(play_label, view.controls.play),
        Span::raw(" "),
        button("[■ stop]", view.controls.stop),
    ])
}

fn button(label: &'static str, enabled: bool) -> Span<'static> {
    let color = if enabled { FOREGROUND } else { DISABLED };
    Span::styled(label, Style::default().fg(color))
}
