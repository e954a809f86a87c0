use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use crate::moves::Move;
use crate::session::{Outcome, Phase, Session};

const HORIZONTAL_MARGIN: u16 = 4;

// Palette carried over from the cabinet build: pink/cyan/yellow moves on
// black, purple highlight, green/red verdicts.
const HIGHLIGHT: Color = Color::Magenta;
const CORRECT: Color = Color::Green;
const INCORRECT: Color = Color::Red;

fn move_color(mv: Move) -> Color {
    match mv {
        Move::Up | Move::A => Color::LightMagenta,
        Move::Down | Move::Left | Move::B => Color::Cyan,
        Move::Right | Move::X => Color::Yellow,
        Move::Y => Color::White,
    }
}

fn expected_line(session: &Session) -> Line<'static> {
    let mut spans = Vec::with_capacity(session.expected.len() * 2);
    for (i, &mv) in session.expected.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw("  "));
        }
        spans.push(Span::styled(
            mv.glyph().to_string(),
            Style::default()
                .fg(move_color(mv))
                .add_modifier(Modifier::BOLD),
        ));
    }
    Line::from(spans)
}

/// Entered slots: filled slots carry the move glyph tinted by its verdict,
/// the next open slot is highlighted, the rest stay dashed.
fn input_line(session: &Session) -> Line<'static> {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let mut spans = Vec::with_capacity(session.expected.len() * 2);
    for i in 0..session.expected.len() {
        if i > 0 {
            spans.push(Span::raw("  "));
        }
        match session.entered.get(i) {
            Some(entry) => {
                let verdict = match entry.outcome {
                    Outcome::Correct => CORRECT,
                    Outcome::Incorrect => INCORRECT,
                };
                spans.push(Span::styled(
                    entry.mv.glyph().to_string(),
                    bold.fg(verdict),
                ));
            }
            None => {
                let pending = if i == session.entered.len() && session.polling_active() {
                    Style::default().fg(HIGHLIGHT).add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::DarkGray)
                };
                spans.push(Span::styled("◌", pending));
            }
        }
    }
    Line::from(spans)
}

fn status_style(phase: Phase) -> Style {
    match phase {
        Phase::Verdict { valid: true } => Style::default().fg(CORRECT).add_modifier(Modifier::BOLD),
        Phase::Verdict { valid: false } | Phase::Expired => {
            Style::default().fg(INCORRECT).add_modifier(Modifier::BOLD)
        }
        _ => Style::default().fg(Color::White),
    }
}

impl Widget for &Session {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let title_style = Style::default().fg(HIGHLIGHT).add_modifier(Modifier::BOLD);

        // The sequence row may exceed a narrow terminal; let it wrap and
        // reserve an extra line when it does.
        let row_width = self
            .expected
            .iter()
            .map(|m| m.glyph())
            .collect::<String>()
            .width()
            + self.expected.len().saturating_sub(1) * 2;
        let usable = area.width.saturating_sub(HORIZONTAL_MARGIN * 2).max(1) as usize;
        let seq_lines = (row_width as f64 / usable as f64).ceil().max(1.0) as u16;

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(1)
            .constraints(
                [
                    Constraint::Length(1),             // game title
                    Constraint::Length(2),             // instruction
                    Constraint::Length(2 + seq_lines), // expected sequence
                    Constraint::Length(2 + seq_lines), // entered slots
                    Constraint::Length(2),             // status
                    Constraint::Length(3),             // countdown gauge
                    Constraint::Min(0),
                    Constraint::Length(1), // help footer
                ]
                .as_ref(),
            )
            .split(area);

        Paragraph::new(Span::styled(self.game.clone(), title_style))
            .alignment(Alignment::Center)
            .render(chunks[0], buf);

        Paragraph::new(Span::styled(
            "ENTER SECRET CODE TO PLAY",
            Style::default()
                .fg(Color::LightMagenta)
                .add_modifier(Modifier::BOLD),
        ))
        .alignment(Alignment::Center)
        .render(chunks[1], buf);

        Paragraph::new(expected_line(self))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(HIGHLIGHT))
                    .title("ENTER THIS SEQUENCE"),
            )
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .render(chunks[2], buf);

        Paragraph::new(input_line(self))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(HIGHLIGHT))
                    .title("YOUR INPUT"),
            )
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .render(chunks[3], buf);

        Paragraph::new(Span::styled(self.status_text(), status_style(self.phase)))
            .alignment(Alignment::Center)
            .render(chunks[4], buf);

        Gauge::default()
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("TIME REMAINING"),
            )
            .gauge_style(Style::default().fg(HIGHLIGHT))
            .ratio(self.time_fraction())
            .label(format!("{} SEC", self.seconds_display()))
            .render(chunks[5], buf);

        Paragraph::new(Span::styled(
            "USE JOYSTICK AND BUTTONS TO ENTER CODE · ESC CANCELS",
            Style::default().fg(Color::DarkGray),
        ))
        .alignment(Alignment::Center)
        .render(chunks[7], buf);
    }
}
