use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use wordpace::highlight::{mark_words, Mark};
use wordpace::session::Status;

use crate::App;

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 1;

/// Rows reserved for the wrapped sample text, saturating for huge prompts.
fn sample_height(text_width: usize, line_width: u16) -> u16 {
    u16::try_from(text_width / line_width.max(1) as usize)
        .unwrap_or(u16::MAX)
        .saturating_add(2)
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let engine = &self.engine;
        let snapshot = engine.snapshot();
        let session = &snapshot.session;
        let stats = &snapshot.stats;

        // styles
        let bold_style = Style::default().add_modifier(Modifier::BOLD);
        let green_bold_style = Style::default().patch(bold_style).fg(Color::Green);
        let red_bold_style = Style::default()
            .patch(bold_style)
            .fg(Color::Red)
            .add_modifier(Modifier::UNDERLINED);
        let dim_style = Style::default().add_modifier(Modifier::DIM);
        let cursor_style = Style::default()
            .patch(bold_style)
            .add_modifier(Modifier::REVERSED);
        let italic_style = Style::default().add_modifier(Modifier::ITALIC);

        let width = area.width.saturating_sub(HORIZONTAL_MARGIN * 2).max(1);
        let sample_lines = sample_height(engine.sample().text().width(), width);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints([
                Constraint::Length(3),            // stat cards
                Constraint::Length(1),            // progress bar
                Constraint::Length(1),            // padding
                Constraint::Length(sample_lines), // sample text
                Constraint::Length(3),            // input
                Constraint::Length(2),            // status / help
                Constraint::Min(0),
            ])
            .split(area);

        let cards = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Ratio(1, 4); 4])
            .split(chunks[0]);

        let progress = engine.progress_percent();
        for (card, (title, value, color)) in cards.iter().zip([
            ("WPM", stats.wpm.to_string(), Color::Magenta),
            ("Accuracy", format!("{}%", stats.accuracy), Color::Cyan),
            ("Time", format!("{}s", session.remaining_secs), Color::Yellow),
            ("Progress", format!("{progress}%"), Color::White),
        ]) {
            Paragraph::new(Span::styled(value, bold_style.fg(color)))
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL).title(title))
                .render(*card, buf);
        }

        Gauge::default()
            .gauge_style(Style::default().fg(Color::Magenta))
            .percent(progress.min(100) as u16)
            .label("")
            .render(chunks[1], buf);

        let mut spans = Vec::new();
        for word in mark_words(engine.sample(), &snapshot) {
            for (c, mark) in word.chars {
                let style = match mark {
                    Mark::Typed => green_bold_style,
                    Mark::Error => red_bold_style,
                    Mark::Cursor => cursor_style,
                    Mark::Pending => dim_style,
                };
                spans.push(Span::styled(c.to_string(), style));
            }
            spans.push(if word.cursor_after {
                Span::styled(" ", cursor_style)
            } else {
                Span::raw(" ")
            });
        }

        Paragraph::new(Line::from(spans))
            .wrap(Wrap { trim: true })
            .render(chunks[3], buf);

        let placeholder = match session.status {
            Status::Idle => "Press Enter to start...",
            _ => "Type the text above...",
        };
        let input = if session.current_input.is_empty() {
            Span::styled(placeholder, dim_style.patch(italic_style))
        } else {
            Span::styled(session.current_input.replace(' ', "·"), bold_style)
        };
        let input_style = if session.is_completed() {
            dim_style
        } else {
            Style::default()
        };
        Paragraph::new(input)
            .block(Block::default().borders(Borders::ALL).style(input_style))
            .render(chunks[4], buf);

        let footer = match session.status {
            Status::Completed => Line::from(vec![
                Span::styled("Test complete! ", bold_style),
                Span::raw("You typed at "),
                Span::styled(format!("{} WPM", stats.wpm), bold_style.fg(Color::Magenta)),
                Span::raw(" with "),
                Span::styled(
                    format!("{}% accuracy", stats.accuracy),
                    bold_style.fg(Color::Cyan),
                ),
                Span::styled("   (tab) reset (esc) quit", italic_style),
            ]),
            Status::Idle => Line::from(Span::styled("(enter) start (esc) quit", italic_style)),
            Status::Running => Line::from(Span::styled("(tab) reset (esc) quit", italic_style)),
        };
        Paragraph::new(footer)
            .alignment(Alignment::Center)
            .render(chunks[5], buf);
    }
}
