//! Rendering the display log into the terminal.
//!
//! The log is width-agnostic; wrapping happens here at the current terminal
//! width, and the wrapped line total feeds the scroll state so pinning and
//! paging stay accurate.

use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span as UiSpan};
use ratatui::widgets::Paragraph;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::ui::display::{DisplayLog, Span, SpanStyle};

/// Draws the whole frame: answer log, input line, status line.
pub fn draw(frame: &mut Frame, log: &mut DisplayLog, input: &str) {
    let [log_area, input_area, status_area] = Layout::vertical([
        Constraint::Min(1),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    draw_log(frame, log_area, log);
    draw_input(frame, input_area, input);
    draw_status(frame, status_area);
}

fn draw_log(frame: &mut Frame, area: Rect, log: &mut DisplayLog) {
    let width = (area.width.max(1)) as usize;
    let lines = wrap_spans(log.spans(), width);
    log.scroll.update_line_count(lines.len());
    let offset = log.scroll.offset(area.height as usize);

    let paragraph = Paragraph::new(lines).scroll((offset as u16, 0));
    frame.render_widget(paragraph, area);
}

fn draw_input(frame: &mut Frame, area: Rect, input: &str) {
    let prompt = format!("> {input}");
    frame.render_widget(Paragraph::new(prompt.clone()), area);
    let cursor_x = area.x + (prompt.width() as u16).min(area.width.saturating_sub(1));
    frame.set_cursor_position(Position::new(cursor_x, area.y));
}

fn draw_status(frame: &mut Frame, area: Rect) {
    let status = Line::from(UiSpan::styled(
        " Enter asks · Ctrl+L clears · ↑/↓ PgUp/PgDn scroll · Ctrl+C quits",
        Style::default().fg(Color::DarkGray),
    ));
    frame.render_widget(Paragraph::new(status), area);
}

fn style_for(style: SpanStyle) -> Style {
    match style {
        SpanStyle::Text => Style::default(),
        SpanStyle::Question => Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        SpanStyle::Notice => Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::ITALIC),
        SpanStyle::Code => Style::default().fg(Color::Green),
    }
}

/// Wraps styled spans at the given width, one `Line` per display row.
fn wrap_spans(spans: &[Span], width: usize) -> Vec<Line<'static>> {
    let mut out = Vec::new();
    for chunks in split_logical_lines(spans) {
        out.extend(wrap_line(&chunks, width.max(1)));
    }
    out
}

/// Splits spans into logical lines, preserving style runs within each.
fn split_logical_lines(spans: &[Span]) -> Vec<Vec<(String, SpanStyle)>> {
    let mut lines: Vec<Vec<(String, SpanStyle)>> = vec![Vec::new()];
    for span in spans {
        for (i, part) in span.text.split('\n').enumerate() {
            if i > 0 {
                lines.push(Vec::new());
            }
            if !part.is_empty()
                && let Some(line) = lines.last_mut()
            {
                line.push((part.to_string(), span.style));
            }
        }
    }
    // A trailing newline leaves an empty logical line behind; the display
    // counts "a\n" as one line, so the renderer does too.
    if lines.len() > 1 && lines.last().is_some_and(Vec::is_empty) {
        lines.pop();
    }
    lines
}

/// Greedy character wrap of one logical line, skipping the break space.
fn wrap_line(chunks: &[(String, SpanStyle)], width: usize) -> Vec<Line<'static>> {
    let mut rows = Vec::new();
    let mut row_spans: Vec<UiSpan<'static>> = Vec::new();
    let mut row_width = 0usize;

    for (text, style) in chunks {
        let mut piece = String::new();
        for ch in text.chars() {
            let w = ch.width().unwrap_or(0);
            if row_width + w > width && row_width > 0 {
                if !piece.is_empty() {
                    row_spans.push(UiSpan::styled(std::mem::take(&mut piece), style_for(*style)));
                }
                rows.push(Line::from(std::mem::take(&mut row_spans)));
                row_width = 0;
                if ch == ' ' {
                    continue;
                }
            }
            piece.push(ch);
            row_width += w;
        }
        if !piece.is_empty() {
            row_spans.push(UiSpan::styled(piece, style_for(*style)));
        }
    }

    rows.push(Line::from(row_spans));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(text: &str, style: SpanStyle) -> Span {
        Span {
            text: text.to_string(),
            style,
        }
    }

    fn row_text(line: &Line<'_>) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_wrap_respects_width() {
        let spans = [span("abcdefghij\n", SpanStyle::Text)];
        let lines = wrap_spans(&spans, 4);
        let rows: Vec<String> = lines.iter().map(row_text).collect();
        assert_eq!(rows, ["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_wrap_skips_break_space() {
        let spans = [span("one two\n", SpanStyle::Text)];
        let lines = wrap_spans(&spans, 4);
        let rows: Vec<String> = lines.iter().map(row_text).collect();
        assert_eq!(rows, ["one ", "two"]);
    }

    #[test]
    fn test_blank_lines_are_preserved() {
        let spans = [span("a\n\nb\n", SpanStyle::Text)];
        let lines = wrap_spans(&spans, 10);
        let rows: Vec<String> = lines.iter().map(row_text).collect();
        assert_eq!(rows, ["a", "", "b"]);
    }

    #[test]
    fn test_trailing_newline_adds_no_extra_row() {
        let spans = [span("a\nb\n", SpanStyle::Text)];
        assert_eq!(wrap_spans(&spans, 10).len(), 2);
    }

    #[test]
    fn test_styles_survive_wrapping() {
        let spans = [
            span("prose ", SpanStyle::Text),
            span("code", SpanStyle::Code),
        ];
        let lines = wrap_spans(&spans, 40);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].spans.len(), 2);
        assert_eq!(lines[0].spans[1].style, style_for(SpanStyle::Code));
    }
}
