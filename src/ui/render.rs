//! TUI rendering with ratatui.

use crate::ui::app::{App, TreeItem};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};

/// Main render function.
pub fn render(frame: &mut Frame, app: &App) {
    // Main layout: content area + footer
    let outer_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(frame.area());

    // Content area: tree on left, description on right
    let main_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(outer_chunks[0]);

    match &app.error {
        Some(error) => render_error(frame, app, error, main_chunks[0]),
        None => render_tree(frame, app, main_chunks[0]),
    }
    render_details(frame, app, main_chunks[1]);
    render_footer(frame, app, outer_chunks[1]);

    if app.show_help {
        render_help(frame);
    }
}

/// Render tree view.
fn render_tree(frame: &mut Frame, app: &App, area: Rect) {
    let items = app.visible_items();

    let list_items: Vec<ListItem> = items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let indent = "  ".repeat(item.depth());
            let is_selected = i == app.selected;
            let expanded = app.is_expanded(item.key());

            let mut spans = vec![Span::raw(indent)];

            match item {
                TreeItem::Root { .. } => {
                    let prefix = if expanded { "▼ " } else { "▶ " };
                    let mut style = Style::default().fg(Color::Cyan);
                    if is_selected {
                        style = style.bg(Color::DarkGray).add_modifier(Modifier::BOLD);
                    }
                    spans.push(Span::raw(prefix));
                    spans.push(Span::styled(item.display_line(), style));
                }
                TreeItem::Device {
                    port,
                    is_hub,
                    has_children,
                    ..
                } => {
                    let prefix = match (*has_children, expanded) {
                        (true, true) => "├─▼ ",
                        (true, false) => "├─▶ ",
                        (false, _) if *is_hub => "├─○ ",
                        (false, _) => "└── ",
                    };
                    let mut style = if port.is_none() {
                        Style::default().fg(Color::Yellow)
                    } else {
                        Style::default()
                    };
                    if is_selected {
                        style = style.bg(Color::DarkGray).add_modifier(Modifier::BOLD);
                    }

                    spans.push(Span::raw(prefix));
                    spans.push(Span::styled(item.display_line(), style));
                    spans.push(Span::styled(
                        format!(" {}", item.key()),
                        Style::default().fg(Color::DarkGray),
                    ));
                }
            }

            ListItem::new(Line::from(spans))
        })
        .collect();

    let title = format!(" USB Devices ({}) ", app.device_count_str());
    let list = List::new(list_items).block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    frame.render_widget(list, area);
}

/// Render the reason there is nothing to show.
fn render_error(frame: &mut Frame, app: &App, error: &str, area: Rect) {
    let mut lines = vec![
        Line::from(Span::styled(
            format!("Could not read {}", app.session.source().display()),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];
    lines.extend(error.lines().map(|l| Line::from(l.to_string())));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Press r to retry",
        Style::default().fg(Color::DarkGray),
    )));

    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .title(" USB Devices ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red)),
        )
        .wrap(Wrap { trim: true });

    frame.render_widget(paragraph, area);
}

/// Render the description of the selected row.
fn render_details(frame: &mut Frame, app: &App, area: Rect) {
    let text = app.details_text();
    let mut lines = Vec::new();

    for (i, line) in text.lines().enumerate() {
        if i == 0 {
            lines.push(Line::from(Span::styled(
                line.to_string(),
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )));
            continue;
        }
        match line.split_once(": ") {
            Some((label, value)) => lines.push(Line::from(vec![
                Span::styled(format!("{}: ", label), Style::default().fg(Color::DarkGray)),
                Span::styled(value.to_string(), Style::default().fg(Color::White)),
            ])),
            None => lines.push(Line::from(line.to_string())),
        }
    }

    if lines.is_empty() {
        lines.push(Line::from(Span::styled(
            "Nothing selected",
            Style::default().fg(Color::DarkGray),
        )));
    }

    // Tabs do not render in a terminal cell grid.
    let lines: Vec<Line> = lines
        .into_iter()
        .map(|line| {
            Line::from(
                line.spans
                    .into_iter()
                    .map(|span| {
                        let content = span.content.replace('\t', "  ");
                        Span::styled(content, span.style)
                    })
                    .collect::<Vec<_>>(),
            )
        })
        .collect();

    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .title(" Description ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White)),
        )
        .wrap(Wrap { trim: false })
        .scroll((app.detail_scroll, 0));

    frame.render_widget(paragraph, area);
}

/// Render help overlay.
fn render_help(frame: &mut Frame) {
    let area = centered_rect(50, 60, frame.area());

    frame.render_widget(Clear, area);

    let help_text = vec![
        Line::from(Span::styled(
            "usbview Help",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "Navigation",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from("  j/↓     Move down"),
        Line::from("  k/↑     Move up"),
        Line::from("  Enter   Expand/collapse"),
        Line::from("  g       Go to top"),
        Line::from("  G       Go to bottom"),
        Line::from("  x       Expand/collapse all"),
        Line::from("  PgUp    Scroll description up"),
        Line::from("  PgDn    Scroll description down"),
        Line::from(""),
        Line::from(Span::styled(
            "Actions",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from("  r       Reload devices file"),
        Line::from("  ?       Toggle help"),
        Line::from("  q       Quit"),
    ];

    let paragraph = Paragraph::new(help_text)
        .block(
            Block::default()
                .title(" Help ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .style(Style::default().bg(Color::Black));

    frame.render_widget(paragraph, area);
}

/// Create a centered rect.
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// Render footer with keybindings.
fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = Vec::new();

    if let Some(status) = app.status() {
        spans.push(Span::styled(
            status,
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        ));
    } else {
        for (key, action) in [
            ("j/k", " Nav  "),
            ("Enter", " Expand  "),
            ("x", " All  "),
            ("PgUp/PgDn", " Scroll  "),
            ("r", " Reload  "),
            ("?", " Help  "),
            ("q", " Quit"),
        ] {
            spans.push(Span::styled(key, Style::default().fg(Color::Yellow)));
            spans.push(Span::raw(action));
        }
    }

    let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray));

    frame.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::devices::DevicesParser;
    use crate::session::Session;
    use ratatui::{Terminal, backend::TestBackend};
    use std::fs;

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_render_tree_and_description() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devices");
        fs::write(
            &path,
            "T:  Bus=01 Lev=00 Prnt=00 Port=00 Cnt=00 Dev#=  1 Spd=480 MxCh= 4\n\
             S:  Product=EHCI Host Controller\n",
        )
        .unwrap();
        let mut session = Session::new(DevicesParser::with_path(&path));
        session.reload().unwrap();
        let mut app = App::new(session, Config::default());
        app.move_selection(1);

        let mut terminal = Terminal::new(TestBackend::new(100, 20)).unwrap();
        terminal.draw(|frame| render(frame, &app)).unwrap();
        let text = buffer_text(&terminal);

        assert!(text.contains("USB Buses"));
        assert!(text.contains("EHCI Host Controller (480M)"));
        assert!(text.contains("Speed: 480Mb/s (high)"));
    }

    #[test]
    fn test_render_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing");
        let mut app = App::new(Session::new(DevicesParser::with_path(&path)), Config::default());
        app.reload();

        let mut terminal = Terminal::new(TestBackend::new(100, 20)).unwrap();
        terminal.draw(|frame| render(frame, &app)).unwrap();
        let text = buffer_text(&terminal);

        assert!(text.contains("Can not open"));
        assert!(text.contains("Press r to retry"));
    }
}
