use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, InputMode, Phase};
use crate::transcript::{Message, Role, Source};

/// Palette for the persisted dark/light preference.
struct Theme {
    header_bg: Color,
    header_fg: Color,
    text: Color,
    dim: Color,
    user: Color,
    assistant: Color,
    system: Color,
    error: Color,
    banner_bg: Color,
    border: Color,
}

fn theme(dark_mode: bool) -> Theme {
    if dark_mode {
        Theme {
            header_bg: Color::DarkGray,
            header_fg: Color::White,
            text: Color::Gray,
            dim: Color::DarkGray,
            user: Color::Cyan,
            assistant: Color::Yellow,
            system: Color::Green,
            error: Color::Red,
            banner_bg: Color::Red,
            border: Color::DarkGray,
        }
    } else {
        Theme {
            header_bg: Color::Blue,
            header_fg: Color::White,
            text: Color::Reset,
            dim: Color::DarkGray,
            user: Color::Blue,
            assistant: Color::Magenta,
            system: Color::Green,
            error: Color::Red,
            banner_bg: Color::LightRed,
            border: Color::Gray,
        }
    }
}

/// Pure view of the session state; never mutates the App.
pub fn render(app: &App, frame: &mut Frame) {
    let area = frame.area();
    let theme = theme(app.dark_mode);

    let banner_height = if app.error.is_empty() { 0 } else { 1 };
    let [header_area, banner_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(banner_height),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, &theme, frame, header_area);
    if banner_height > 0 {
        render_error_banner(app, &theme, frame, banner_area);
    }
    render_transcript(app, &theme, frame, chat_area);
    render_input(app, &theme, frame, input_area);
    render_footer(app, &theme, frame, footer_area);
}

/// Inner chat pane dimensions for a given terminal size; the run loop feeds
/// these back into the App before each draw so scroll math stays in sync
/// with the layout above.
pub fn chat_viewport(app: &App, area: Rect) -> (u16, u16) {
    let banner_height: u16 = if app.error.is_empty() { 0 } else { 1 };
    let chat_height = area
        .height
        .saturating_sub(1 + banner_height + 3 + 1) // header + banner + input + footer
        .saturating_sub(2); // chat borders
    let chat_width = area.width.saturating_sub(2);
    (chat_width, chat_height)
}

fn render_header(app: &App, theme: &Theme, frame: &mut Frame, area: Rect) {
    let dots = ".".repeat((app.animation_frame as usize) + 1);
    let badge = match app.phase() {
        Phase::Checking => Span::styled(" Checking... ", Style::default().fg(Color::Black).bg(Color::Yellow)),
        Phase::Ready => {
            let detail = app
                .status
                .as_ref()
                .map(|s| s.database_status.as_str())
                .unwrap_or("unknown");
            Span::styled(
                format!(" Ready ({}) ", detail),
                Style::default().fg(Color::Black).bg(Color::Green),
            )
        }
        Phase::NotReady => Span::styled(" Not Ready ", Style::default().fg(Color::White).bg(Color::Red)),
        Phase::Initializing => Span::styled(
            format!(" Initializing{} ", dots),
            Style::default().fg(Color::Black).bg(Color::Yellow),
        ),
        Phase::Searching => Span::styled(
            format!(" Searching{} ", dots),
            Style::default().fg(Color::Black).bg(Color::Yellow),
        ),
    };

    let mut spans = vec![
        Span::styled(
            " RAG Search ",
            Style::default().fg(theme.header_fg).bold(),
        ),
        Span::styled(
            format!("v{} ", env!("CARGO_PKG_VERSION")),
            Style::default().fg(theme.header_fg).dim(),
        ),
        badge,
    ];

    // Offer the initialize affordance only while the system is not ready
    if app.phase() == Phase::NotReady {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(
            " i ",
            Style::default().bg(Color::DarkGray).fg(Color::White),
        ));
        spans.push(Span::styled(
            " initialize ",
            Style::default().fg(theme.header_fg),
        ));
    }

    let header = Paragraph::new(Line::from(spans)).style(Style::default().bg(theme.header_bg));
    frame.render_widget(header, area);
}

fn render_error_banner(app: &App, theme: &Theme, frame: &mut Frame, area: Rect) {
    let banner = Paragraph::new(Line::from(vec![
        Span::raw(" ! "),
        Span::raw(app.error.as_str()),
    ]))
    .style(Style::default().bg(theme.banner_bg).fg(Color::White));
    frame.render_widget(banner, area);
}

fn render_transcript(app: &App, theme: &Theme, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border))
        .title(" Conversation ");

    let text = if app.transcript.is_empty() && !app.loading {
        // Welcome placeholder instead of an empty list
        Text::from(vec![
            Line::default(),
            Line::from(Span::styled(
                "Welcome to RAG Search",
                Style::default().fg(theme.text).bold(),
            )),
            Line::from(Span::styled(
                "Ask questions about your documents to get started.",
                Style::default().fg(theme.dim),
            )),
        ])
    } else {
        let mut lines: Vec<Line> = Vec::new();
        for msg in app.transcript.entries() {
            lines.extend(message_lines(msg, theme));
        }

        if app.loading && app.is_ready() {
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                "Assistant:",
                Style::default().fg(theme.assistant).bold(),
            )));
            lines.push(Line::from(Span::styled(
                format!("Thinking{}", dots),
                Style::default().fg(theme.dim).italic(),
            )));
        }

        Text::from(lines)
    };

    let transcript = Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: true })
        .scroll((app.scroll, 0));

    frame.render_widget(transcript, area);
}

fn message_lines<'a>(msg: &'a Message, theme: &Theme) -> Vec<Line<'a>> {
    let mut lines = Vec::new();

    let (label, color) = match msg.role {
        Role::User => ("You:", theme.user),
        Role::Assistant => ("Assistant:", theme.assistant),
        Role::System => ("System:", theme.system),
        Role::Error => ("Error:", theme.error),
    };
    lines.push(Line::from(Span::styled(
        label,
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    )));

    let content_style = match msg.role {
        Role::System => Style::default().fg(theme.system).italic(),
        Role::Error => Style::default().fg(theme.error),
        _ => Style::default().fg(theme.text),
    };
    for line in msg.content.lines() {
        lines.push(Line::from(Span::styled(line, content_style)));
    }

    if !msg.sources.is_empty() {
        lines.push(Line::from(Span::styled(
            "Sources:",
            Style::default().fg(theme.dim).add_modifier(Modifier::BOLD),
        )));
        for source in &msg.sources {
            lines.push(Line::from(vec![
                Span::styled("  • ", Style::default().fg(theme.dim)),
                Span::styled(source.heading(), Style::default().fg(theme.text)),
            ]));
            if let Source::Citation {
                excerpt: Some(excerpt),
                ..
            } = source
            {
                lines.push(Line::from(Span::styled(
                    format!("    {}", excerpt),
                    Style::default().fg(theme.dim),
                )));
            }
        }
    }

    lines.push(Line::from(Span::styled(
        msg.timestamp.format("%H:%M:%S").to_string(),
        Style::default().fg(theme.dim).dim(),
    )));
    lines.push(Line::default());

    lines
}

fn render_input(app: &App, theme: &Theme, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let border_color = if editing { Color::Yellow } else { theme.border };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Question ");

    let input = if app.input.is_empty() && !editing {
        let hint = if app.is_ready() {
            "Ask a question about your documents... (press / to type)"
        } else {
            "Initialize the system before asking questions"
        };
        Paragraph::new(Span::styled(hint, Style::default().fg(theme.dim)))
    } else {
        Paragraph::new(app.input.as_str()).style(Style::default().fg(theme.text))
    };

    frame.render_widget(input.block(block), area);

    if editing {
        // Place the terminal cursor at the char position inside the box
        let x = area.x + 1 + app.cursor.min(area.width.saturating_sub(2) as usize) as u16;
        frame.set_cursor_position((x, area.y + 1));
    }
}

fn render_footer(app: &App, theme: &Theme, frame: &mut Frame, area: Rect) {
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().fg(theme.dim);

    let hints = match app.input_mode {
        InputMode::Normal => vec![
            Span::styled(" / ", key_style),
            Span::styled(" ask ", label_style),
            Span::styled(" i ", key_style),
            Span::styled(" initialize ", label_style),
            Span::styled(" r ", key_style),
            Span::styled(" refresh ", label_style),
            Span::styled(" j/k ", key_style),
            Span::styled(" scroll ", label_style),
            Span::styled(" d ", key_style),
            Span::styled(" theme ", label_style),
            Span::styled(" q ", key_style),
            Span::styled(" quit ", label_style),
        ],
        InputMode::Editing => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" search ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" back ", label_style),
        ],
    };

    frame.render_widget(Paragraph::new(Line::from(hints)), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SystemStatus;
    use crate::config::Config;
    use crate::transcript::Role;
    use ratatui::{backend::TestBackend, Terminal};

    fn draw(app: &App) -> Terminal<TestBackend> {
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal.draw(|frame| render(app, frame)).unwrap();
        terminal
    }

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_empty_transcript_shows_welcome() {
        let app = App::new(&Config::new()).unwrap();
        let text = buffer_text(&draw(&app));
        assert!(text.contains("Welcome to RAG Search"));
        assert!(text.contains("Checking..."));
    }

    #[test]
    fn test_renders_both_source_shapes() {
        let mut app = App::new(&Config::new()).unwrap();
        app.status = Some(SystemStatus {
            ready: true,
            database_status: "connected".into(),
        });
        app.transcript.push(
            Role::Assistant,
            "X is ...",
            vec![
                Source::Label("doc.pdf".into()),
                Source::Citation {
                    file: "guide.pdf".into(),
                    page: Some(4),
                    kind: Some("table".into()),
                    excerpt: Some("a snippet".into()),
                },
            ],
        );

        let text = buffer_text(&draw(&app));
        assert!(text.contains("Ready (connected)"));
        assert!(text.contains("doc.pdf"));
        assert!(text.contains("guide.pdf (p.4) [table]"));
        assert!(text.contains("a snippet"));
    }

    #[test]
    fn test_error_banner_and_initialize_hint() {
        let mut app = App::new(&Config::new()).unwrap();
        app.status = Some(SystemStatus {
            ready: false,
            database_status: "missing".into(),
        });
        app.error = "System not ready. Press i to initialize.".to_string();

        let text = buffer_text(&draw(&app));
        assert!(text.contains("Not Ready"));
        assert!(text.contains("System not ready"));
        assert!(text.contains("initialize"));
    }

    #[test]
    fn test_every_role_renders() {
        let mut app = App::new(&Config::new()).unwrap();
        app.transcript.push(Role::User, "question", Vec::new());
        app.transcript.push(Role::Assistant, "answer", Vec::new());
        app.transcript.push(Role::System, "initialized", Vec::new());
        app.transcript.push(Role::Error, "Error: boom", Vec::new());

        let text = buffer_text(&draw(&app));
        for needle in ["You:", "Assistant:", "System:", "Error:"] {
            assert!(text.contains(needle), "missing {}", needle);
        }
    }
}
