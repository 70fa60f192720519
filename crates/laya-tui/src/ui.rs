use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Tabs, Wrap},
    Frame,
};

use crate::app::{App, InputMode, Popup, Screen};
use laya_core::highlight::highlight;
use laya_core::{ChatRole, DisplayError, LoadStatus, ProjectField, SearchStatus, Theme};

/// Colors for one theme. Light terminals need darker accents to stay readable.
#[derive(Clone, Copy)]
struct Palette {
    accent: Color,
    muted: Color,
    text: Color,
    user: Color,
    assistant: Color,
    error: Color,
    mark: Style,
    header_bg: Color,
    header_fg: Color,
}

fn palette(theme: Theme) -> Palette {
    match theme {
        Theme::Dark => Palette {
            accent: Color::Cyan,
            muted: Color::DarkGray,
            text: Color::White,
            user: Color::Cyan,
            assistant: Color::Yellow,
            error: Color::LightRed,
            mark: Style::default().bg(Color::Yellow).fg(Color::Black),
            header_bg: Color::DarkGray,
            header_fg: Color::White,
        },
        Theme::Light => Palette {
            accent: Color::Blue,
            muted: Color::Gray,
            text: Color::Black,
            user: Color::Blue,
            assistant: Color::Magenta,
            error: Color::Red,
            mark: Style::default().bg(Color::LightYellow).fg(Color::Black),
            header_bg: Color::Gray,
            header_fg: Color::Black,
        },
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();
    let colors = palette(app.theme);

    // Main layout: header, tabs, body, footer
    let [header_area, tabs_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area, colors);
    render_tabs(app, frame, tabs_area, colors);

    match app.screen {
        Screen::Search => render_search_screen(app, frame, body_area, colors),
        Screen::Chat => render_chat_screen(app, frame, body_area, colors),
        Screen::Projects => render_projects_screen(app, frame, body_area, colors),
    }

    render_footer(app, frame, footer_area);

    match app.popup {
        Some(Popup::Upload) => render_upload_popup(app, frame, area, colors),
        Some(Popup::NewProject) => render_project_form(app, frame, area, colors),
        None => {}
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect, colors: Palette) {
    let mut spans = vec![
        Span::styled(" LAYA ", Style::default().fg(colors.accent).bold()),
        Span::styled(app.api().base_url().to_string(), Style::default().fg(colors.header_fg)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(colors.header_fg),
        ),
    ];
    if let Some(status) = &app.status_message {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(status.clone(), Style::default().fg(colors.header_fg).italic()));
    }

    let header = Paragraph::new(Line::from(spans)).style(Style::default().bg(colors.header_bg));
    frame.render_widget(header, area);
}

fn render_tabs(app: &App, frame: &mut Frame, area: Rect, colors: Palette) {
    let titles: Vec<String> = Screen::all()
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{} {}", i + 1, s.title()))
        .collect();
    let selected = Screen::all().iter().position(|s| *s == app.screen).unwrap_or(0);

    let tabs = Tabs::new(titles)
        .select(selected)
        .style(Style::default().fg(colors.muted))
        .highlight_style(Style::default().fg(colors.accent).add_modifier(Modifier::BOLD));
    frame.render_widget(tabs, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };
    let mode_text = match app.input_mode {
        InputMode::Normal => " NORMAL ",
        InputMode::Editing => " INSERT ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let pairs: &[(&str, &str)] = match (app.popup, app.screen, app.input_mode) {
        (Some(Popup::Upload), _, _) => &[("Enter", "upload"), ("Esc", "cancel")],
        (Some(Popup::NewProject), _, _) => &[("Tab", "next field"), ("Enter", "create"), ("Esc", "cancel")],
        (None, Screen::Search, InputMode::Editing) => &[("Enter", "search"), ("Esc", "clear/leave")],
        (None, Screen::Search, InputMode::Normal) => &[
            ("/", "edit"),
            ("j/k", "nav"),
            ("s", "source"),
            ("t", "type"),
            ("u", "upload"),
            ("T", "theme"),
            ("q", "quit"),
        ],
        (None, Screen::Chat, InputMode::Editing) => &[("Enter", "send"), ("Esc", "done")],
        (None, Screen::Chat, InputMode::Normal) => &[
            ("i", "write"),
            ("j/k", "scroll"),
            ("+/-", "rate"),
            ("C", "clear"),
            ("q", "quit"),
        ],
        (None, Screen::Projects, _) => &[
            ("j/k", "nav"),
            ("r", "refresh"),
            ("n", "new"),
            ("D", "delete"),
            ("q", "quit"),
        ],
    };

    let mut spans = vec![Span::styled(mode_text, mode_style)];
    for (key, label) in pairs {
        spans.push(Span::styled(format!(" {} ", key), key_style));
        spans.push(Span::styled(format!(" {} ", label), label_style));
    }
    spans.push(Span::styled(" Ctrl+K ", key_style));
    spans.push(Span::styled(" search ", label_style));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn error_lines(err: &DisplayError, colors: Palette) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(Span::styled(
        err.message.clone(),
        Style::default().fg(colors.error).bold(),
    ))];
    if let Some(cause) = &err.cause {
        lines.push(Line::from(Span::styled(cause.clone(), Style::default().fg(colors.muted))));
    }
    lines
}

fn input_block(title: &str, editing: bool, colors: Palette) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if editing { Color::Yellow } else { colors.muted }))
        .title(format!(" {} ", title))
}

fn render_search_screen(app: &mut App, frame: &mut Frame, area: Rect, colors: Palette) {
    // Layout: input, facet line, then list and preview side by side
    let [input_area, facet_area, status_area, results_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Min(0),
    ])
    .areas(area);

    let editing = app.input_mode == InputMode::Editing && app.popup.is_none();
    let input = Paragraph::new(app.search.query.as_str())
        .style(Style::default().fg(colors.accent))
        .block(input_block("Search", editing, colors));
    frame.render_widget(input, input_area);

    if editing {
        frame.set_cursor_position((
            input_area.x + app.search.query.chars().count() as u16 + 1,
            input_area.y + 1,
        ));
    }

    let facets = Line::from(vec![
        Span::styled(" source: ", Style::default().fg(colors.muted)),
        Span::styled(app.search.source_filter().to_string(), Style::default().fg(colors.text).bold()),
        Span::styled("   type: ", Style::default().fg(colors.muted)),
        Span::styled(app.search.type_filter().to_string(), Style::default().fg(colors.text).bold()),
    ]);
    frame.render_widget(Paragraph::new(facets), facet_area);

    let status_line = if app.upload.is_uploading() {
        Line::from(Span::styled(
            format!(" Uploading{}", ".".repeat(app.animation_frame as usize + 1)),
            Style::default().fg(colors.muted).italic(),
        ))
    } else if let Some(err) = app.upload.error() {
        Line::from(Span::styled(format!(" Upload failed: {}", err), Style::default().fg(colors.error)))
    } else if let Some(status) = app.upload.status() {
        Line::from(Span::styled(format!(" {}", status), Style::default().fg(colors.muted)))
    } else {
        Line::default()
    };
    frame.render_widget(Paragraph::new(status_line), status_area);

    let [list_area, preview_area] =
        Layout::horizontal([Constraint::Percentage(40), Constraint::Percentage(60)]).areas(results_area);

    match app.search.status() {
        SearchStatus::Searching => {
            let waiting = Paragraph::new(Span::styled(
                format!("Searching{}", ".".repeat(app.animation_frame as usize + 1)),
                Style::default().fg(colors.muted).italic(),
            ))
            .block(Block::default().borders(Borders::ALL).title(" Results "));
            frame.render_widget(waiting, results_area);
            return;
        }
        SearchStatus::Errored => {
            let lines = app
                .search
                .error()
                .map(|e| error_lines(e, colors))
                .unwrap_or_default();
            let error = Paragraph::new(lines)
                .wrap(Wrap { trim: true })
                .block(Block::default().borders(Borders::ALL).title(" Results "));
            frame.render_widget(error, results_area);
            return;
        }
        SearchStatus::Idle | SearchStatus::Results => {}
    }

    let (items, total): (Vec<ListItem>, usize) = {
        let visible = app.search.visible_hits();
        let items = visible
            .iter()
            .map(|hit| ListItem::new(format!(" {:.3}  {} ", hit.score, hit.label())))
            .collect();
        (items, app.search.hits().len())
    };
    let shown = items.len();

    let title = if shown == total {
        format!(" Results ({}) ", total)
    } else {
        format!(" Results ({}/{}) ", shown, total)
    };
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(colors.accent))
                .title(title),
        )
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, list_area, &mut app.search_state);

    let preview_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(colors.muted))
        .title(" Preview ");

    let empty_hint = if app.search.status() == SearchStatus::Results && total == 0 {
        "No results"
    } else {
        "Select a result to preview"
    };

    let preview_text = match app.selected_hit() {
        Some(hit) => {
            let query = app.search.last_query().unwrap_or_default();
            let mut lines = vec![Line::from(Span::styled(
                hit.label(),
                Style::default().fg(colors.assistant).bold(),
            ))];
            let meta: Vec<String> = [
                hit.source().map(|s| format!("source: {}", s)),
                hit.kind().map(|k| format!("type: {}", k)),
                hit.url().map(|u| u.into_owned()),
            ]
            .into_iter()
            .flatten()
            .collect();
            if !meta.is_empty() {
                lines.push(Line::from(Span::styled(meta.join("  "), Style::default().fg(colors.muted))));
            }
            lines.push(Line::default());

            let body = hit.text().map(|t| t.into_owned()).unwrap_or_default();
            for raw in body.lines() {
                let spans: Vec<Span> = highlight(raw, query)
                    .into_iter()
                    .map(|seg| {
                        if seg.highlighted {
                            Span::styled(seg.text, colors.mark)
                        } else {
                            Span::raw(seg.text)
                        }
                    })
                    .collect();
                lines.push(Line::from(spans));
            }
            Text::from(lines)
        }
        None => Text::from(Span::styled(empty_hint, Style::default().fg(colors.muted))),
    };

    let preview = Paragraph::new(preview_text)
        .block(preview_block)
        .wrap(Wrap { trim: false });
    frame.render_widget(preview, preview_area);
}

fn render_chat_screen(app: &mut App, frame: &mut Frame, area: Rect, colors: Palette) {
    let [chat_area, input_area] = Layout::vertical([Constraint::Min(0), Constraint::Length(3)]).areas(area);

    // Store inner dimensions for scroll calculations
    app.chat_height = chat_area.height.saturating_sub(2);
    app.chat_width = chat_area.width.saturating_sub(2);

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(colors.accent))
        .title(" Chat ");

    let chat_text = if app.chat.turns().is_empty() && !app.chat.is_thinking() {
        Text::from(Span::styled(
            "Ask something about the indexed documents...",
            Style::default().fg(colors.muted),
        ))
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for turn in app.chat.turns() {
            match turn.role {
                ChatRole::User => {
                    lines.push(Line::from(Span::styled(
                        "You:",
                        Style::default().fg(colors.user).add_modifier(Modifier::BOLD),
                    )));
                    for line in turn.text.lines() {
                        lines.push(Line::from(line.to_string()));
                    }
                }
                ChatRole::Assistant => {
                    lines.push(Line::from(Span::styled(
                        "LAYA:",
                        Style::default().fg(colors.assistant).add_modifier(Modifier::BOLD),
                    )));
                    let style = if turn.failed {
                        Style::default().fg(colors.error)
                    } else {
                        Style::default().fg(colors.text)
                    };
                    for line in turn.text.lines() {
                        lines.push(Line::from(Span::styled(line.to_string(), style)));
                    }
                    if !turn.citations.is_empty() {
                        lines.push(Line::from(Span::styled(
                            "Sources:",
                            Style::default().fg(colors.muted).add_modifier(Modifier::BOLD),
                        )));
                        for (i, hit) in turn.citations.iter().enumerate() {
                            lines.push(Line::from(Span::styled(
                                format!("  [{}] {}", i + 1, hit.label()),
                                Style::default().fg(colors.muted),
                            )));
                        }
                    }
                }
            }
            lines.push(Line::default());
        }

        if app.chat.is_thinking() {
            lines.push(Line::from(Span::styled(
                "LAYA:",
                Style::default().fg(colors.assistant).add_modifier(Modifier::BOLD),
            )));
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("Thinking{}", dots),
                Style::default().fg(colors.muted).add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    let chat = Paragraph::new(chat_text)
        .block(chat_block)
        .wrap(Wrap { trim: true })
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, chat_area);

    // Keep the tail of long input visible
    let editing = app.input_mode == InputMode::Editing;
    let inner_width = input_area.width.saturating_sub(2) as usize;
    let char_count = app.chat_input.chars().count();
    let scroll_offset = if inner_width > 0 && char_count >= inner_width {
        char_count - inner_width + 1
    } else {
        0
    };
    let visible_text: String = app.chat_input.chars().skip(scroll_offset).collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(colors.user))
        .block(input_block("Message", editing, colors));
    frame.render_widget(input, input_area);

    if editing {
        frame.set_cursor_position((
            input_area.x + (char_count - scroll_offset) as u16 + 1,
            input_area.y + 1,
        ));
    }
}

fn render_projects_screen(app: &mut App, frame: &mut Frame, area: Rect, colors: Palette) {
    let [list_area, detail_area] =
        Layout::horizontal([Constraint::Percentage(40), Constraint::Percentage(60)]).areas(area);

    let title = match app.projects.status() {
        LoadStatus::Loading => " Projects (loading...) ".to_string(),
        _ => format!(" Projects ({}) ", app.projects.projects().len()),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(colors.accent))
        .title(title);

    if let Some(err) = app.projects.error() {
        let error = Paragraph::new(error_lines(err, colors))
            .wrap(Wrap { trim: true })
            .block(block);
        frame.render_widget(error, list_area);
    } else {
        let items: Vec<ListItem> = app
            .projects
            .projects()
            .iter()
            .map(|p| {
                let status = p.status.as_deref().unwrap_or("-");
                ListItem::new(format!(" {}  [{}] ", p.name, status))
            })
            .collect();

        let list = List::new(items)
            .block(block)
            .highlight_style(
                Style::default()
                    .bg(Color::Blue)
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("> ");
        frame.render_stateful_widget(list, list_area, &mut app.project_state);
    }

    let detail = match app.selected_project() {
        Some(p) => {
            let mut lines = vec![
                Line::from(Span::styled(p.name.clone(), Style::default().fg(colors.assistant).bold())),
                Line::from(Span::styled(format!("slug: {}", p.slug), Style::default().fg(colors.muted))),
                Line::from(Span::styled(format!("id: {}", p.id), Style::default().fg(colors.muted))),
                Line::default(),
            ];
            let optional = [
                ("Title", &p.title),
                ("Status", &p.status),
                ("Repo", &p.repo_url),
                ("Live", &p.live_url),
                ("Logo", &p.logo_url),
                ("Created", &p.created_at),
            ];
            for (label, value) in optional {
                if let Some(value) = value {
                    lines.push(Line::from(vec![
                        Span::styled(format!("{}: ", label), Style::default().fg(colors.muted)),
                        Span::raw(value.clone()),
                    ]));
                }
            }
            if let Some(desc) = &p.description {
                lines.push(Line::default());
                lines.push(Line::from(desc.clone()));
            }
            Text::from(lines)
        }
        None => Text::from(Span::styled(
            "No project selected. Press n to create one.",
            Style::default().fg(colors.muted),
        )),
    };

    let detail = Paragraph::new(detail)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(" Details "));
    frame.render_widget(detail, detail_area);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

fn render_upload_popup(app: &App, frame: &mut Frame, area: Rect, colors: Palette) {
    let popup_area = centered(area, 70, 7);
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Upload documents ");
    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let instructions = Paragraph::new("File paths separated by spaces. Enter to upload, Esc to cancel.")
        .style(Style::default().fg(colors.muted));
    frame.render_widget(instructions, Rect::new(inner.x, inner.y, inner.width, 1));

    let input_area = Rect::new(inner.x, inner.y + 2, inner.width, 1);
    frame.render_widget(
        Paragraph::new(app.upload_input.as_str()).style(Style::default().fg(colors.accent)),
        input_area,
    );
    let cursor_x = (app.upload_input.chars().count() as u16).min(input_area.width);
    frame.set_cursor_position((input_area.x + cursor_x, input_area.y));

    if let Some(err) = app.upload.error() {
        let error = Paragraph::new(Span::styled(err.to_string(), Style::default().fg(colors.error)));
        frame.render_widget(error, Rect::new(inner.x, inner.y + 4, inner.width, 1));
    }
}

fn render_project_form(app: &App, frame: &mut Frame, area: Rect, colors: Palette) {
    let fields = ProjectField::all();
    let popup_area = centered(area, 70, fields.len() as u16 + 6);
    frame.render_widget(Clear, popup_area);

    let title = if app.form.is_submitting() {
        " New project (saving...) "
    } else {
        " New project "
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(title);
    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let focused = app.current_form_field();
    let mut lines: Vec<Line> = fields
        .iter()
        .map(|field| {
            let label_style = if *field == focused {
                Style::default().fg(colors.accent).bold()
            } else {
                Style::default().fg(colors.muted)
            };
            Line::from(vec![
                Span::styled(format!("{:<12}", field.label()), label_style),
                Span::styled(app.form.field(*field).to_string(), Style::default().fg(colors.text)),
            ])
        })
        .collect();

    lines.push(Line::default());
    lines.push(Line::from(Span::styled(
        "Status: draft, published or archived",
        Style::default().fg(colors.muted),
    )));
    if let Some(err) = app.form.error() {
        lines.extend(error_lines(err, colors));
    }

    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);

    if let Some(row) = fields.iter().position(|f| *f == focused) {
        let cursor_x = 12 + app.form.field(focused).chars().count() as u16;
        frame.set_cursor_position((inner.x + cursor_x.min(inner.width), inner.y + row as u16));
    }
}
