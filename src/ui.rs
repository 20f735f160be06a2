use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
};

use crate::app::{App, Screen, TurnState};
use crate::scenario;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    match app.screen {
        Screen::Picker => render_picker(app, frame, body_area),
        Screen::Chat => render_chat(app, frame, body_area),
    }

    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let scenario_name = app.scenario.map(|s| s.name).unwrap_or("");

    let title = Line::from(vec![
        Span::styled(" Socratic ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(scenario_name, Style::default().fg(Color::White)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hints: Vec<Span> = match app.screen {
        Screen::Picker => vec![
            Span::styled(" j/k ", key_style),
            Span::styled(" choose ", label_style),
            Span::styled(" Enter ", key_style),
            Span::styled(" start ", label_style),
            Span::styled(" r ", key_style),
            Span::styled(" resume ", label_style),
            Span::styled(" q ", key_style),
            Span::styled(" quit ", label_style),
        ],
        Screen::Chat if app.panel.is_some() => vec![
            Span::styled(" Up/Down ", key_style),
            Span::styled(" options ", label_style),
            Span::styled(" Left/Right ", key_style),
            Span::styled(" questions ", label_style),
            Span::styled(" Space ", key_style),
            Span::styled(" select ", label_style),
            Span::styled(" Enter ", key_style),
            Span::styled(" submit ", label_style),
            Span::styled(" Tab ", key_style),
            Span::styled(" next ", label_style),
        ],
        Screen::Chat => {
            let mut hints = vec![
                Span::styled(" Enter ", key_style),
                Span::styled(" send ", label_style),
                Span::styled(" Up/Down ", key_style),
                Span::styled(" scroll ", label_style),
                Span::styled(" Esc ", key_style),
                Span::styled(" scenarios ", label_style),
            ];
            if app.finished {
                hints.push(Span::styled(
                    " conversation complete ",
                    Style::default().fg(Color::Green),
                ));
            }
            hints
        }
    };

    let footer = Paragraph::new(Line::from(hints));
    frame.render_widget(footer, area);
}

fn render_picker(app: &mut App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Choose a scenario ");

    let items: Vec<ListItem> = scenario::SCENARIOS
        .iter()
        .map(|s| {
            ListItem::new(Line::from(vec![
                Span::styled(s.name, Style::default().add_modifier(Modifier::BOLD)),
                Span::raw("  "),
                Span::styled(s.description, Style::default().fg(Color::DarkGray)),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Cyan)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    app.picker_area = Some(area);
    frame.render_stateful_widget(list, area, &mut app.picker_state);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let panel_height = app
        .panel
        .as_ref()
        .map(|p| (p.slot_count() as u16) * 2 + 7)
        .unwrap_or(0);

    let status_height = if app.status.is_some() { 1 } else { 0 };

    let [chat_area, status_area, bottom_area] = Layout::vertical([
        Constraint::Min(4),
        Constraint::Length(status_height),
        Constraint::Length(if panel_height > 0 {
            panel_height.min(area.height.saturating_sub(5))
        } else {
            3
        }),
    ])
    .areas(area);

    render_transcript(app, frame, chat_area);

    if let Some(status) = &app.status {
        let line = Paragraph::new(Span::styled(
            status.as_str(),
            Style::default().fg(Color::Red),
        ));
        frame.render_widget(line, status_area);
    }

    if app.panel.is_some() {
        render_panel(app, frame, bottom_area);
    } else {
        render_input(app, frame, bottom_area);
    }
}

fn render_transcript(app: &mut App, frame: &mut Frame, area: Rect) {
    app.chat_area = Some(area);
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Conversation ");

    let entries = app.transcript();
    let mut lines: Vec<Line> = Vec::new();

    for entry in &entries {
        if entry.from_user {
            lines.push(Line::from(Span::styled(
                "You:",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                "AI:",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
        }
        for line in entry.text.lines() {
            lines.push(Line::from(line.to_string()));
        }
        lines.push(Line::default());
    }

    if app.turn == TurnState::AwaitingModel {
        lines.push(Line::from(Span::styled(
            "AI:",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    let chat = Paragraph::new(Text::from(lines))
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let loading = app.turn != TurnState::Idle;
    let border_color = if loading { Color::DarkGray } else { Color::Yellow };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(if loading { " Waiting... " } else { " Your answer " });

    // Horizontal scroll keeps the cursor visible in a single-row field.
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.input_cursor;
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app
        .input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(block);

    frame.render_widget(input, area);

    if !loading {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_panel(app: &mut App, frame: &mut Frame, area: Rect) {
    // Snapshot everything the renderer needs so the hit-test areas on
    // `app` can be updated while drawing.
    let Some(panel) = app.panel.as_ref() else {
        return;
    };
    let headers: Vec<String> = panel.questions.iter().map(|q| q.header.clone()).collect();
    let answered: Vec<bool> = (0..headers.len()).map(|i| panel.is_answered(i)).collect();
    let current = panel.current;
    let question = panel.current_question().clone();
    let focused = panel.focused;
    let selected: Vec<bool> = (0..question.options.len())
        .map(|i| panel.is_selected(i))
        .collect();
    let other_selected = panel.other_selected();
    let other_text = panel.other_text().to_string();
    let editing_other = panel.editing_other;
    let all_answered = panel.all_answered();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta))
        .title(" AI Questions ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.height < 4 {
        return;
    }

    // Tabs row: one per question header, then Submit.
    let mut tab_spans: Vec<Span> = Vec::new();
    let mut tab_areas: Vec<Rect> = Vec::new();
    let mut x = inner.x;
    for (i, header) in headers.iter().enumerate() {
        let mark = if answered[i] { "+" } else { " " };
        let label = format!(" {}{} ", header, mark);
        let width = label.chars().count() as u16;
        let style = if i == current {
            Style::default().bg(Color::Magenta).fg(Color::White).bold()
        } else if answered[i] {
            Style::default().fg(Color::Green)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        tab_spans.push(Span::styled(label, style));
        tab_spans.push(Span::raw(" "));
        tab_areas.push(Rect {
            x,
            y: inner.y,
            width,
            height: 1,
        });
        x += width + 1;
    }

    let submit_label = " Submit ";
    let submit_style = if all_answered {
        Style::default().bg(Color::Green).fg(Color::Black).bold()
    } else {
        Style::default().fg(Color::DarkGray)
    };
    tab_spans.push(Span::styled(submit_label, submit_style));
    let submit_area = Rect {
        x,
        y: inner.y,
        width: submit_label.chars().count() as u16,
        height: 1,
    };

    let tabs = Paragraph::new(Line::from(tab_spans));
    frame.render_widget(
        tabs,
        Rect {
            x: inner.x,
            y: inner.y,
            width: inner.width,
            height: 1,
        },
    );

    // Question text under the tabs.
    let question_area = Rect {
        x: inner.x,
        y: inner.y + 2,
        width: inner.width,
        height: 2,
    };
    let question_text = Paragraph::new(question.question.as_str())
        .wrap(Wrap { trim: true })
        .style(Style::default().add_modifier(Modifier::BOLD));
    frame.render_widget(question_text, question_area);

    // Option rows: marker + label, description underneath. The trailing
    // row is the "Other" free-text slot.
    let marker = |on: bool| -> &'static str {
        if question.multi_select {
            if on { "[x]" } else { "[ ]" }
        } else if on {
            "(*)"
        } else {
            "( )"
        }
    };

    let mut option_areas: Vec<Rect> = Vec::new();
    let mut y = inner.y + 4;
    for (i, option) in question.options.iter().enumerate() {
        let row = Rect {
            x: inner.x,
            y,
            width: inner.width,
            height: 2,
        };
        if row.y + row.height > inner.y + inner.height {
            break;
        }

        let row_style = if focused == i {
            Style::default().bg(Color::DarkGray)
        } else {
            Style::default()
        };
        let label_line = Line::from(vec![
            Span::styled(format!(" {} ", marker(selected[i])), row_style),
            Span::styled(
                option.label.clone(),
                row_style.add_modifier(Modifier::BOLD),
            ),
        ]);
        let desc_line = Line::from(Span::styled(
            format!("     {}", option.description),
            Style::default().fg(Color::DarkGray),
        ));
        frame.render_widget(Paragraph::new(vec![label_line, desc_line]), row);

        option_areas.push(row);
        y += 2;
    }

    // "Other" slot.
    let other_row = Rect {
        x: inner.x,
        y,
        width: inner.width,
        height: 2,
    };
    if other_row.y + other_row.height <= inner.y + inner.height {
        let row_style = if focused == question.options.len() {
            Style::default().bg(Color::DarkGray)
        } else {
            Style::default()
        };
        let label_line = Line::from(vec![
            Span::styled(format!(" {} ", marker(other_selected)), row_style),
            Span::styled("Other", row_style.add_modifier(Modifier::BOLD)),
        ]);
        let detail = if other_selected {
            let caret = if editing_other { "_" } else { "" };
            Line::from(Span::styled(
                format!("     > {}{}", other_text, caret),
                Style::default().fg(Color::Cyan),
            ))
        } else {
            Line::from(Span::styled(
                "     Type your own answer",
                Style::default().fg(Color::DarkGray),
            ))
        };
        frame.render_widget(Paragraph::new(vec![label_line, detail]), other_row);
        option_areas.push(other_row);
    }

    app.panel_tab_areas = tab_areas;
    app.panel_submit_area = Some(submit_area);
    app.panel_option_areas = option_areas;
}
