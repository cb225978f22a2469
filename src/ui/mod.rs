use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;
use strum::IntoEnumIterator;
use time::format_description::well_known::Rfc3339;
use unicode_width::UnicodeWidthStr;

use crate::app::state::{
    AppState, DeleteCardOverlay, EditorField, EditorOverlay, FocusPane, OverlayState,
};
use crate::card::{Card, CardColor};
use crate::config::ThemeName;
use crate::storage::CardStore;

fn accent(theme: ThemeName) -> Color {
    match theme {
        ThemeName::Dark => Color::Blue,
        ThemeName::Light => Color::Cyan,
    }
}

pub fn draw_app(frame: &mut Frame, state: &AppState, store: &CardStore, list_state: &mut ListState) {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(3)])
        .split(frame.size());

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(vertical[0]);

    draw_board(frame, state, store, list_state, columns[0]);
    draw_detail(frame, state, store, columns[1]);
    draw_status_bar(frame, state, vertical[1]);

    match &state.overlay {
        Some(OverlayState::Editor(editor)) => draw_editor(frame, editor),
        Some(OverlayState::DeleteCard(overlay)) => draw_delete_prompt(frame, overlay),
        None => {}
    }
}

fn draw_board(
    frame: &mut Frame,
    state: &AppState,
    store: &CardStore,
    list_state: &mut ListState,
    area: Rect,
) {
    let border_style = if state.focus == FocusPane::Board {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };

    let mut items = Vec::with_capacity(store.len());
    for card in store.list() {
        let swatch = Span::styled("■ ", Style::default().fg(palette_color(card.background_color)));
        let title = Span::styled(
            card_title(card),
            Style::default().add_modifier(Modifier::BOLD),
        );
        let progress = Span::styled(
            format!("  {}/{}", card.completed_count(), card.todos.len()),
            Style::default().fg(Color::Gray),
        );
        let meta = Line::from(Span::styled(
            format!("Updated {}", format_timestamp(card)),
            Style::default().fg(Color::Gray),
        ));
        items.push(ListItem::new(vec![
            Line::from(vec![swatch, title, progress]),
            meta,
        ]));
    }
    if items.is_empty() {
        items.push(ListItem::new("No cards yet. Press `n` to create one."));
    }

    let list = List::new(items)
        .block(
            Block::default()
                .title("Cards")
                .borders(Borders::ALL)
                .border_style(border_style),
        )
        .highlight_style(
            Style::default()
                .bg(accent(state.theme))
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▸ ");
    frame.render_stateful_widget(list, area, list_state);
}

fn draw_detail(frame: &mut Frame, state: &AppState, store: &CardStore, area: Rect) {
    let border_style = if state.focus == FocusPane::Items {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };

    let Some(card) = state.selected_card(store) else {
        let empty = Paragraph::new("Select a card to see its checklist.")
            .block(Block::default().title("Checklist").borders(Borders::ALL));
        frame.render_widget(empty, area);
        return;
    };

    let mut lines = Vec::with_capacity(card.todos.len());
    for (idx, item) in card.todos.iter().enumerate() {
        let marker = if item.completed { "[x] " } else { "[ ] " };
        let mut style = if item.completed {
            Style::default()
                .fg(Color::Gray)
                .add_modifier(Modifier::CROSSED_OUT)
        } else {
            Style::default()
        };
        if state.focus == FocusPane::Items && idx == state.selected_item {
            style = style.bg(accent(state.theme)).fg(Color::Black);
        }
        let task = if item.task.is_empty() { "(empty)" } else { &item.task };
        lines.push(Line::from(Span::styled(format!("{marker}{task}"), style)));
    }
    if lines.is_empty() {
        lines.push(Line::from(Span::styled(
            "Checklist is empty.",
            Style::default().fg(Color::Gray),
        )));
    }

    let block = Block::default()
        .title(card_title(card))
        .borders(Borders::ALL)
        .border_style(border_style.fg(palette_color(card.background_color)));
    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn draw_status_bar(frame: &mut Frame, state: &AppState, area: Rect) {
    let text = match &state.status_message {
        Some(message) => message.clone(),
        None => {
            if state.is_editing() {
                "Enter add item • Tab next field • ^T toggle • ^D delete • ^K/^J move • ^P color • ^S save • Esc close"
                    .to_string()
            } else {
                "n new • Enter edit • d delete • Tab pane • Space toggle • c color • q quit"
                    .to_string()
            }
        }
    };
    let bar = Paragraph::new(text)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(bar, area);
}

fn draw_editor(frame: &mut Frame, editor: &EditorOverlay) {
    let card = editor.session.card();
    let area = centered_rect(70, 70, frame.size());
    frame.render_widget(Clear, area);

    let dirty_marker = if editor.session.has_unsaved_changes() {
        " (unsaved)"
    } else {
        ""
    };
    let block = Block::default()
        .title(format!("Edit card{dirty_marker}"))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette_color(card.background_color)));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(1), Constraint::Length(1)])
        .split(inner);

    // title row
    let title_focused = editor.field == EditorField::Title;
    let title_line = if title_focused {
        input_line(editor, "Title: ")
    } else {
        let text = if card.title.is_empty() {
            "Untitled card".to_string()
        } else {
            card.title.clone()
        };
        Line::from(vec![
            Span::styled("Title: ", Style::default().fg(Color::Gray)),
            Span::raw(text),
        ])
    };
    frame.render_widget(Paragraph::new(title_line), rows[0]);

    // item rows
    let mut lines = Vec::with_capacity(card.todos.len());
    for (idx, item) in card.todos.iter().enumerate() {
        let marker = if item.completed { "[x] " } else { "[ ] " };
        if editor.field == EditorField::Item(idx) {
            let mut spans = vec![Span::styled(
                marker,
                Style::default().add_modifier(Modifier::BOLD),
            )];
            spans.extend(input_line(editor, "").spans);
            lines.push(Line::from(spans));
        } else {
            let style = if item.completed {
                Style::default().fg(Color::Gray)
            } else {
                Style::default()
            };
            lines.push(Line::from(Span::styled(
                format!("{marker}{}", item.task),
                style,
            )));
        }
    }
    if lines.is_empty() {
        lines.push(Line::from(Span::styled(
            "No items. Press Enter to add one.",
            Style::default().fg(Color::Gray),
        )));
    }
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), rows[1]);

    // palette strip
    let mut swatches = vec![Span::styled("Color: ", Style::default().fg(Color::Gray))];
    for color in CardColor::iter() {
        let style = if color == card.background_color {
            Style::default()
                .fg(palette_color(color))
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(palette_color(color))
        };
        swatches.push(Span::styled("■ ", style));
    }
    frame.render_widget(Paragraph::new(Line::from(swatches)), rows[2]);

    if editor.picker_open {
        draw_color_picker(frame, editor, area);
    }
    if editor.confirm_discard {
        draw_discard_prompt(frame, area);
    }
}

fn draw_color_picker(frame: &mut Frame, editor: &EditorOverlay, parent: Rect) {
    let area = centered_rect(60, 20, parent);
    frame.render_widget(Clear, area);
    let mut spans = Vec::new();
    for (idx, color) in CardColor::iter().enumerate() {
        let style = if idx == editor.picker_index {
            Style::default()
                .fg(palette_color(color))
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(palette_color(color))
        };
        spans.push(Span::styled(format!(" {} ", color.token()), style));
    }
    let picker = Paragraph::new(Line::from(spans))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .title("Pick a color (←/→, Enter)")
                .borders(Borders::ALL),
        );
    frame.render_widget(picker, area);
}

fn draw_discard_prompt(frame: &mut Frame, parent: Rect) {
    let area = centered_rect(60, 18, parent);
    frame.render_widget(Clear, area);
    let prompt = Paragraph::new("Discard unsaved changes? (y/n)")
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .title("Unsaved changes")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow)),
        );
    frame.render_widget(prompt, area);
}

fn draw_delete_prompt(frame: &mut Frame, overlay: &DeleteCardOverlay) {
    let area = centered_rect(50, 18, frame.size());
    frame.render_widget(Clear, area);
    let prompt = Paragraph::new(format!("Delete \"{}\"? (y/n)", overlay.title))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .title("Delete card")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red)),
        );
    frame.render_widget(prompt, area);
}

/// Renders the focused input with an inverted cursor cell.
fn input_line(editor: &EditorOverlay, label: &str) -> Line<'static> {
    let text = editor.input.text();
    let cursor = editor.input.cursor();
    let before = text[..cursor].to_string();
    let mut rest = text[cursor..].chars();
    let at = rest
        .next()
        .map(|ch| ch.to_string())
        .unwrap_or_else(|| " ".to_string());
    let after: String = rest.collect();
    let mut spans = Vec::with_capacity(4);
    if !label.is_empty() {
        spans.push(Span::styled(
            label.to_string(),
            Style::default().fg(Color::Gray),
        ));
    }
    spans.push(Span::raw(before));
    spans.push(Span::styled(at, Style::default().add_modifier(Modifier::REVERSED)));
    spans.push(Span::raw(after));
    Line::from(spans)
}

fn card_title(card: &Card) -> String {
    if card.title.trim().is_empty() {
        "Untitled card".to_string()
    } else {
        truncate_for_display(&card.title, 40)
    }
}

fn truncate_for_display(text: &str, max_width: usize) -> String {
    if text.width() <= max_width {
        return text.to_string();
    }
    let mut out = String::new();
    for ch in text.chars() {
        if out.width() + 1 > max_width.saturating_sub(1) {
            break;
        }
        out.push(ch);
    }
    out.push('…');
    out
}

fn format_timestamp(card: &Card) -> String {
    card.updated_at
        .format(&Rfc3339)
        .unwrap_or_else(|_| card.updated_at.unix_timestamp().to_string())
}

fn palette_color(color: CardColor) -> Color {
    match color {
        CardColor::White => Color::White,
        CardColor::Red => Color::Red,
        CardColor::Orange => Color::LightRed,
        CardColor::Yellow => Color::Yellow,
        CardColor::Green => Color::Green,
        CardColor::Teal => Color::Cyan,
        CardColor::Blue => Color::Blue,
        CardColor::Purple => Color::Magenta,
        CardColor::Pink => Color::LightMagenta,
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);
    horizontal[1]
}
