use unicode_segmentation::UnicodeSegmentation;
use uuid::Uuid;

use crate::card::{Card, CardColor};
use crate::config::ThemeName;
use crate::draft::DraftSession;
use crate::focus::ResolvedFocus;
use crate::sanitize;
use crate::storage::CardStore;

/// Which half of the board screen owns navigation keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Board,
    Items,
}

/// Single-line text input with a grapheme-aware cursor.
#[derive(Debug, Clone)]
pub struct InputLine {
    buffer: String,
    cursor: usize,
}

impl InputLine {
    pub fn new(text: &str) -> Self {
        Self {
            buffer: text.to_string(),
            cursor: text.len(),
        }
    }

    pub fn text(&self) -> &str {
        &self.buffer
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn insert_char(&mut self, ch: char) {
        let mut scratch = [0u8; 4];
        let encoded = ch.encode_utf8(&mut scratch);
        self.buffer.insert_str(self.cursor, encoded);
        self.cursor += encoded.len();
    }

    pub fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        let prev = prev_grapheme_boundary(&self.buffer, self.cursor);
        self.buffer.drain(prev..self.cursor);
        self.cursor = prev;
        true
    }

    pub fn delete(&mut self) -> bool {
        if self.cursor >= self.buffer.len() {
            return false;
        }
        let next = next_grapheme_boundary(&self.buffer, self.cursor);
        if next == self.cursor {
            return false;
        }
        self.buffer.drain(self.cursor..next);
        true
    }

    pub fn move_left(&mut self) {
        if self.cursor > 0 {
            self.cursor = prev_grapheme_boundary(&self.buffer, self.cursor);
        }
    }

    pub fn move_right(&mut self) {
        if self.cursor < self.buffer.len() {
            self.cursor = next_grapheme_boundary(&self.buffer, self.cursor);
        }
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.buffer.len();
    }
}

fn prev_grapheme_boundary(text: &str, index: usize) -> usize {
    text.grapheme_indices(true)
        .map(|(idx, _)| idx)
        .take_while(|idx| *idx < index)
        .last()
        .unwrap_or(0)
}

fn next_grapheme_boundary(text: &str, index: usize) -> usize {
    text.grapheme_indices(true)
        .map(|(idx, _)| idx)
        .find(|idx| *idx > index)
        .unwrap_or(text.len())
}

/// The input currently bound to the editor's [`InputLine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorField {
    Title,
    Item(usize),
}

/// Modal editing session over one card.
#[derive(Debug)]
pub struct EditorOverlay {
    pub session: DraftSession,
    pub field: EditorField,
    pub input: InputLine,
    pub picker_open: bool,
    pub picker_index: usize,
    pub confirm_discard: bool,
}

impl EditorOverlay {
    pub fn new(session: DraftSession) -> Self {
        let input = InputLine::new(&session.card().title);
        Self {
            session,
            field: EditorField::Title,
            input,
            picker_open: false,
            picker_index: 0,
            confirm_discard: false,
        }
    }

    /// Writes the current input buffer into the draft (sanitized) so field
    /// switches and structural edits never lose keystrokes.
    pub fn flush_input(&mut self, store: &mut CardStore) {
        let next = match self.field {
            EditorField::Title => {
                let title = sanitize::sanitize_title(self.input.text());
                if title == self.session.card().title {
                    return;
                }
                self.session.card().renamed(&title)
            }
            EditorField::Item(index) => {
                let Some(item) = self.session.card().todos.get(index) else {
                    return;
                };
                let task = sanitize::sanitize_task(self.input.text());
                if task == item.task {
                    return;
                }
                let id = item.id;
                self.session.card().with_item_text(id, &task)
            }
        };
        self.session.update(next, store);
    }

    /// Rebinds the input line to `field`, loading that field's committed
    /// draft text. Out-of-range item fields clamp to the nearest valid one.
    pub fn bind_field(&mut self, field: EditorField) {
        let card = self.session.card();
        let field = match field {
            EditorField::Item(_) if card.todos.is_empty() => EditorField::Title,
            EditorField::Item(index) => EditorField::Item(index.min(card.todos.len() - 1)),
            EditorField::Title => EditorField::Title,
        };
        let text = match field {
            EditorField::Title => card.title.clone(),
            EditorField::Item(index) => card.todos[index].task.clone(),
        };
        self.field = field;
        self.input = InputLine::new(&text);
    }

    pub fn apply_resolved_focus(&mut self, focus: ResolvedFocus) {
        match focus {
            ResolvedFocus::Title => self.bind_field(EditorField::Title),
            ResolvedFocus::Item(index) => self.bind_field(EditorField::Item(index)),
        }
    }

    pub fn item_count(&self) -> usize {
        self.session.card().todos.len()
    }

    pub fn current_item_id(&self) -> Option<Uuid> {
        match self.field {
            EditorField::Item(index) => self.session.card().todos.get(index).map(|i| i.id),
            EditorField::Title => None,
        }
    }
}

/// Delete confirmation for a board card.
#[derive(Debug, Clone)]
pub struct DeleteCardOverlay {
    pub card_id: Uuid,
    pub title: String,
}

#[derive(Debug)]
pub enum OverlayState {
    Editor(EditorOverlay),
    DeleteCard(DeleteCardOverlay),
}

pub struct AppState {
    pub focus: FocusPane,
    pub selected_card: usize,
    pub selected_item: usize,
    pub status_message: Option<String>,
    pub overlay: Option<OverlayState>,
    pub default_color: CardColor,
    pub theme: ThemeName,
}

impl AppState {
    pub fn new(default_color: CardColor, theme: ThemeName) -> Self {
        Self {
            focus: FocusPane::Board,
            selected_card: 0,
            selected_item: 0,
            status_message: None,
            overlay: None,
            default_color,
            theme,
        }
    }

    pub fn selected_card<'a>(&self, store: &'a CardStore) -> Option<&'a Card> {
        store.list().get(self.selected_card)
    }

    pub fn selected_card_id(&self, store: &CardStore) -> Option<Uuid> {
        self.selected_card(store).map(|card| card.id)
    }

    pub fn selected_item_id(&self, store: &CardStore) -> Option<Uuid> {
        self.selected_card(store)
            .and_then(|card| card.todos.get(self.selected_item))
            .map(|item| item.id)
    }

    pub fn editor(&self) -> Option<&EditorOverlay> {
        match &self.overlay {
            Some(OverlayState::Editor(editor)) => Some(editor),
            _ => None,
        }
    }

    pub fn editor_mut(&mut self) -> Option<&mut EditorOverlay> {
        match &mut self.overlay {
            Some(OverlayState::Editor(editor)) => Some(editor),
            _ => None,
        }
    }

    pub fn is_editing(&self) -> bool {
        self.editor().is_some()
    }

    pub fn set_status_message(&mut self, message: Option<String>) {
        self.status_message = message;
    }

    pub fn move_card_selection(&mut self, store: &CardStore, delta: isize) {
        let len = store.len();
        if len == 0 {
            self.selected_card = 0;
            return;
        }
        let next = (self.selected_card as isize + delta).clamp(0, len as isize - 1);
        if next as usize != self.selected_card {
            self.selected_card = next as usize;
            self.selected_item = 0;
        }
    }

    pub fn move_item_selection(&mut self, store: &CardStore, delta: isize) {
        let Some(card) = self.selected_card(store) else {
            return;
        };
        let len = card.todos.len();
        if len == 0 {
            self.selected_item = 0;
            return;
        }
        let next = (self.selected_item as isize + delta).clamp(0, len as isize - 1);
        self.selected_item = next as usize;
    }

    /// Clamps both selections after the store changed underneath them.
    pub fn normalize_selection(&mut self, store: &CardStore) {
        if store.is_empty() {
            self.selected_card = 0;
            self.selected_item = 0;
            return;
        }
        self.selected_card = self.selected_card.min(store.len() - 1);
        let item_count = self
            .selected_card(store)
            .map(|card| card.todos.len())
            .unwrap_or(0);
        self.selected_item = self.selected_item.min(item_count.saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBackend;

    fn store_with_cards(n: usize) -> CardStore {
        let mut store = CardStore::open(Box::new(MemoryBackend::new()));
        for i in 0..n {
            store.upsert(Card::empty(CardColor::White).renamed(&format!("Card {i}")));
        }
        store
    }

    #[test]
    fn input_line_edits_around_multibyte_graphemes() {
        let mut input = InputLine::new("café");
        input.backspace();
        assert_eq!(input.text(), "caf");
        input.insert_char('é');
        input.move_home();
        input.move_right();
        input.insert_char('x');
        assert_eq!(input.text(), "cxafé");
    }

    #[test]
    fn input_line_delete_forward() {
        let mut input = InputLine::new("ab");
        input.move_home();
        assert!(input.delete());
        assert_eq!(input.text(), "b");
        input.move_end();
        assert!(!input.delete());
    }

    #[test]
    fn card_selection_clamps_at_both_ends() {
        let store = store_with_cards(3);
        let mut state = AppState::new(CardColor::White, ThemeName::Dark);
        state.move_card_selection(&store, -1);
        assert_eq!(state.selected_card, 0);
        state.move_card_selection(&store, 10);
        assert_eq!(state.selected_card, 2);
    }

    #[test]
    fn normalize_selection_recovers_from_deletions() {
        let mut store = store_with_cards(2);
        let mut state = AppState::new(CardColor::White, ThemeName::Dark);
        state.selected_card = 1;
        let gone = store.list()[1].id;
        store.remove(gone);
        state.normalize_selection(&store);
        assert_eq!(state.selected_card, 0);
    }

    #[test]
    fn editor_flush_sanitizes_and_updates_the_draft() {
        let mut store = store_with_cards(1);
        let id = store.list()[0].id;
        let session = DraftSession::open(&store, Some(id), CardColor::White);
        let mut editor = EditorOverlay::new(session);
        editor.input = InputLine::new("<b>Chores</b>");
        editor.flush_input(&mut store);
        assert_eq!(editor.session.card().title, "Chores");
        // nothing committed yet
        assert_eq!(store.get(id).unwrap().title, "Card 0");
    }

    #[test]
    fn bind_field_clamps_out_of_range_items() {
        let store = store_with_cards(1);
        let id = store.list()[0].id;
        let session = DraftSession::open(&store, Some(id), CardColor::White);
        let mut editor = EditorOverlay::new(session);
        editor.bind_field(EditorField::Item(7));
        assert_eq!(editor.field, EditorField::Item(0));
    }
}
