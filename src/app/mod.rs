use std::io::Stdout;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::widgets::ListState;
use ratatui::Terminal;
use strum::IntoEnumIterator;

use crate::card::CardColor;
use crate::config::AppConfig;
use crate::draft::DraftSession;
use crate::focus::{FocusRouter, FocusTarget};
use crate::storage::CardStore;
use crate::ui;
use uuid::Uuid;

pub mod state;

pub use state::{
    AppState, DeleteCardOverlay, EditorField, EditorOverlay, FocusPane, InputLine, OverlayState,
};

enum EditorOutcome {
    None,
    Close,
    Saved(Uuid),
}

pub struct App {
    pub config: Arc<AppConfig>,
    store: CardStore,
    state: AppState,
    list_state: ListState,
    focus_router: FocusRouter,
    should_quit: bool,
    tick_rate: Duration,
}

impl App {
    pub fn new(config: Arc<AppConfig>, store: CardStore) -> Self {
        let mut state = AppState::new(config.default_color, config.theme);
        let mut list_state = ListState::default();
        if !store.is_empty() {
            list_state.select(Some(0));
        } else {
            state.set_status_message(Some(
                "Empty board. Press `n` to create your first card.".to_string(),
            ));
        }
        Self {
            config,
            store,
            state,
            list_state,
            focus_router: FocusRouter::new(),
            should_quit: false,
            tick_rate: Duration::from_millis(250),
        }
    }

    pub fn store(&self) -> &CardStore {
        &self.store
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn run(&mut self) -> Result<()> {
        let mut terminal = setup_terminal()?;
        let result = self.event_loop(&mut terminal);
        restore_terminal(&mut terminal)?;
        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        loop {
            terminal
                .draw(|frame| {
                    if !self.store.is_empty() {
                        self.list_state.select(Some(self.state.selected_card));
                    } else {
                        self.list_state.select(None);
                    }
                    ui::draw_app(frame, &self.state, &self.store, &mut self.list_state);
                })
                .context("rendering frame")?;

            // Focus requests resolve only after the frame that reflects the
            // structural change, so "newest item" sees the new row.
            self.apply_pending_focus();

            if self.should_quit {
                break;
            }

            if event::poll(self.tick_rate).context("polling for terminal events")? {
                match event::read().context("reading terminal event")? {
                    Event::Key(key) => self.handle_key(key),
                    Event::Resize(_, _) => {
                        // next draw adapts to the new size
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    /// Drains the focus router against the live row list and rebinds the
    /// editor's input. Called once per frame, after drawing.
    pub fn apply_pending_focus(&mut self) {
        let Some(editor) = self.state.editor_mut() else {
            return;
        };
        self.focus_router.sync_rows(editor.item_count());
        if let Some(focus) = self.focus_router.resolve() {
            editor.apply_resolved_focus(focus);
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        self.state.set_status_message(None);

        if self.handle_overlay_key(key) {
            return;
        }
        self.handle_board_key(key);
    }

    fn handle_overlay_key(&mut self, key: KeyEvent) -> bool {
        match &self.state.overlay {
            Some(OverlayState::Editor(_)) => {
                self.handle_editor_key(key);
                true
            }
            Some(OverlayState::DeleteCard(overlay)) => {
                let overlay = overlay.clone();
                match key.code {
                    KeyCode::Char('y') | KeyCode::Enter => {
                        self.store.remove(overlay.card_id);
                        self.state.overlay = None;
                        self.state.normalize_selection(&self.store);
                        self.state
                            .set_status_message(Some(format!("Deleted \"{}\"", overlay.title)));
                    }
                    KeyCode::Char('n') | KeyCode::Esc => {
                        self.state.overlay = None;
                    }
                    _ => {}
                }
                true
            }
            None => false,
        }
    }

    fn handle_board_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            KeyCode::Char('j') | KeyCode::Down => match self.state.focus {
                FocusPane::Board => self.state.move_card_selection(&self.store, 1),
                FocusPane::Items => self.state.move_item_selection(&self.store, 1),
            },
            KeyCode::Char('k') | KeyCode::Up => match self.state.focus {
                FocusPane::Board => self.state.move_card_selection(&self.store, -1),
                FocusPane::Items => self.state.move_item_selection(&self.store, -1),
            },
            KeyCode::Tab => {
                self.state.focus = match self.state.focus {
                    FocusPane::Board => FocusPane::Items,
                    FocusPane::Items => FocusPane::Board,
                };
            }
            KeyCode::Char('n') => self.open_editor(None),
            KeyCode::Char('e') | KeyCode::Enter => {
                if let Some(id) = self.state.selected_card_id(&self.store) {
                    self.open_editor(Some(id));
                }
            }
            KeyCode::Char('d') => {
                if let Some(card) = self.state.selected_card(&self.store) {
                    self.state.overlay = Some(OverlayState::DeleteCard(DeleteCardOverlay {
                        card_id: card.id,
                        title: display_title(&card.title),
                    }));
                }
            }
            KeyCode::Char(' ') if self.state.focus == FocusPane::Items => {
                self.quick_toggle_selected_item();
            }
            KeyCode::Char('c') => self.quick_cycle_color(),
            _ => {}
        }
    }

    fn handle_editor_key(&mut self, key: KeyEvent) {
        let outcome = self.dispatch_editor_key(key);
        match outcome {
            EditorOutcome::None => {}
            EditorOutcome::Close => self.close_editor(),
            EditorOutcome::Saved(id) => {
                self.state.set_status_message(Some("Card saved.".to_string()));
                self.select_card_by_id(id);
            }
        }
    }

    fn dispatch_editor_key(&mut self, key: KeyEvent) -> EditorOutcome {
        let Some(editor) = self.state.editor_mut() else {
            return EditorOutcome::None;
        };

        if editor.confirm_discard {
            match key.code {
                KeyCode::Char('y') | KeyCode::Enter => return EditorOutcome::Close,
                KeyCode::Char('n') | KeyCode::Esc => {
                    editor.confirm_discard = false;
                }
                _ => {}
            }
            return EditorOutcome::None;
        }

        if editor.picker_open {
            let palette: Vec<CardColor> = CardColor::iter().collect();
            match key.code {
                KeyCode::Esc | KeyCode::Char('q') => editor.picker_open = false,
                KeyCode::Left | KeyCode::Char('h') => {
                    editor.picker_index =
                        (editor.picker_index + palette.len() - 1) % palette.len();
                }
                KeyCode::Right | KeyCode::Char('l') => {
                    editor.picker_index = (editor.picker_index + 1) % palette.len();
                }
                KeyCode::Enter => {
                    let color = palette[editor.picker_index];
                    let next = editor.session.card().recolored(color);
                    editor.session.update(next, &mut self.store);
                    editor.picker_open = false;
                }
                _ => {}
            }
            return EditorOutcome::None;
        }

        match key.code {
            KeyCode::Esc => {
                editor.flush_input(&mut self.store);
                if editor.session.has_unsaved_changes() {
                    editor.confirm_discard = true;
                } else {
                    return EditorOutcome::Close;
                }
            }
            KeyCode::Char('s') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                editor.flush_input(&mut self.store);
                editor.session.commit(&mut self.store);
                return EditorOutcome::Saved(editor.session.card_id());
            }
            KeyCode::Enter => {
                editor.flush_input(&mut self.store);
                let next = editor.session.card().with_new_item();
                editor.session.update(next, &mut self.store);
                self.focus_router.request(FocusTarget::NewestItem);
            }
            KeyCode::Tab | KeyCode::Down => {
                editor.flush_input(&mut self.store);
                let next = next_field(editor.field, editor.item_count());
                editor.bind_field(next);
            }
            KeyCode::BackTab | KeyCode::Up => {
                editor.flush_input(&mut self.store);
                let prev = prev_field(editor.field, editor.item_count());
                editor.bind_field(prev);
            }
            KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                if let EditorField::Item(index) = editor.field {
                    editor.flush_input(&mut self.store);
                    if let Some(id) = editor.current_item_id() {
                        let next = editor.session.card().without_item(id);
                        editor.session.update(next, &mut self.store);
                        // same index on purpose: the router no-ops once the
                        // list is shorter than the request
                        self.focus_router.request(FocusTarget::Item(index));
                    }
                }
            }
            KeyCode::Char('t') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                if let Some(id) = editor.current_item_id() {
                    editor.flush_input(&mut self.store);
                    let next = editor.session.card().with_item_toggled(id);
                    editor.session.update(next, &mut self.store);
                }
            }
            KeyCode::Char('k') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                if let EditorField::Item(index) = editor.field {
                    editor.flush_input(&mut self.store);
                    let next = editor.session.card().with_item_moved(index, -1);
                    editor.session.update(next, &mut self.store);
                    self.focus_router
                        .request(FocusTarget::Item(index.saturating_sub(1)));
                }
            }
            KeyCode::Char('j') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                if let EditorField::Item(index) = editor.field {
                    editor.flush_input(&mut self.store);
                    let next = editor.session.card().with_item_moved(index, 1);
                    editor.session.update(next, &mut self.store);
                    self.focus_router.request(FocusTarget::Item(index + 1));
                }
            }
            KeyCode::Char('p') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                let current = editor.session.card().background_color;
                editor.picker_index = CardColor::iter()
                    .position(|color| color == current)
                    .unwrap_or(0);
                editor.picker_open = true;
            }
            KeyCode::Backspace => {
                editor.input.backspace();
            }
            KeyCode::Delete => {
                editor.input.delete();
            }
            KeyCode::Left => editor.input.move_left(),
            KeyCode::Right => editor.input.move_right(),
            KeyCode::Home => editor.input.move_home(),
            KeyCode::End => editor.input.move_end(),
            KeyCode::Char(ch)
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER) =>
            {
                editor.input.insert_char(ch);
            }
            _ => {}
        }
        EditorOutcome::None
    }

    pub fn open_editor(&mut self, card_id: Option<Uuid>) {
        let session = DraftSession::open(&self.store, card_id, self.state.default_color);
        let row_count = session.card().todos.len();
        self.focus_router.activate(row_count);
        self.focus_router.request(FocusTarget::Title);
        self.state.overlay = Some(OverlayState::Editor(EditorOverlay::new(session)));
    }

    fn close_editor(&mut self) {
        self.focus_router.deactivate();
        self.state.overlay = None;
        self.state.normalize_selection(&self.store);
    }

    fn select_card_by_id(&mut self, id: Uuid) {
        if let Some(idx) = self.store.list().iter().position(|card| card.id == id) {
            self.state.selected_card = idx;
        }
    }

    /// Board-level checkbox toggle: no modal, no save gesture. Runs through
    /// an auto-commit draft so the change hits the store immediately.
    fn quick_toggle_selected_item(&mut self) {
        let Some(card_id) = self.state.selected_card_id(&self.store) else {
            return;
        };
        let Some(item_id) = self.state.selected_item_id(&self.store) else {
            return;
        };
        let mut session = DraftSession::open(&self.store, Some(card_id), self.state.default_color)
            .with_auto_commit();
        let next = session.card().with_item_toggled(item_id);
        session.update(next, &mut self.store);
    }

    /// Steps the selected card to the next palette color without opening the
    /// editor.
    fn quick_cycle_color(&mut self) {
        let Some(card_id) = self.state.selected_card_id(&self.store) else {
            return;
        };
        let palette: Vec<CardColor> = CardColor::iter().collect();
        let mut session = DraftSession::open(&self.store, Some(card_id), self.state.default_color)
            .with_auto_commit();
        let current = session.card().background_color;
        let idx = palette.iter().position(|c| *c == current).unwrap_or(0);
        let next_color = palette[(idx + 1) % palette.len()];
        let next = session.card().recolored(next_color);
        session.update(next, &mut self.store);
    }
}

fn next_field(field: EditorField, item_count: usize) -> EditorField {
    match field {
        EditorField::Title if item_count > 0 => EditorField::Item(0),
        EditorField::Title => EditorField::Title,
        EditorField::Item(index) if index + 1 < item_count => EditorField::Item(index + 1),
        EditorField::Item(_) => EditorField::Title,
    }
}

fn prev_field(field: EditorField, item_count: usize) -> EditorField {
    match field {
        EditorField::Title if item_count > 0 => EditorField::Item(item_count - 1),
        EditorField::Title => EditorField::Title,
        EditorField::Item(0) => EditorField::Title,
        EditorField::Item(index) => EditorField::Item(index - 1),
    }
}

fn display_title(title: &str) -> String {
    if title.trim().is_empty() {
        "Untitled card".to_string()
    } else {
        title.to_string()
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("enabling raw mode")?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen).context("entering alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).context("creating terminal")
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode().context("disabling raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("leaving alternate screen")?;
    terminal.show_cursor().context("restoring cursor")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::Card;
    use crate::config::AppConfig;
    use crate::storage::MemoryBackend;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(ch: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(ch), KeyModifiers::CONTROL)
    }

    fn app_with_store(store: CardStore) -> App {
        App::new(Arc::new(AppConfig::default()), store)
    }

    fn empty_app() -> App {
        app_with_store(CardStore::open(Box::new(MemoryBackend::new())))
    }

    fn type_text(app: &mut App, text: &str) {
        for ch in text.chars() {
            app.handle_key(key(KeyCode::Char(ch)));
        }
    }

    #[test]
    fn create_card_via_editor_keys() {
        let mut app = empty_app();
        app.handle_key(key(KeyCode::Char('n')));
        assert!(app.state().is_editing());

        type_text(&mut app, "Groceries");
        app.handle_key(ctrl('s'));

        let store = app.store();
        assert_eq!(store.len(), 1);
        assert_eq!(store.list()[0].title, "Groceries");
        assert_eq!(store.list()[0].todos.len(), 1);
    }

    #[test]
    fn escape_on_clean_editor_closes_without_writing() {
        let mut store = CardStore::open(Box::new(MemoryBackend::new()));
        store.upsert(Card::empty(CardColor::White).renamed("Keep"));
        let before = store.list()[0].clone();
        let mut app = app_with_store(store);

        app.handle_key(key(KeyCode::Enter));
        assert!(app.state().is_editing());
        app.handle_key(key(KeyCode::Esc));
        assert!(!app.state().is_editing());
        assert_eq!(app.store().list()[0], before);
    }

    #[test]
    fn escape_with_unsaved_edits_asks_before_discarding() {
        let mut store = CardStore::open(Box::new(MemoryBackend::new()));
        store.upsert(Card::empty(CardColor::White).renamed("Original"));
        let mut app = app_with_store(store);

        app.handle_key(key(KeyCode::Enter));
        type_text(&mut app, " extended");
        app.handle_key(key(KeyCode::Esc));
        assert!(app.state().editor().unwrap().confirm_discard);

        app.handle_key(key(KeyCode::Char('y')));
        assert!(!app.state().is_editing());
        assert_eq!(app.store().list()[0].title, "Original");
    }

    #[test]
    fn enter_appends_item_and_focus_lands_on_it_after_the_frame() {
        let mut app = empty_app();
        app.handle_key(key(KeyCode::Char('n')));
        app.apply_pending_focus();
        assert_eq!(app.state().editor().unwrap().field, EditorField::Title);

        type_text(&mut app, "List");
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.state().editor().unwrap().item_count(), 2);
        app.apply_pending_focus();
        assert_eq!(app.state().editor().unwrap().field, EditorField::Item(1));
    }

    #[test]
    fn deleting_last_item_leaves_focus_request_unresolved() {
        let mut app = empty_app();
        app.handle_key(key(KeyCode::Char('n')));
        app.apply_pending_focus();
        // move onto the single item row, then delete it
        app.handle_key(key(KeyCode::Tab));
        assert_eq!(app.state().editor().unwrap().field, EditorField::Item(0));
        app.handle_key(ctrl('d'));
        assert_eq!(app.state().editor().unwrap().item_count(), 0);
        // the pending Item(0) request must no-op, not panic or mis-focus
        app.apply_pending_focus();
        assert!(app.state().is_editing());
    }

    #[test]
    fn board_space_toggles_without_opening_the_editor() {
        let mut store = CardStore::open(Box::new(MemoryBackend::new()));
        store.upsert(Card::empty(CardColor::White).renamed("Quick"));
        let mut app = app_with_store(store);

        app.handle_key(key(KeyCode::Tab)); // switch to the items pane
        app.handle_key(key(KeyCode::Char(' ')));
        assert!(!app.state().is_editing());
        assert!(app.store().list()[0].todos[0].completed);
    }

    #[test]
    fn delete_confirmation_removes_the_card_on_yes_only() {
        let mut store = CardStore::open(Box::new(MemoryBackend::new()));
        store.upsert(Card::empty(CardColor::White).renamed("Doomed"));
        let mut app = app_with_store(store);

        app.handle_key(key(KeyCode::Char('d')));
        app.handle_key(key(KeyCode::Esc));
        assert_eq!(app.store().len(), 1);

        app.handle_key(key(KeyCode::Char('d')));
        app.handle_key(key(KeyCode::Char('y')));
        assert!(app.store().is_empty());
    }

    #[test]
    fn color_picker_recolors_the_draft() {
        let mut app = empty_app();
        app.handle_key(key(KeyCode::Char('n')));
        app.handle_key(ctrl('p'));
        assert!(app.state().editor().unwrap().picker_open);
        app.handle_key(key(KeyCode::Right));
        app.handle_key(key(KeyCode::Enter));
        let editor = app.state().editor().unwrap();
        assert!(!editor.picker_open);
        assert_eq!(editor.session.card().background_color, CardColor::Red);
    }
}
