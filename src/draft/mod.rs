use uuid::Uuid;

use crate::card::{Card, CardColor};
use crate::storage::CardStore;

/// An edit-session-local scratch copy of one card.
///
/// The session never hands out the store's own value: editing happens on the
/// working copy, and nothing reaches the store until [`commit`]. Sessions
/// opened in auto-commit mode are the exception: every [`update`] commits
/// immediately, since board-level quick edits have no separate save gesture.
///
/// [`commit`]: DraftSession::commit
/// [`update`]: DraftSession::update
#[derive(Debug, Clone)]
pub struct DraftSession {
    draft: Card,
    /// Baseline for unsaved-change detection. `None` means the card has
    /// never been committed, so the draft counts as unsaved from the start.
    committed: Option<Card>,
    auto_commit: bool,
}

impl DraftSession {
    /// Opens a session for `card_id`, deep-copying the store entry. A `None`
    /// id, or an id the store no longer knows, starts a brand-new card.
    pub fn open(store: &CardStore, card_id: Option<Uuid>, default_color: CardColor) -> Self {
        let existing = card_id.and_then(|id| store.get(id)).cloned();
        match existing {
            Some(card) => Self {
                committed: Some(card.clone()),
                draft: card,
                auto_commit: false,
            },
            None => Self {
                draft: Card::empty(default_color),
                committed: None,
                auto_commit: false,
            },
        }
    }

    pub fn with_auto_commit(mut self) -> Self {
        self.auto_commit = true;
        self
    }

    pub fn is_auto_commit(&self) -> bool {
        self.auto_commit
    }

    /// The current working copy.
    pub fn card(&self) -> &Card {
        &self.draft
    }

    pub fn card_id(&self) -> Uuid {
        self.draft.id
    }

    /// True while the session has never produced a committed version of its
    /// card.
    pub fn is_new(&self) -> bool {
        self.committed.is_none()
    }

    /// Replaces the working copy wholesale. Callers construct the new value
    /// through the card edit helpers. In auto-commit mode the replacement is
    /// committed to the store at once.
    pub fn update(&mut self, card: Card, store: &mut CardStore) {
        debug_assert_eq!(card.id, self.draft.id, "draft session is bound to one card");
        self.draft = card;
        if self.auto_commit {
            self.commit(store);
        }
    }

    /// Structural comparison against the last committed snapshot. Any
    /// difference in title, items (order, text, completed flags) or color
    /// counts; a never-committed card is unsaved by definition.
    pub fn has_unsaved_changes(&self) -> bool {
        match &self.committed {
            Some(snapshot) => !self.draft.content_eq(snapshot),
            None => true,
        }
    }

    /// Writes the working copy into the store and re-baselines, so
    /// [`has_unsaved_changes`](Self::has_unsaved_changes) is false until the
    /// next edit.
    pub fn commit(&mut self, store: &mut CardStore) {
        store.upsert(self.draft.clone());
        self.committed = Some(self.draft.clone());
    }

    /// Drops the working copy without touching the store.
    pub fn discard(self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{CardStore, MemoryBackend};

    fn empty_store() -> CardStore {
        CardStore::open(Box::new(MemoryBackend::new()))
    }

    fn store_with_card() -> (CardStore, Uuid) {
        let mut store = empty_store();
        let card = Card::empty(CardColor::Yellow).renamed("Existing");
        let id = card.id;
        store.upsert(card);
        (store, id)
    }

    #[test]
    fn brand_new_draft_is_unsaved_immediately() {
        let store = empty_store();
        let session = DraftSession::open(&store, None, CardColor::White);
        assert!(session.is_new());
        assert!(session.has_unsaved_changes());
    }

    #[test]
    fn draft_over_existing_card_starts_clean() {
        let (store, id) = store_with_card();
        let session = DraftSession::open(&store, Some(id), CardColor::White);
        assert!(!session.is_new());
        assert!(!session.has_unsaved_changes());
    }

    #[test]
    fn opening_a_vanished_id_behaves_like_a_new_card() {
        let store = empty_store();
        let session = DraftSession::open(&store, Some(Uuid::new_v4()), CardColor::Blue);
        assert!(session.is_new());
        assert!(session.has_unsaved_changes());
        assert_eq!(session.card().background_color, CardColor::Blue);
    }

    #[test]
    fn edits_mark_the_session_unsaved_and_commit_clears_it() {
        let (mut store, id) = store_with_card();
        let mut session = DraftSession::open(&store, Some(id), CardColor::White);

        let renamed = session.card().renamed("Renamed");
        session.update(renamed, &mut store);
        assert!(session.has_unsaved_changes());
        // nothing committed yet
        assert_eq!(store.get(id).unwrap().title, "Existing");

        session.commit(&mut store);
        assert!(!session.has_unsaved_changes());
        assert_eq!(store.get(id).unwrap().title, "Renamed");
    }

    #[test]
    fn unchanged_session_leaves_the_store_entry_untouched() {
        let (store, id) = store_with_card();
        let before = store.get(id).unwrap().clone();
        let session = DraftSession::open(&store, Some(id), CardColor::White);
        assert!(!session.has_unsaved_changes());
        session.discard();
        let after = store.get(id).unwrap();
        assert_eq!(*after, before, "updated_at included");
    }

    #[test]
    fn discard_drops_pending_edits() {
        let (mut store, id) = store_with_card();
        let mut session = DraftSession::open(&store, Some(id), CardColor::White);
        let edited = session.card().renamed("Never saved");
        session.update(edited, &mut store);
        session.discard();
        assert_eq!(store.get(id).unwrap().title, "Existing");
    }

    #[test]
    fn auto_commit_mode_writes_through_on_every_update() {
        let (mut store, id) = store_with_card();
        let mut session =
            DraftSession::open(&store, Some(id), CardColor::White).with_auto_commit();
        let item_id = session.card().todos[0].id;
        let toggled = session.card().with_item_toggled(item_id);
        session.update(toggled, &mut store);
        assert!(store.get(id).unwrap().todos[0].completed);
        assert!(!session.has_unsaved_changes());
    }

    #[test]
    fn toggle_order_and_color_changes_all_count_as_unsaved() {
        let (mut store, id) = store_with_card();
        store.upsert(store.get(id).unwrap().with_new_item());
        let mut session = DraftSession::open(&store, Some(id), CardColor::White);

        let recolored = session.card().recolored(CardColor::Purple);
        session.update(recolored, &mut store);
        assert!(session.has_unsaved_changes());
        session.commit(&mut store);

        let reordered = session.card().with_item_moved(0, 1);
        session.update(reordered, &mut store);
        assert!(session.has_unsaved_changes());
    }
}
