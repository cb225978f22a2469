use serde::{Deserialize, Deserializer, Serialize};
use strum::EnumIter;
use time::OffsetDateTime;
use uuid::Uuid;

/// One checklist line within a card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    pub id: Uuid,
    pub task: String,
    pub completed: bool,
}

impl TodoItem {
    pub fn empty() -> Self {
        Self {
            id: Uuid::new_v4(),
            task: String::new(),
            completed: false,
        }
    }
}

/// Fixed palette of card background colors. Unknown tokens in persisted data
/// fall back to [`CardColor::default`] instead of failing the whole load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, EnumIter)]
#[serde(rename_all = "kebab-case")]
pub enum CardColor {
    White,
    Red,
    Orange,
    Yellow,
    Green,
    Teal,
    Blue,
    Purple,
    Pink,
}

impl Default for CardColor {
    fn default() -> Self {
        CardColor::White
    }
}

impl CardColor {
    pub fn from_token(token: &str) -> Self {
        match token {
            "white" => CardColor::White,
            "red" => CardColor::Red,
            "orange" => CardColor::Orange,
            "yellow" => CardColor::Yellow,
            "green" => CardColor::Green,
            "teal" => CardColor::Teal,
            "blue" => CardColor::Blue,
            "purple" => CardColor::Purple,
            "pink" => CardColor::Pink,
            other => {
                tracing::debug!(token = other, "unknown color token, using default");
                CardColor::default()
            }
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            CardColor::White => "white",
            CardColor::Red => "red",
            CardColor::Orange => "orange",
            CardColor::Yellow => "yellow",
            CardColor::Green => "green",
            CardColor::Teal => "teal",
            CardColor::Blue => "blue",
            CardColor::Purple => "purple",
            CardColor::Pink => "pink",
        }
    }
}

impl<'de> Deserialize<'de> for CardColor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let token = String::deserialize(deserializer)?;
        Ok(CardColor::from_token(&token))
    }
}

/// A titled, colored container of checklist items.
///
/// `updated_at` is advisory on in-flight values: the store overwrites it at
/// commit time, so only store-held cards carry an authoritative timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: Uuid,
    pub title: String,
    pub todos: Vec<TodoItem>,
    pub background_color: CardColor,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Card {
    /// A brand-new card: empty title, exactly one empty item.
    pub fn empty(color: CardColor) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: String::new(),
            todos: vec![TodoItem::empty()],
            background_color: color,
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    /// Copy with one empty, uncompleted item appended.
    pub fn with_new_item(&self) -> Self {
        let mut next = self.clone();
        next.todos.push(TodoItem::empty());
        next.updated_at = OffsetDateTime::now_utc();
        next
    }

    /// Copy with the matching item removed. An id miss returns a
    /// content-identical clone and leaves the timestamp alone.
    pub fn without_item(&self, item_id: Uuid) -> Self {
        let mut next = self.clone();
        let before = next.todos.len();
        next.todos.retain(|item| item.id != item_id);
        if next.todos.len() != before {
            next.updated_at = OffsetDateTime::now_utc();
        }
        next
    }

    /// Copy with the matching item's text replaced. Id miss is a no-op.
    pub fn with_item_text(&self, item_id: Uuid, task: &str) -> Self {
        let mut next = self.clone();
        if let Some(item) = next.todos.iter_mut().find(|item| item.id == item_id) {
            item.task = task.to_string();
            next.updated_at = OffsetDateTime::now_utc();
        }
        next
    }

    /// Copy with the matching item's completed flag flipped. Id miss is a no-op.
    pub fn with_item_toggled(&self, item_id: Uuid) -> Self {
        let mut next = self.clone();
        if let Some(item) = next.todos.iter_mut().find(|item| item.id == item_id) {
            item.completed = !item.completed;
            next.updated_at = OffsetDateTime::now_utc();
        }
        next
    }

    /// Copy with the given item moved one position up or down. Out-of-range
    /// moves are no-ops.
    pub fn with_item_moved(&self, index: usize, delta: isize) -> Self {
        let mut next = self.clone();
        let len = next.todos.len() as isize;
        let target = index as isize + delta;
        if index as isize >= len || target < 0 || target >= len {
            return next;
        }
        next.todos.swap(index, target as usize);
        next.updated_at = OffsetDateTime::now_utc();
        next
    }

    pub fn renamed(&self, title: &str) -> Self {
        let mut next = self.clone();
        next.title = title.to_string();
        next.updated_at = OffsetDateTime::now_utc();
        next
    }

    pub fn recolored(&self, color: CardColor) -> Self {
        let mut next = self.clone();
        next.background_color = color;
        next.updated_at = OffsetDateTime::now_utc();
        next
    }

    /// Structural equality over the user-editable parts: title, items
    /// (order, text, completed) and color. `updated_at` is excluded because
    /// the store restamps it on every commit.
    pub fn content_eq(&self, other: &Card) -> bool {
        self.title == other.title
            && self.background_color == other.background_color
            && self.todos == other.todos
    }

    pub fn completed_count(&self) -> usize {
        self.todos.iter().filter(|item| item.completed).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_card_has_exactly_one_blank_item() {
        let card = Card::empty(CardColor::Teal);
        assert_eq!(card.todos.len(), 1);
        assert_eq!(card.todos[0].task, "");
        assert!(!card.todos[0].completed);
        assert_eq!(card.background_color, CardColor::Teal);
        assert!(card.title.is_empty());
    }

    #[test]
    fn with_new_item_appends_blank_uncompleted_item() {
        let card = Card::empty(CardColor::White);
        let next = card.with_new_item();
        assert_eq!(next.todos.len(), card.todos.len() + 1);
        let added = next.todos.last().unwrap();
        assert_eq!(added.task, "");
        assert!(!added.completed);
        // ids stay unique across the list
        assert_ne!(added.id, next.todos[0].id);
    }

    #[test]
    fn without_item_removes_only_the_matching_item() {
        let card = Card::empty(CardColor::White).with_new_item();
        let victim = card.todos[0].id;
        let next = card.without_item(victim);
        assert_eq!(next.todos.len(), 1);
        assert!(next.todos.iter().all(|item| item.id != victim));
    }

    #[test]
    fn without_item_on_unknown_id_is_content_stable() {
        let card = Card::empty(CardColor::White);
        let next = card.without_item(Uuid::new_v4());
        assert_eq!(next.todos, card.todos);
        assert_eq!(next.updated_at, card.updated_at);
    }

    #[test]
    fn with_item_text_only_touches_the_target() {
        let card = Card::empty(CardColor::White).with_new_item();
        let target = card.todos[1].id;
        let next = card.with_item_text(target, "Eggs");
        assert_eq!(next.todos[0].task, "");
        assert_eq!(next.todos[1].task, "Eggs");
    }

    #[test]
    fn double_toggle_restores_original_flag() {
        let card = Card::empty(CardColor::White);
        let id = card.todos[0].id;
        let toggled = card.with_item_toggled(id);
        assert!(toggled.todos[0].completed);
        let restored = toggled.with_item_toggled(id);
        assert_eq!(restored.todos[0].completed, card.todos[0].completed);
    }

    #[test]
    fn move_swaps_neighbours_and_ignores_out_of_range() {
        let card = Card::empty(CardColor::White).with_new_item();
        let first = card.todos[0].id;
        let moved = card.with_item_moved(0, 1);
        assert_eq!(moved.todos[1].id, first);
        let unchanged = card.with_item_moved(0, -1);
        assert_eq!(unchanged.todos, card.todos);
        let unchanged = card.with_item_moved(5, 1);
        assert_eq!(unchanged.todos, card.todos);
    }

    #[test]
    fn unknown_color_token_degrades_to_default() {
        assert_eq!(CardColor::from_token("chartreuse"), CardColor::default());
        let json = r#"{"id":"9b2f0c1e-59e3-4ac5-b1d7-9f4c7a0e21aa","title":"Legacy","todos":[],"background_color":"mauve","updated_at":"2024-05-01T10:00:00Z"}"#;
        let card: Card = serde_json::from_str(json).unwrap();
        assert_eq!(card.background_color, CardColor::White);
    }

    #[test]
    fn content_eq_ignores_timestamp_but_not_items() {
        let card = Card::empty(CardColor::White);
        let mut restamped = card.clone();
        restamped.updated_at += time::Duration::seconds(30);
        assert!(card.content_eq(&restamped));
        let edited = card.with_item_text(card.todos[0].id, "Milk");
        assert!(!card.content_eq(&edited));
    }
}
