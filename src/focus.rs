//! Deferred keyboard-focus routing for the card editor.
//!
//! Structural edits (adding or deleting checklist rows) change which inputs
//! exist, and the input a request names may not be on screen until the next
//! frame reflects the edit. Requests are therefore queued on the router and
//! resolved by the app *after* the draw that shows the new row list;
//! `NewestItem` in particular is resolved against the row count at resolve
//! time, not at request time.

/// Which input should receive keyboard focus after a re-render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusTarget {
    /// The card title field.
    Title,
    /// The checklist row at this index.
    Item(usize),
    /// The row most recently appended.
    NewestItem,
}

/// Concrete focus position once a request has been resolved against the
/// live row list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedFocus {
    Title,
    Item(usize),
}

#[derive(Debug, Default)]
pub struct FocusRouter {
    active: bool,
    pending: Option<FocusTarget>,
    row_count: usize,
}

impl FocusRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the router for an editor session. Requests made while inactive
    /// are dropped.
    pub fn activate(&mut self, row_count: usize) {
        self.active = true;
        self.row_count = row_count;
        self.pending = None;
    }

    /// Disarms the router when the editor closes, dropping any pending
    /// request so it cannot fire against a later session.
    pub fn deactivate(&mut self) {
        self.active = false;
        self.pending = None;
        self.row_count = 0;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Queues a focus request; the last request before resolution wins.
    pub fn request(&mut self, target: FocusTarget) {
        if !self.active {
            return;
        }
        self.pending = Some(target);
    }

    /// Keeps the tracked row count in lockstep with the live checklist, so
    /// stale indices from a previously longer list can never resolve.
    pub fn sync_rows(&mut self, row_count: usize) {
        self.row_count = row_count;
    }

    /// Consumes the pending request and maps it to a concrete position using
    /// the row count as of *now*. Out-of-range indices, and `NewestItem`
    /// over an empty list, consume the request silently.
    pub fn resolve(&mut self) -> Option<ResolvedFocus> {
        let target = self.pending.take()?;
        if !self.active {
            return None;
        }
        match target {
            FocusTarget::Title => Some(ResolvedFocus::Title),
            FocusTarget::Item(index) if index < self.row_count => {
                Some(ResolvedFocus::Item(index))
            }
            FocusTarget::Item(_) => None,
            FocusTarget::NewestItem => self
                .row_count
                .checked_sub(1)
                .map(ResolvedFocus::Item),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn armed(rows: usize) -> FocusRouter {
        let mut router = FocusRouter::new();
        router.activate(rows);
        router
    }

    #[test]
    fn requests_are_dropped_while_inactive() {
        let mut router = FocusRouter::new();
        router.request(FocusTarget::Title);
        assert_eq!(router.resolve(), None);
    }

    #[test]
    fn last_request_wins() {
        let mut router = armed(3);
        router.request(FocusTarget::Item(0));
        router.request(FocusTarget::Title);
        assert_matches!(router.resolve(), Some(ResolvedFocus::Title));
        // consumed: a second resolve has nothing to do
        assert_eq!(router.resolve(), None);
    }

    #[test]
    fn newest_item_uses_the_row_count_at_resolve_time() {
        let mut router = armed(1);
        router.request(FocusTarget::NewestItem);
        // a row is appended between the request and the next frame
        router.sync_rows(2);
        assert_matches!(router.resolve(), Some(ResolvedFocus::Item(1)));
    }

    #[test]
    fn newest_item_over_empty_list_is_a_silent_no_op() {
        let mut router = armed(0);
        router.request(FocusTarget::NewestItem);
        assert_eq!(router.resolve(), None);
    }

    #[test]
    fn out_of_range_index_is_a_silent_no_op() {
        // delete the only row, then ask for index 0 again
        let mut router = armed(1);
        router.request(FocusTarget::Item(0));
        router.sync_rows(0);
        assert_eq!(router.resolve(), None);
    }

    #[test]
    fn deactivation_clears_pending_requests() {
        let mut router = armed(2);
        router.request(FocusTarget::Item(1));
        router.deactivate();
        router.activate(2);
        assert_eq!(router.resolve(), None);
    }

    #[test]
    fn in_range_index_resolves() {
        let mut router = armed(4);
        router.request(FocusTarget::Item(2));
        assert_matches!(router.resolve(), Some(ResolvedFocus::Item(2)));
    }
}
