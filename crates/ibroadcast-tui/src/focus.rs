//! FocusRing: keyboard focus cycling between panes.

use crate::action::ComponentId;

pub struct FocusRing {
    items: Vec<ComponentId>,
    current: usize,
}

impl FocusRing {
    pub fn new(items: Vec<ComponentId>) -> Self {
        Self { items, current: 0 }
    }

    pub fn current(&self) -> Option<ComponentId> {
        self.items.get(self.current).copied()
    }

    pub fn next(&mut self) -> Option<ComponentId> {
        if self.items.is_empty() {
            return None;
        }
        self.current = (self.current + 1) % self.items.len();
        self.current()
    }

    pub fn prev(&mut self) -> Option<ComponentId> {
        if self.items.is_empty() {
            return None;
        }
        self.current = self.current.checked_sub(1).unwrap_or(self.items.len() - 1);
        self.current()
    }

    pub fn set(&mut self, id: ComponentId) {
        if let Some(pos) = self.items.iter().position(|&x| x == id) {
            self.current = pos;
        }
    }

    pub fn is_focused(&self, id: ComponentId) -> bool {
        self.current() == Some(id)
    }

    /// Replace the ring, keeping the focused pane when it is still present.
    pub fn set_items(&mut self, items: Vec<ComponentId>) {
        let old = self.current();
        self.items = items;
        self.current = old
            .and_then(|id| self.items.iter().position(|&x| x == id))
            .unwrap_or(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycles_both_ways() {
        let mut ring = FocusRing::new(vec![ComponentId::Sidebar, ComponentId::LibraryTable]);
        assert_eq!(ring.current(), Some(ComponentId::Sidebar));
        assert_eq!(ring.next(), Some(ComponentId::LibraryTable));
        assert_eq!(ring.next(), Some(ComponentId::Sidebar));
        assert_eq!(ring.prev(), Some(ComponentId::LibraryTable));
    }

    #[test]
    fn set_items_keeps_focus_when_possible() {
        let mut ring = FocusRing::new(vec![ComponentId::Sidebar, ComponentId::LibraryTable]);
        ring.set(ComponentId::LibraryTable);
        ring.set_items(vec![
            ComponentId::Sidebar,
            ComponentId::SearchPanel,
            ComponentId::LibraryTable,
        ]);
        assert!(ring.is_focused(ComponentId::LibraryTable));
        ring.set_items(vec![ComponentId::Sidebar]);
        assert!(ring.is_focused(ComponentId::Sidebar));
    }

    #[test]
    fn empty_ring_has_no_focus() {
        let mut ring = FocusRing::new(Vec::new());
        assert_eq!(ring.next(), None);
        assert_eq!(ring.prev(), None);
    }
}
