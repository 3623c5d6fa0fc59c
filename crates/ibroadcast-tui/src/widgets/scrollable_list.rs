//! Filterable list state with a scroll window.
//!
//! Holds items plus the indices that pass the current filter. Selection is
//! an index into the filtered set.

pub struct ScrollableList<T> {
    items: Vec<T>,
    filtered: Vec<usize>,
    selected: usize,
    scroll_offset: usize,
    filter: String,
    filter_fn: Box<dyn Fn(&T, &str) -> bool + Send + Sync>,
}

impl<T> ScrollableList<T> {
    pub fn new(filter_fn: impl Fn(&T, &str) -> bool + Send + Sync + 'static) -> Self {
        Self {
            items: Vec::new(),
            filtered: Vec::new(),
            selected: 0,
            scroll_offset: 0,
            filter: String::new(),
            filter_fn: Box::new(filter_fn),
        }
    }

    /// Replace the items and reset the selection to the top.
    pub fn set_items(&mut self, items: Vec<T>) {
        self.items = items;
        self.selected = 0;
        self.scroll_offset = 0;
        self.rebuild_filter();
    }

    /// Change the filter, keeping the selected item when it still matches.
    pub fn set_filter(&mut self, query: &str) {
        let previous = self.selected_index();
        self.filter = query.to_string();
        self.rebuild_filter();
        self.selected = previous
            .and_then(|prev| self.filtered.iter().position(|&i| i == prev))
            .unwrap_or(0);
        self.scroll_offset = 0;
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    fn rebuild_filter(&mut self) {
        self.filtered = if self.filter.is_empty() {
            (0..self.items.len()).collect()
        } else {
            self.items
                .iter()
                .enumerate()
                .filter(|(_, item)| (self.filter_fn)(item, &self.filter))
                .map(|(i, _)| i)
                .collect()
        };
        if self.selected >= self.filtered.len() {
            self.selected = self.filtered.len().saturating_sub(1);
        }
    }

    pub fn select_up(&mut self, n: usize) {
        self.selected = self.selected.saturating_sub(n);
    }

    pub fn select_down(&mut self, n: usize) {
        self.selected = (self.selected + n).min(self.filtered.len().saturating_sub(1));
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
    }

    pub fn select_last(&mut self) {
        self.selected = self.filtered.len().saturating_sub(1);
    }

    /// Select by index into the unfiltered items, if visible.
    pub fn select_index(&mut self, index: usize) {
        if let Some(pos) = self.filtered.iter().position(|&i| i == index) {
            self.selected = pos;
        }
    }

    pub fn selected_item(&self) -> Option<&T> {
        self.items.get(self.selected_index()?)
    }

    /// Index of the selection in the unfiltered items.
    pub fn selected_index(&self) -> Option<usize> {
        self.filtered.get(self.selected).copied()
    }

    /// Scroll so the selection is inside a window of `height` rows.
    pub fn ensure_visible(&mut self, height: usize) {
        if height == 0 {
            return;
        }
        if self.selected < self.scroll_offset {
            self.scroll_offset = self.selected;
        } else if self.selected >= self.scroll_offset + height {
            self.scroll_offset = self.selected + 1 - height;
        }
    }

    /// `(unfiltered index, item)` for each row of the window.
    pub fn visible_items(&self, height: usize) -> Vec<(usize, &T)> {
        let start = self.scroll_offset.min(self.filtered.len());
        let end = (start + height).min(self.filtered.len());
        self.filtered[start..end]
            .iter()
            .map(|&i| (i, &self.items[i]))
            .collect()
    }

    /// Row of the selection inside the window.
    pub fn selected_in_view(&self) -> usize {
        self.selected.saturating_sub(self.scroll_offset)
    }

    /// Select the item at `row` of the window. False when the row is empty.
    pub fn handle_click(&mut self, row: usize) -> bool {
        let target = self.scroll_offset + row;
        if target < self.filtered.len() {
            self.selected = target;
            true
        } else {
            false
        }
    }

    pub fn len(&self) -> usize {
        self.filtered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filtered.is_empty()
    }

    pub fn total_len(&self) -> usize {
        self.items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: &[&str]) -> ScrollableList<String> {
        let mut l = ScrollableList::new(|s: &String, q: &str| s.contains(q));
        l.set_items(items.iter().map(|s| s.to_string()).collect());
        l
    }

    #[test]
    fn filter_keeps_selected_item() {
        let mut l = list(&["apple", "banana", "grape", "pineapple"]);
        l.select_index(3);
        l.set_filter("apple");
        assert_eq!(l.len(), 2);
        assert_eq!(l.selected_item().map(String::as_str), Some("pineapple"));
        l.set_filter("zzz");
        assert!(l.selected_item().is_none());
        l.set_filter("");
        assert_eq!(l.len(), 4);
    }

    #[test]
    fn selection_is_clamped() {
        let mut l = list(&["a", "b", "c"]);
        l.select_down(10);
        assert_eq!(l.selected_index(), Some(2));
        l.select_up(10);
        assert_eq!(l.selected_index(), Some(0));
    }

    #[test]
    fn window_follows_selection() {
        let mut l = list(&["0", "1", "2", "3", "4", "5"]);
        l.select_last();
        l.ensure_visible(3);
        let rows: Vec<_> = l.visible_items(3).into_iter().map(|(i, _)| i).collect();
        assert_eq!(rows, vec![3, 4, 5]);
        assert_eq!(l.selected_in_view(), 2);

        l.select_first();
        l.ensure_visible(3);
        assert_eq!(l.visible_items(3)[0].0, 0);
    }

    #[test]
    fn click_selects_row_in_window() {
        let mut l = list(&["a", "b"]);
        assert!(l.handle_click(1));
        assert_eq!(l.selected_index(), Some(1));
        assert!(!l.handle_click(5));
    }

    #[test]
    fn new_items_reset_selection() {
        let mut l = list(&["a", "b", "c"]);
        l.select_last();
        l.set_items(vec!["x".to_string()]);
        assert_eq!(l.selected_index(), Some(0));
        assert!(list(&[]).visible_items(5).is_empty());
    }
}
