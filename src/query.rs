use crate::models::Note;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    #[default]
    Default,
    Ascending,
    Descending,
}

// Equal titles keep newest first.
pub fn sort(mut notes: Vec<Note>, order: SortOrder) -> Vec<Note> {
    let by_title = |left: &Note, right: &Note| -> Ordering {
        left.title.to_lowercase().cmp(&right.title.to_lowercase())
    };
    match order {
        SortOrder::Default => {}
        SortOrder::Ascending => {
            notes.sort_by(|left, right| by_title(left, right).then(right.id.cmp(&left.id)))
        }
        SortOrder::Descending => {
            notes.sort_by(|left, right| by_title(right, left).then(right.id.cmp(&left.id)))
        }
    }
    notes
}

// blank query shows nothing
pub fn search(notes: &[Note], query: &str) -> Vec<Note> {
    if query.trim().is_empty() {
        return Vec::new();
    }
    notes.iter().filter(|note| note.matches(query)).cloned().collect()
}

// blank query shows everything
pub fn filter(notes: &[Note], query: &str) -> Vec<Note> {
    if query.trim().is_empty() {
        return notes.to_vec();
    }
    notes.iter().filter(|note| note.matches(query)).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::{filter, search, sort, SortOrder};
    use crate::models::Note;

    fn note(id: i64, title: &str, description: &str) -> Note {
        Note {
            id,
            ..Note::new(title, description)
        }
    }

    fn listing() -> Vec<Note> {
        vec![
            note(4, "banana", "yellow"),
            note(3, "Apple", "red fruit"),
            note(2, "cherry", "Red and small"),
            note(1, "apple", "green"),
        ]
    }

    fn ids(notes: &[Note]) -> Vec<i64> {
        notes.iter().map(|note| note.id).collect()
    }

    #[test]
    fn default_order_keeps_store_order() {
        assert_eq!(ids(&sort(listing(), SortOrder::Default)), vec![4, 3, 2, 1]);
    }

    #[test]
    fn title_orders_ignore_case_and_break_ties_newest_first() {
        assert_eq!(ids(&sort(listing(), SortOrder::Ascending)), vec![3, 1, 4, 2]);
        assert_eq!(ids(&sort(listing(), SortOrder::Descending)), vec![2, 4, 3, 1]);
    }

    #[test]
    fn blank_search_shows_nothing_but_blank_filter_shows_all() {
        assert!(search(&listing(), "   ").is_empty());
        assert_eq!(filter(&listing(), "").len(), 4);
    }

    #[test]
    fn matches_title_or_description() {
        assert_eq!(ids(&search(&listing(), "RED")), vec![3, 2]);
        assert_eq!(ids(&filter(&listing(), "apple")), vec![3, 1]);
    }

    #[test]
    fn sort_order_uses_kebab_case_names() {
        let order: SortOrder = serde_json::from_str("\"descending\"").expect("order");
        assert_eq!(order, SortOrder::Descending);
    }
}
