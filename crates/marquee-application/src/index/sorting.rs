// SPDX-License-Identifier: GPL-3.0-or-later
use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{IndexItem, PropertyValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn flip(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ascending" | "asc" => Some(Self::Ascending),
            "descending" | "desc" => Some(Self::Descending),
            _ => None,
        }
    }

    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Ascending => ordering,
            Self::Descending => ordering.reverse(),
        }
    }
}

impl Default for SortDirection {
    fn default() -> Self {
        Self::Ascending
    }
}

fn rank(value: &PropertyValue) -> u8 {
    match value {
        PropertyValue::Missing => 0,
        PropertyValue::Bool(_) => 1,
        PropertyValue::Number(_) => 2,
        PropertyValue::Date(_) => 3,
        PropertyValue::Text(_) => 4,
        PropertyValue::List(_) => 5,
    }
}

/// Total order over property values. Missing values come first.
pub fn compare_values(a: &PropertyValue, b: &PropertyValue) -> Ordering {
    match (a, b) {
        (PropertyValue::Bool(x), PropertyValue::Bool(y)) => x.cmp(y),
        (PropertyValue::Number(x), PropertyValue::Number(y)) => {
            x.partial_cmp(y).unwrap_or(Ordering::Equal)
        }
        (PropertyValue::Date(x), PropertyValue::Date(y)) => x.cmp(y),
        (PropertyValue::Text(x), PropertyValue::Text(y)) => x.to_lowercase().cmp(&y.to_lowercase()),
        (PropertyValue::List(x), PropertyValue::List(y)) => {
            x.join(",").to_lowercase().cmp(&y.join(",").to_lowercase())
        }
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Stable sort by `sort_key`, ties broken by `secondary_key`.
pub fn sort_items<T: IndexItem>(
    items: &mut [T],
    sort_key: &str,
    direction: SortDirection,
    secondary_key: &str,
    secondary_direction: SortDirection,
) {
    let use_secondary = !secondary_key.is_empty() && secondary_key != sort_key;
    items.sort_by(|a, b| {
        let primary = direction.apply(compare_values(
            &a.sort_value(sort_key),
            &b.sort_value(sort_key),
        ));
        if primary != Ordering::Equal || !use_secondary {
            return primary;
        }
        secondary_direction.apply(compare_values(
            &a.sort_value(secondary_key),
            &b.sort_value(secondary_key),
        ))
    });
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOption {
    pub id: String,
    pub name: String,
}

/// Distinct `{id, name}` choices for a filter builder property, sorted by name.
pub fn filter_options<T: IndexItem>(items: &[T], prop: &str) -> Vec<FilterOption> {
    let mut names: BTreeMap<String, String> = BTreeMap::new();
    for item in items {
        let values = match item.property(prop) {
            PropertyValue::Text(s) => vec![s],
            PropertyValue::List(xs) => xs,
            _ => Vec::new(),
        };
        for value in values.into_iter().filter(|v| !v.trim().is_empty()) {
            names.entry(value.to_lowercase()).or_insert(value);
        }
    }
    names
        .into_values()
        .map(|name| FilterOption {
            id: name.clone(),
            name,
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JumpBar {
    pub order: Vec<String>,
    pub characters: BTreeMap<String, usize>,
}

/// First characters of the sort titles with their counts; digits collapse to `#`.
/// Only meaningful when sorting by `sortTitle`.
pub fn jump_bar<T: IndexItem>(items: &[T], sort_key: &str, direction: SortDirection) -> JumpBar {
    if sort_key != "sortTitle" {
        return JumpBar::default();
    }

    let mut characters: BTreeMap<String, usize> = BTreeMap::new();
    for item in items {
        let PropertyValue::Text(title) = item.property("sortTitle") else {
            continue;
        };
        let Some(first) = title.chars().next() else {
            continue;
        };
        let key = if first.is_ascii_digit() {
            "#".to_string()
        } else {
            first.to_string()
        };
        *characters.entry(key).or_insert(0) += 1;
    }

    let mut order: Vec<String> = characters.keys().cloned().collect();
    if direction == SortDirection::Descending {
        order.reverse();
    }
    JumpBar { order, characters }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct Row {
        title: &'static str,
        year: Option<f64>,
        studio: Option<&'static str>,
    }

    impl IndexItem for Row {
        fn property(&self, key: &str) -> PropertyValue {
            match key {
                "sortTitle" => PropertyValue::Text(self.title.to_string()),
                "year" => self.year.map_or(PropertyValue::Missing, PropertyValue::Number),
                "studio" => self
                    .studio
                    .map_or(PropertyValue::Missing, |s| PropertyValue::Text(s.to_string())),
                _ => PropertyValue::Missing,
            }
        }

        fn sort_value(&self, key: &str) -> PropertyValue {
            match key {
                "studio" => PropertyValue::Text(self.studio.unwrap_or("").to_lowercase()),
                _ => self.property(key),
            }
        }
    }

    fn rows() -> Vec<Row> {
        vec![
            Row { title: "heat", year: Some(1995.0), studio: Some("Warner") },
            Row { title: "alien", year: Some(1979.0), studio: None },
            Row { title: "12 monkeys", year: None, studio: Some("universal") },
            Row { title: "aliens", year: Some(1986.0), studio: Some("Fox") },
        ]
    }

    fn titles(rows: &[Row]) -> Vec<&'static str> {
        rows.iter().map(|r| r.title).collect()
    }

    #[test]
    fn missing_values_sort_first_ascending() {
        let mut items = rows();
        sort_items(&mut items, "year", SortDirection::Ascending, "sortTitle", SortDirection::Ascending);
        assert_eq!(titles(&items), vec!["12 monkeys", "alien", "aliens", "heat"]);

        sort_items(&mut items, "year", SortDirection::Descending, "sortTitle", SortDirection::Ascending);
        assert_eq!(titles(&items), vec!["heat", "aliens", "alien", "12 monkeys"]);
    }

    #[test]
    fn secondary_key_breaks_ties() {
        let mut items = rows();
        items.push(Row { title: "blade runner", year: Some(1979.0), studio: Some("Warner") });
        sort_items(&mut items, "studio", SortDirection::Ascending, "sortTitle", SortDirection::Descending);
        assert_eq!(
            titles(&items),
            vec!["alien", "aliens", "12 monkeys", "heat", "blade runner"]
        );
    }

    #[test]
    fn jump_bar_groups_digits_and_respects_direction() {
        let items = rows();
        let bar = jump_bar(&items, "sortTitle", SortDirection::Ascending);
        assert_eq!(bar.order, vec!["#", "a", "h"]);
        assert_eq!(bar.characters["a"], 2);

        let bar = jump_bar(&items, "sortTitle", SortDirection::Descending);
        assert_eq!(bar.order, vec!["h", "a", "#"]);

        assert!(jump_bar(&items, "year", SortDirection::Ascending).order.is_empty());
    }

    #[test]
    fn filter_options_are_distinct_and_sorted() {
        let mut items = rows();
        items.push(Row { title: "x", year: None, studio: Some("fox") });
        let options = filter_options(&items, "studio");
        let names: Vec<_> = options.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["Fox", "universal", "Warner"]);
    }

    #[test]
    fn sort_direction_parse_and_flip() {
        assert_eq!(SortDirection::parse("DESC"), Some(SortDirection::Descending));
        assert_eq!(SortDirection::Ascending.flip(), SortDirection::Descending);
        assert_eq!(SortDirection::parse("sideways"), None);
    }
}
