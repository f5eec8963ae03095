// SPDX-License-Identifier: GPL-3.0-or-later
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{IndexItem, IndexSection, PropertyValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterType {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    InLast,
    NotInLast,
    InNext,
    NotInNext,
}

impl FilterType {
    /// Negative filters must hold for every filter value, positive ones for any.
    fn is_negative(&self) -> bool {
        matches!(
            self,
            Self::NotEqual | Self::NotContains | Self::NotInLast | Self::NotInNext
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Bool(bool),
    Number(f64),
    Text(String),
    Numbers(Vec<f64>),
    Texts(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
enum Scalar<'a> {
    Bool(bool),
    Number(f64),
    Text(&'a str),
}

impl FilterValue {
    fn scalars(&self) -> Vec<Scalar<'_>> {
        match self {
            Self::Bool(b) => vec![Scalar::Bool(*b)],
            Self::Number(n) => vec![Scalar::Number(*n)],
            Self::Text(s) => vec![Scalar::Text(s)],
            Self::Numbers(ns) => ns.iter().map(|n| Scalar::Number(*n)).collect(),
            Self::Texts(ts) => ts.iter().map(|t| Scalar::Text(t)).collect(),
        }
    }
}

impl Scalar<'_> {
    fn as_text(&self) -> String {
        match self {
            Scalar::Bool(b) => b.to_string(),
            Scalar::Number(n) => format_number(*n),
            Scalar::Text(t) => t.to_string(),
        }
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            Scalar::Number(n) => Some(*n),
            Scalar::Text(t) => t.trim().parse().ok(),
            Scalar::Bool(_) => None,
        }
    }

    fn as_bool(&self) -> Option<bool> {
        match self {
            Scalar::Bool(b) => Some(*b),
            Scalar::Text(t) => t.trim().parse().ok(),
            Scalar::Number(_) => None,
        }
    }

    fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            Scalar::Text(t) => parse_filter_date(t),
            _ => None,
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

fn parse_filter_date(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ndt| DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyFilter {
    pub key: String,
    pub value: FilterValue,
    #[serde(rename = "type")]
    pub filter_type: FilterType,
}

impl PropertyFilter {
    pub fn new(key: impl Into<String>, value: FilterValue, filter_type: FilterType) -> Self {
        Self {
            key: key.into(),
            value,
            filter_type,
        }
    }

    fn equal(key: &str, value: bool) -> Self {
        Self::new(key, FilterValue::Bool(value), FilterType::Equal)
    }

    pub fn matches(&self, item: &PropertyValue, now: DateTime<Utc>) -> bool {
        let candidates = self.value.scalars();
        if self.filter_type.is_negative() {
            candidates.iter().all(|v| test(item, v, self.filter_type, now))
        } else {
            candidates.iter().any(|v| test(item, v, self.filter_type, now))
        }
    }
}

/// Predefined filter, selectable by key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub key: String,
    pub label: String,
    pub filters: Vec<PropertyFilter>,
}

/// User-defined filter saved for one index section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomFilter {
    pub id: String,
    pub section: IndexSection,
    pub label: String,
    pub filters: Vec<PropertyFilter>,
}

fn filter(key: &str, label: &str, filters: Vec<PropertyFilter>) -> Filter {
    Filter {
        key: key.to_string(),
        label: label.to_string(),
        filters,
    }
}

/// Filters every movie or scene index offers.
pub fn predefined_filters() -> Vec<Filter> {
    vec![
        filter("all", "All", Vec::new()),
        filter("monitored", "Monitored Only", vec![PropertyFilter::equal("monitored", true)]),
        filter("unmonitored", "Unmonitored Only", vec![PropertyFilter::equal("monitored", false)]),
        filter(
            "missing",
            "Missing",
            vec![
                PropertyFilter::equal("monitored", true),
                PropertyFilter::equal("hasFile", false),
            ],
        ),
        filter(
            "wanted",
            "Wanted",
            vec![
                PropertyFilter::equal("monitored", true),
                PropertyFilter::equal("hasFile", false),
                PropertyFilter::equal("isAvailable", true),
            ],
        ),
        filter(
            "cutoffunmet",
            "Cut-off Unmet",
            vec![
                PropertyFilter::equal("hasFile", true),
                PropertyFilter::equal("qualityCutoffNotMet", true),
            ],
        ),
    ]
}

pub fn studio_filters() -> Vec<Filter> {
    predefined_filters()
        .into_iter()
        .filter(|f| matches!(f.key.as_str(), "all" | "monitored" | "unmonitored"))
        .collect()
}

pub fn apply_filters<T: IndexItem>(items: Vec<T>, filters: &[PropertyFilter]) -> Vec<T> {
    apply_filters_at(items, filters, Utc::now())
}

/// Keep the items that pass every filter.
pub fn apply_filters_at<T: IndexItem>(
    items: Vec<T>,
    filters: &[PropertyFilter],
    now: DateTime<Utc>,
) -> Vec<T> {
    if filters.is_empty() {
        return items;
    }
    items
        .into_iter()
        .filter(|item| {
            filters
                .iter()
                .all(|f| f.matches(&item.property(&f.key), now))
        })
        .collect()
}

fn test(item: &PropertyValue, value: &Scalar<'_>, filter_type: FilterType, now: DateTime<Utc>) -> bool {
    use FilterType::*;

    match filter_type {
        Equal => equal(item, value),
        NotEqual => !equal(item, value),
        Contains => contains(item, value),
        NotContains => !contains(item, value),
        StartsWith => text_test(item, value, |s, v| s.starts_with(v)),
        EndsWith => text_test(item, value, |s, v| s.ends_with(v)),
        LessThan => compare(item, value).map_or(false, |o| o.is_lt()),
        LessThanOrEqual => compare(item, value).map_or(false, |o| o.is_le()),
        GreaterThan => compare(item, value).map_or(false, |o| o.is_gt()),
        GreaterThanOrEqual => compare(item, value).map_or(false, |o| o.is_ge()),
        InLast => within(item, value, now, true).unwrap_or(false),
        NotInLast => within(item, value, now, true).map_or(false, |inside| !inside),
        InNext => within(item, value, now, false).unwrap_or(false),
        NotInNext => within(item, value, now, false).map_or(false, |inside| !inside),
    }
}

fn equal(item: &PropertyValue, value: &Scalar<'_>) -> bool {
    match item {
        PropertyValue::Missing => false,
        PropertyValue::Bool(b) => value.as_bool() == Some(*b),
        PropertyValue::Number(n) => value.as_number().map_or(false, |v| (v - n).abs() < f64::EPSILON),
        PropertyValue::Text(s) => s.eq_ignore_ascii_case(&value.as_text()),
        PropertyValue::Date(d) => value.as_date().map_or(false, |v| v.date_naive() == d.date_naive()),
        PropertyValue::List(xs) => {
            let v = value.as_text();
            xs.iter().any(|x| x.eq_ignore_ascii_case(&v))
        }
    }
}

fn contains(item: &PropertyValue, value: &Scalar<'_>) -> bool {
    match item {
        PropertyValue::List(xs) => {
            let v = value.as_text();
            xs.iter().any(|x| x.eq_ignore_ascii_case(&v))
        }
        _ => text_test(item, value, |s, v| s.contains(v)),
    }
}

fn text_test(item: &PropertyValue, value: &Scalar<'_>, f: impl Fn(&str, &str) -> bool) -> bool {
    match item {
        PropertyValue::Text(s) => f(&s.to_lowercase(), &value.as_text().to_lowercase()),
        _ => false,
    }
}

fn compare(item: &PropertyValue, value: &Scalar<'_>) -> Option<std::cmp::Ordering> {
    match item {
        PropertyValue::Number(n) => n.partial_cmp(&value.as_number()?),
        PropertyValue::Date(d) => Some(d.cmp(&value.as_date()?)),
        _ => None,
    }
}

/// `None` when the item has no date or the value is not a day count.
fn within(item: &PropertyValue, value: &Scalar<'_>, now: DateTime<Utc>, past: bool) -> Option<bool> {
    let PropertyValue::Date(date) = item else {
        return None;
    };
    let days = value.as_number()?;
    // Spans past chrono's range leave that side of the window open.
    let span = Duration::try_seconds((days * 86_400.0) as i64);
    Some(if past {
        let start = span.and_then(|span| now.checked_sub_signed(span));
        start.map_or(true, |start| *date >= start) && *date <= now
    } else {
        let end = span.and_then(|span| now.checked_add_signed(span));
        *date >= now && end.map_or(true, |end| *date <= end)
    })
}

impl IndexSection {
    pub fn filters(&self) -> Vec<Filter> {
        match self {
            Self::Studios => studio_filters(),
            Self::MovieIndex | Self::SceneIndex => predefined_filters(),
        }
    }
}
