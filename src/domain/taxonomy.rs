//! Structural Sort
//!
//! Orders `/`-separated token names by a fixed taxonomy: category, then the
//! category's subcategory, then size, then interaction state, then name.

use std::cmp::Ordering;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Rank of a segment that is absent from its ordering table.
pub const ABSENT: i32 = -1;
/// Subcategory rank when the category is unknown or has no subcategory table.
pub const UNRANKED_SUBCATEGORY: i32 = 99;

const CATEGORIES: &[&str] = &["color", "layout", "typography", "borders", "box-shadow", "opacity", "icon"];

const SUBCATEGORIES: &[(&str, &[&str])] = &[
    ("color", &["bg", "content", "icon", "text", "border", "trigger"]),
    (
        "layout",
        &[
            "inner-box", "outer-box", "text-box", "content-box", "icon-box", "icon-wrapper",
            "left", "right", "top", "bottom", "horizontal", "vertical", "gap",
            "width", "height", "sizing", "max-height", "min-height", "max-width", "min-width",
        ],
    ),
    ("typography", &["font-family", "font-size", "font-weight", "line-height", "letter-spacing"]),
    ("borders", &["border-radius", "border-width"]),
    ("icon", &["set", "size"]),
];

const STATES: &[&str] = &["rest", "hovered", "active", "selected", "read-only", "disabled", "focused"];
const SIZES: &[&str] = &["small", "medium", "large"];

/// Ordering tables. Configurable; the default is the design-system taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Taxonomy {
    pub categories: Vec<String>,
    pub subcategories: IndexMap<String, Vec<String>>,
    pub states: Vec<String>,
    pub sizes: Vec<String>,
}

impl Default for Taxonomy {
    fn default() -> Self {
        fn owned(items: &[&str]) -> Vec<String> {
            items.iter().map(|s| s.to_string()).collect()
        }
        Self {
            categories: owned(CATEGORIES),
            subcategories: SUBCATEGORIES
                .iter()
                .map(|(category, subs)| (category.to_string(), owned(subs)))
                .collect(),
            states: owned(STATES),
            sizes: owned(SIZES),
        }
    }
}

/// Composite key; compares ranks numerically, then names locale-style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub category: i32,
    pub subcategory: i32,
    pub size: i32,
    pub state: i32,
    pub name: String,
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.category, self.subcategory, self.size, self.state)
            .cmp(&(other.category, other.subcategory, other.size, other.state))
            .then_with(|| locale_cmp(&self.name, &other.name))
    }
}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Taxonomy {
    pub fn sort_key(&self, name: &str) -> SortKey {
        let parts: Vec<&str> = name.split('/').collect();

        // Category: first path segment that names a known category.
        let category = parts
            .iter()
            .find_map(|part| self.categories.iter().position(|c| c == part));

        let subcategory = match category.and_then(|idx| self.subcategories.get(&self.categories[idx])) {
            Some(table) => first_listed(table, &parts),
            None => UNRANKED_SUBCATEGORY,
        };

        SortKey {
            // Unknown categories go after every known one.
            category: category.map_or(self.categories.len() as i32, |idx| idx as i32),
            subcategory,
            size: first_listed(&self.sizes, &parts),
            state: first_listed(&self.states, &parts),
            name: name.to_string(),
        }
    }

    /// New ordering of `names`; the input is left untouched.
    pub fn sort<S: AsRef<str>>(&self, names: &[S]) -> Vec<String> {
        let mut keyed: Vec<SortKey> = names.iter().map(|n| self.sort_key(n.as_ref())).collect();
        keyed.sort();
        keyed.into_iter().map(|key| key.name).collect()
    }
}

/// Structural sort with the default taxonomy.
pub fn structural_sort<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    Taxonomy::default().sort(names)
}

/// Rank of the first table entry present among `parts`, in table order.
fn first_listed(table: &[String], parts: &[&str]) -> i32 {
    table
        .iter()
        .position(|entry| parts.contains(&entry.as_str()))
        .map_or(ABSENT, |idx| idx as i32)
}

/// Collation-style comparison: punctuation and whitespace before digits,
/// digits before letters, letters case-insensitively. On a tie lowercase
/// sorts before uppercase.
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    fn weights(s: &str) -> impl Iterator<Item = (CharClass, char)> + '_ {
        s.chars()
            .flat_map(char::to_lowercase)
            .map(|c| (CharClass::of(c), c))
    }

    weights(a).cmp(weights(b)).then_with(|| b.cmp(a))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum CharClass {
    Symbol,
    Digit,
    Letter,
}

impl CharClass {
    fn of(c: char) -> Self {
        if c.is_numeric() {
            CharClass::Digit
        } else if c.is_alphabetic() {
            CharClass::Letter
        } else {
            CharClass::Symbol
        }
    }
}
