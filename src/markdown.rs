//! Markdown helpers used to prepare text for tagging.

use indexmap::IndexMap;
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Replace every `[label](target)` with its bare `target`, so a link's label
/// is never tagged against its own URL.
pub fn strip_hyperlink_names(markdown: &str) -> String {
    static HYPERLINK_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"\[[^\[\]]*\]\((?<target>.*?)\)").unwrap());

    HYPERLINK_RE.replace_all(markdown, "$target").into_owned()
}

/// A titled sub-list inside a submission record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NestedListItem {
    pub title: String,
    #[serde(default)]
    pub is_ordered: bool,
    #[serde(default)]
    pub items: Vec<ListItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ListItem {
    Text(String),
    Nested(NestedListItem),
}

/// One named section of a submission: free text or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SubmissionRecord {
    Text(String),
    List(Vec<ListItem>),
}

/// Named records in the order the submission lists them.
pub type SubmissionRecords = IndexMap<String, SubmissionRecord>;

fn list_lines(items: &[ListItem], ordered: bool, indent_level: usize, lines: &mut Vec<String>) {
    let indent = "  ".repeat(indent_level);
    for (index, item) in items.iter().enumerate() {
        let bullet = match ordered {
            true => format!("{}.", index + 1),
            false => "-".to_string(),
        };
        match item {
            ListItem::Text(text) => lines.push(format!("{indent}{bullet} {text}")),
            ListItem::Nested(nested) => {
                lines.push(format!("{indent}{bullet} {}", nested.title));
                let children = nested_list_to_markdown(nested, indent_level + 1);
                if !children.is_empty() {
                    lines.push(children);
                }
            }
        }
    }
}

/// Render a nested list's items, two spaces of indent per level.
pub fn nested_list_to_markdown(list: &NestedListItem, indent_level: usize) -> String {
    let mut lines = Vec::new();
    list_lines(&list.items, list.is_ordered, indent_level, &mut lines);
    lines.join("\n").trim_end().to_string()
}

pub fn submission_record_to_markdown(record: &SubmissionRecord, ordered: bool) -> String {
    match record {
        SubmissionRecord::Text(text) => text.trim().to_string(),
        SubmissionRecord::List(items) => {
            let mut lines = Vec::new();
            list_lines(items, ordered, 0, &mut lines);
            lines.join("\n").trim().to_string()
        }
    }
}

/// The text of every record, one after the other, without section headings.
pub fn records_to_raw_text_no_headers(records: &SubmissionRecords) -> String {
    records
        .values()
        .map(|record| submission_record_to_markdown(record, false))
        .join("\n")
}
