//! Content normalization for catalog items
//!
//! Builds the canonical text an item is embedded under, plus the content
//! hash used for change detection. Pure functions; the hash is computed over
//! the final joined text so any upstream field change re-marks the item.

use crate::catalog::Item;

/// Normalized content for one item: the exact text to embed and its hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedContent {
    pub text: String,
    pub hash: String,
}

/// Build the canonical text and blake3 hash for an item.
///
/// Concatenation order is fixed: name, markup-stripped description,
/// manufacturer, category names, then property name + group per property.
/// Empty parts are dropped; an item whose every field is empty still gets a
/// non-empty placeholder so the provider never sees an empty string.
pub fn normalize(item: &Item) -> NormalizedContent {
    let mut parts: Vec<String> = Vec::new();

    push_part(&mut parts, &item.name);

    if let Some(description) = &item.description {
        push_part(&mut parts, &strip_markup(description));
    }

    if let Some(manufacturer) = &item.manufacturer {
        push_part(&mut parts, manufacturer);
    }

    for category in &item.categories {
        push_part(&mut parts, category);
    }

    for property in &item.properties {
        push_part(&mut parts, &property.name);
        if let Some(group) = &property.group {
            push_part(&mut parts, group);
        }
    }

    let mut text = parts.join(" ");
    if text.is_empty() {
        // Placeholder keeps every item embeddable
        text = format!("item {}", item.id);
    }

    let hash = blake3::hash(text.as_bytes()).to_hex().to_string();

    NormalizedContent { text, hash }
}

fn push_part(parts: &mut Vec<String>, value: &str) {
    let trimmed = value.trim();
    if !trimmed.is_empty() {
        parts.push(trimmed.to_string());
    }
}

fn markup_regex() -> &'static regex::Regex {
    static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"<[^>]*>").expect("valid markup regex"))
}

/// Strip HTML-style markup from a description and collapse whitespace
fn strip_markup(input: &str) -> String {
    // Tags become separators so "<p>a</p><p>b</p>" keeps a word boundary
    let stripped = markup_regex().replace_all(input, " ");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Item, PropertyValue};

    fn item(name: &str) -> Item {
        Item {
            id: "a1".to_string(),
            version_id: "v1".to_string(),
            name: name.to_string(),
            description: None,
            manufacturer: None,
            categories: Vec::new(),
            properties: Vec::new(),
        }
    }

    #[test]
    fn joins_parts_in_fixed_order() {
        let mut it = item("Red Running Shoe");
        it.description = Some("<p>Lightweight  mesh</p>".to_string());
        it.manufacturer = Some("Acme".to_string());
        it.categories = vec!["Shoes".to_string(), "Sport".to_string()];
        it.properties = vec![PropertyValue {
            name: "Red".to_string(),
            group: Some("Color".to_string()),
        }];

        let content = normalize(&it);
        assert_eq!(
            content.text,
            "Red Running Shoe Lightweight mesh Acme Shoes Sport Red Color"
        );
    }

    #[test]
    fn drops_empty_and_whitespace_parts() {
        let mut it = item("  Widget  ");
        it.manufacturer = Some("   ".to_string());
        it.categories = vec!["".to_string(), "Tools".to_string()];

        let content = normalize(&it);
        assert_eq!(content.text, "Widget Tools");
    }

    #[test]
    fn empty_item_gets_placeholder() {
        let it = item("   ");
        let content = normalize(&it);
        assert_eq!(content.text, "item a1");
        assert!(!content.hash.is_empty());
    }

    #[test]
    fn strips_markup_from_description() {
        assert_eq!(
            strip_markup("<div class=\"x\">Hello <b>world</b></div>"),
            "Hello world"
        );
    }

    #[test]
    fn hash_changes_when_any_field_changes() {
        let base = normalize(&item("Widget"));

        let mut changed = item("Widget");
        changed.categories = vec!["Tools".to_string()];
        let with_category = normalize(&changed);

        assert_ne!(base.hash, with_category.hash);

        // Same text always hashes the same
        assert_eq!(base.hash, normalize(&item("Widget")).hash);
        assert_eq!(base.hash.len(), 64);
    }
}
