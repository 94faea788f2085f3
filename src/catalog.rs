//! Prompt catalog: the markdown document listing every generatable item.
//!
//! Each entry looks like this in the document:
//!
//! ````text
//! ### Iron Dagger
//! **ID:** `iron_dagger`
//! **Category:** weapons
//!
//! ```
//! A short iron dagger, pixel art, transparent background
//! ```
//! ````
//!
//! Anything that does not match that shape is skipped without complaint.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;

use crate::error_codes::CodedError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptEntry {
    pub name: String,
    pub id: String,
    pub category: String,
    pub prompt: String,
}

/// All catalog entries keyed by id. Parsed fresh on every invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    entries: BTreeMap<String, PromptEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogListing<'a> {
    pub total: usize,
    pub categories: BTreeMap<&'a str, Vec<&'a PromptEntry>>,
}

fn entry_regex() -> &'static Regex {
    static ENTRY_RE: OnceLock<Regex> = OnceLock::new();
    ENTRY_RE.get_or_init(|| {
        Regex::new(
            r#"### ([^\n]+)\n\*\*ID:\*\* `([^`\n]+)`[ \t]*\n\*\*Category:\*\* ([^\n]+)\n\n```[^\n]*\n(?s:(.*?))```"#,
        )
        .expect("catalog entry regex should compile")
    })
}

pub fn load_catalog(path: &Path) -> Result<Catalog> {
    if !path.is_file() {
        return Err(CodedError::missing_catalog_file(path).into());
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read prompts file {}", path.display()))?;
    let catalog = parse_catalog(&contents);
    tracing::debug!(
        path = %path.display(),
        entries = catalog.len(),
        "parsed prompt catalog"
    );
    Ok(catalog)
}

pub fn parse_catalog(contents: &str) -> Catalog {
    let normalized = contents.replace("\r\n", "\n");
    let mut entries = BTreeMap::new();

    for captures in entry_regex().captures_iter(&normalized) {
        let entry = PromptEntry {
            name: captures[1].trim().to_owned(),
            id: captures[2].trim().to_owned(),
            category: captures[3].trim().to_owned(),
            prompt: captures[4].trim().to_owned(),
        };
        if entry.id.is_empty() {
            continue;
        }
        // Later duplicates replace earlier ones.
        entries.insert(entry.id.clone(), entry);
    }

    Catalog { entries }
}

impl Catalog {
    pub fn get(&self, id: &str) -> Option<&PromptEntry> {
        self.entries.get(id)
    }

    /// Looks up an id, failing with `UnknownId` when absent.
    pub fn require(&self, id: &str) -> Result<&PromptEntry> {
        self.get(id)
            .ok_or_else(|| CodedError::unknown_id(id).into())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Groups entries by category, ordered by category then id.
    pub fn listing(&self, category_filter: Option<&str>) -> CatalogListing<'_> {
        let mut categories: BTreeMap<&str, Vec<&PromptEntry>> = BTreeMap::new();
        for entry in self.entries.values() {
            if category_filter.is_some_and(|filter| filter != entry.category) {
                continue;
            }
            categories
                .entry(entry.category.as_str())
                .or_default()
                .push(entry);
        }
        for items in categories.values_mut() {
            items.sort_by(|a, b| a.id.cmp(&b.id));
        }

        CatalogListing {
            total: self.entries.len(),
            categories,
        }
    }
}

pub fn render_listing(listing: &CatalogListing<'_>) -> String {
    let mut out = format!("\nAvailable prompts ({} total):\n\n", listing.total);
    for (category, items) in &listing.categories {
        out.push_str(&format!(
            "## {} ({})\n",
            category.to_uppercase(),
            items.len()
        ));
        for item in items {
            out.push_str(&format!("  {}: {}\n", item.id, item.name));
        }
        out.push('\n');
    }
    out
}

/// Renders one entry back into the catalog's own markdown shape.
pub fn render_entry(entry: &PromptEntry) -> String {
    format!(
        "\n### {}\n**ID:** `{}`\n**Category:** {}\n\n```\n{}\n```\n",
        entry.name, entry.id, entry.category, entry.prompt
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_codes::{find_coded_error, CodedErrorKind};
    use tempfile::tempdir;

    const SAMPLE: &str = "# Image prompts\n\n\
### Iron Dagger\n**ID:** `iron_dagger`\n**Category:** weapons\n\n```\nA short iron dagger\n```\n\n\
### Oak Shield\n**ID:** `oak_shield`\n**Category:** shields\n\n```\n  A round oak shield  \n```\n\n\
### Bronze Sword\n**ID:** `bronze_sword`\n**Category:** weapons\n\n```\nA bronze sword\nwith a leather grip\n```\n";

    #[test]
    fn parses_well_formed_entries() {
        let catalog = parse_catalog(SAMPLE);
        assert_eq!(catalog.len(), 3);

        let dagger = catalog.get("iron_dagger").expect("dagger should parse");
        assert_eq!(dagger.name, "Iron Dagger");
        assert_eq!(dagger.category, "weapons");
        assert_eq!(dagger.prompt, "A short iron dagger");

        let shield = catalog.get("oak_shield").expect("shield should parse");
        assert_eq!(shield.prompt, "A round oak shield");

        let sword = catalog.get("bronze_sword").expect("sword should parse");
        assert_eq!(sword.prompt, "A bronze sword\nwith a leather grip");
    }

    #[test]
    fn parsing_is_idempotent() {
        assert_eq!(parse_catalog(SAMPLE), parse_catalog(SAMPLE));
    }

    #[test]
    fn duplicate_ids_keep_the_last_entry() {
        let doc = "### First\n**ID:** `dup`\n**Category:** items\n\n```\nfirst\n```\n\n\
### Second\n**ID:** `dup`\n**Category:** potions\n\n```\nsecond\n```\n";
        let catalog = parse_catalog(doc);
        assert_eq!(catalog.len(), 1);
        let entry = catalog.get("dup").expect("dup should exist");
        assert_eq!(entry.name, "Second");
        assert_eq!(entry.prompt, "second");
    }

    #[test]
    fn malformed_entries_are_skipped() {
        let doc = "### Missing category\n**ID:** `nope`\n\n```\nbody\n```\n\n\
#### Too deep\n**ID:** `deep`\n**Category:** items\n\n```\nbody\n```\n\n\
### Good\n**ID:** `good`\n**Category:** items\n\n```\nbody\n```\n";
        let catalog = parse_catalog(doc);
        assert_eq!(catalog.len(), 2);
        assert!(catalog.get("good").is_some());
        assert!(catalog.get("nope").is_none());
        // Deeper headings still contain a `### ` marker and are accepted.
        let deep = catalog.get("deep").expect("deep heading should parse");
        assert_eq!(deep.name, "Too deep");
    }

    #[test]
    fn windows_line_endings_parse() {
        let doc = SAMPLE.replace('\n', "\r\n");
        assert_eq!(parse_catalog(&doc), parse_catalog(SAMPLE));
    }

    #[test]
    fn listing_filters_and_sorts() {
        let catalog = parse_catalog(SAMPLE);
        let listing = catalog.listing(Some("weapons"));
        assert_eq!(listing.total, 3);
        assert_eq!(listing.categories.len(), 1);
        let ids: Vec<&str> = listing.categories["weapons"]
            .iter()
            .map(|entry| entry.id.as_str())
            .collect();
        assert_eq!(ids, vec!["bronze_sword", "iron_dagger"]);

        let rendered = render_listing(&listing);
        assert!(rendered.contains("Available prompts (3 total):"));
        assert!(rendered.contains("## WEAPONS (2)"));
        assert!(rendered.contains("  bronze_sword: Bronze Sword"));
        assert!(!rendered.contains("oak_shield"));
    }

    #[test]
    fn listing_orders_categories_by_name() {
        let catalog = parse_catalog(SAMPLE);
        let listing = catalog.listing(None);
        let categories: Vec<&str> = listing.categories.keys().copied().collect();
        assert_eq!(categories, vec!["shields", "weapons"]);
    }

    #[test]
    fn rendered_entry_round_trips_through_parser() {
        let catalog = parse_catalog(SAMPLE);
        let sword = catalog.get("bronze_sword").expect("sword should parse");
        let reparsed = parse_catalog(&render_entry(sword));
        assert_eq!(reparsed.get("bronze_sword"), Some(sword));
    }

    #[test]
    fn missing_catalog_file_is_coded() {
        let dir = tempdir().expect("tempdir should create");
        let error = load_catalog(&dir.path().join("image_prompts.md")).expect_err("should fail");
        let coded = find_coded_error(&error).expect("coded error");
        assert_eq!(coded.kind, CodedErrorKind::MissingCatalogFile);
    }

    #[test]
    fn require_reports_unknown_id() {
        let catalog = parse_catalog(SAMPLE);
        let error = catalog.require("mithril_axe").expect_err("should fail");
        let coded = find_coded_error(&error).expect("coded error");
        assert_eq!(coded.kind, CodedErrorKind::UnknownId);
    }
}
