//! Plain-text rendering of related items

use std::fmt::Write;

use kinship_core::{DisplayItem, GroupedItems, SearchHit};

fn item_line(out: &mut String, item: &DisplayItem) {
    let _ = write!(out, "  [{}] {}", item.id, item.text);
    if let Some(parent) = item.parent.as_ref().and_then(|p| p.text.as_deref()) {
        let _ = write!(out, "  ({})", parent);
    }
    if let Some(journal) = item.journal_id {
        let _ = write!(out, "  -> journal {}", journal);
    }
    out.push('\n');
}

/// One section per non-empty category, in display order
pub fn grouped_table(grouped: &GroupedItems) -> String {
    if grouped.is_empty() {
        return "No related items\n".to_string();
    }

    let mut out = String::new();
    for group in &grouped.groups {
        let _ = writeln!(out, "{} ({})", group.category, group.items.len());
        for item in &group.items {
            item_line(&mut out, item);
        }
    }
    out
}

/// One line per hit, with its matching descendants underneath
pub fn hits_table(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return "No matching items\n".to_string();
    }

    let mut out = String::new();
    for hit in hits {
        let _ = write!(out, "{:<26}", hit.item.category.as_str());
        item_line(&mut out, &hit.item);
        for descendant in &hit.matched_descendants {
            let indent = "  ".repeat(descendant.depth);
            let _ = writeln!(out, "{:<26}  {}- {}", "", indent, descendant.text);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinship_core::{BlockId, DescendantMatch, ItemGroup, ParentRef, RelationshipCategory};

    fn item(id: i64, text: &str, category: RelationshipCategory) -> DisplayItem {
        DisplayItem {
            id: BlockId(id),
            text: text.to_string(),
            aliases: vec![text.to_string()],
            is_page: true,
            parent: None,
            category,
            icon: None,
            searchable_text: text.to_lowercase(),
            descendants: Vec::new(),
            journal_id: None,
            date: None,
        }
    }

    #[test]
    fn test_grouped_table_sections() {
        let mut child = item(2, "Packing list", RelationshipCategory::PageDirectChildren);
        child.parent = Some(ParentRef {
            id: BlockId(1),
            text: Some("Trip".into()),
        });
        let grouped = GroupedItems {
            groups: vec![ItemGroup {
                category: RelationshipCategory::PageDirectChildren,
                items: vec![child.clone()],
            }],
            items: vec![child],
            ..GroupedItems::default()
        };

        assert_eq!(
            grouped_table(&grouped),
            "page-direct-children (1)\n  [2] Packing list  (Trip)\n"
        );
        assert_eq!(grouped_table(&GroupedItems::default()), "No related items\n");
    }

    #[test]
    fn test_hits_table_lists_descendants() {
        let mut trip = item(1, "Trip", RelationshipCategory::Backref);
        trip.descendants.push(DescendantMatch {
            id: BlockId(5),
            text: "Passport".into(),
            aliases: Vec::new(),
            depth: 2,
        });
        let hits = vec![SearchHit {
            matched_descendants: trip.descendants.clone(),
            item: trip,
        }];

        let table = hits_table(&hits);
        assert!(table.starts_with("backref"));
        assert!(table.contains("[1] Trip"));
        assert!(table.contains("    - Passport"));
    }
}
