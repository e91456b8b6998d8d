//! Relationship categories

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::KinshipError;

/// How a related block is connected to the root block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelationshipCategory {
    Tag,
    ReferencedTag,
    PropertyRefAlias,
    PropertyRefBlock,
    ContainedIn,
    InlineRef,
    ReferencingAlias,
    ChildReferencedAlias,
    ChildReferencedTagAlias,
    ChildReferencedInline,
    BackrefAliasBlocks,
    Backref,
    RecursiveBackref,
    RecursiveBackrefAlias,
    PageDirectChildren,
    PageRecursiveChildren,
}

impl RelationshipCategory {
    /// Display and deduplication order; earlier categories win
    pub const PRECEDENCE: [RelationshipCategory; 16] = [
        RelationshipCategory::Tag,
        RelationshipCategory::ReferencedTag,
        RelationshipCategory::PropertyRefAlias,
        RelationshipCategory::PropertyRefBlock,
        RelationshipCategory::ContainedIn,
        RelationshipCategory::InlineRef,
        RelationshipCategory::PageDirectChildren,
        RelationshipCategory::PageRecursiveChildren,
        RelationshipCategory::ReferencingAlias,
        RelationshipCategory::RecursiveBackrefAlias,
        RelationshipCategory::ChildReferencedAlias,
        RelationshipCategory::ChildReferencedTagAlias,
        RelationshipCategory::ChildReferencedInline,
        RelationshipCategory::BackrefAliasBlocks,
        RelationshipCategory::Backref,
        RelationshipCategory::RecursiveBackref,
    ];

    /// Kebab-case name
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipCategory::Tag => "tag",
            RelationshipCategory::ReferencedTag => "referenced-tag",
            RelationshipCategory::PropertyRefAlias => "property-ref-alias",
            RelationshipCategory::PropertyRefBlock => "property-ref-block",
            RelationshipCategory::ContainedIn => "contained-in",
            RelationshipCategory::InlineRef => "inline-ref",
            RelationshipCategory::ReferencingAlias => "referencing-alias",
            RelationshipCategory::ChildReferencedAlias => "child-referenced-alias",
            RelationshipCategory::ChildReferencedTagAlias => "child-referenced-tag-alias",
            RelationshipCategory::ChildReferencedInline => "child-referenced-inline",
            RelationshipCategory::BackrefAliasBlocks => "backref-alias-blocks",
            RelationshipCategory::Backref => "backref",
            RelationshipCategory::RecursiveBackref => "recursive-backref",
            RelationshipCategory::RecursiveBackrefAlias => "recursive-backref-alias",
            RelationshipCategory::PageDirectChildren => "page-direct-children",
            RelationshipCategory::PageRecursiveChildren => "page-recursive-children",
        }
    }

    /// Categories whose blocks were reached through a property value
    pub fn is_property_ref(&self) -> bool {
        matches!(
            self,
            RelationshipCategory::PropertyRefAlias | RelationshipCategory::PropertyRefBlock
        )
    }

    /// Categories that may hold blocks without any text or alias
    pub fn admits_unnamed(&self) -> bool {
        self.is_property_ref()
    }
}

impl fmt::Display for RelationshipCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationshipCategory {
    type Err = KinshipError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::PRECEDENCE
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| KinshipError::UnknownCategory(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_precedence_covers_every_category_once() {
        let unique: HashSet<_> = RelationshipCategory::PRECEDENCE.iter().collect();
        assert_eq!(unique.len(), 16);
    }

    #[test]
    fn test_names_round_trip() {
        for category in RelationshipCategory::PRECEDENCE {
            let parsed: RelationshipCategory = category.as_str().parse().unwrap();
            assert_eq!(parsed, category);

            let json = serde_json::to_string(&category).unwrap();
            assert_eq!(json, format!("\"{}\"", category.as_str()));
        }
        assert!("not-a-category".parse::<RelationshipCategory>().is_err());
    }

    #[test]
    fn test_precedence_order() {
        let precedence = RelationshipCategory::PRECEDENCE;
        let position = |c: RelationshipCategory| precedence.iter().position(|p| *p == c);
        assert_eq!(position(RelationshipCategory::Tag), Some(0));
        assert!(position(RelationshipCategory::ReferencingAlias) < position(RelationshipCategory::Backref));
        assert_eq!(precedence.last(), Some(&RelationshipCategory::RecursiveBackref));
    }

    #[test]
    fn test_only_property_refs_admit_unnamed() {
        let admitting: Vec<_> = RelationshipCategory::PRECEDENCE
            .into_iter()
            .filter(RelationshipCategory::admits_unnamed)
            .collect();
        assert_eq!(
            admitting,
            vec![
                RelationshipCategory::PropertyRefAlias,
                RelationshipCategory::PropertyRefBlock
            ]
        );
    }
}
