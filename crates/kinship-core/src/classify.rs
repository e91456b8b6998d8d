//! Reference classification
//!
//! Host reference records are untyped in practice: the `type` discriminant,
//! the alias marker, the payload and the surrounding content all carry a
//! partial signal. This module turns those signals into one of
//! [`RefClass`]'s variants and records which [`ClassRule`] decided, so the
//! precedence order can be audited and tested.
//!
//! Precedence, first match wins:
//!
//! 1. type 0/1 -> inline
//! 2. payload present (or explicit property flag) -> property value
//! 3. alias marker -> inline
//! 4. type 2 -> tag
//! 5. target already known as a tag -> inline
//! 6. target is not an alias block -> inline if the source content renders
//!    an inline reference to it, property value otherwise
//! 7. type > 2 -> property value
//! 8. nothing matched -> unknown (treated as inline by callers)

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::block::{Block, BlockId, BlockRef};

/// Reference type used for tag references
pub const TAG_REF_TYPE: i64 = 2;

static PROPERTY_VALUE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:value|(?:attribute|attr|property|prop)[-_]value)$").unwrap()
});

const PROPERTY_VALUE_KEYWORDS: [&str; 2] = ["值", "value"];

/// What a reference is used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefClass {
    /// Rendered inline in the source block's content
    Inline,
    /// Taxonomic tag reference
    Tag,
    /// Holds an attribute value
    PropertyValue,
    /// No signal matched
    Unknown,
}

/// The rule that produced a [`Classification`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassRule {
    InlineType,
    DataPayload,
    PropertyFlag,
    AliasMarker,
    TagType,
    KnownTag,
    ContentScanHit,
    ContentScanMiss,
    PropertyType,
    Fallback,
}

/// Result of classifying one reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub class: RefClass,
    pub rule: ClassRule,
}

impl Classification {
    fn new(class: RefClass, rule: ClassRule) -> Self {
        Self { class, rule }
    }

    /// The class with the unknown fallback resolved to inline
    pub fn effective(&self) -> RefClass {
        match self.class {
            RefClass::Unknown => RefClass::Inline,
            class => class,
        }
    }
}

/// What the classifier knows besides the reference itself
#[derive(Debug, Clone, Copy)]
pub struct ClassifyContext<'a> {
    /// Block holding the reference, for the content scan
    pub source: Option<&'a Block>,
    /// Referenced block, if it was fetched
    pub target: Option<&'a Block>,
    /// Ids already known to be tags
    pub tag_ids: &'a HashSet<BlockId>,
}

/// Classify one reference
pub fn classify_reference(reference: &BlockRef, ctx: &ClassifyContext<'_>) -> Classification {
    use ClassRule::*;

    if matches!(reference.ref_type, 0 | 1) {
        return Classification::new(RefClass::Inline, InlineType);
    }
    if reference.has_data() {
        return Classification::new(RefClass::PropertyValue, DataPayload);
    }
    if reference.property_value {
        return Classification::new(RefClass::PropertyValue, PropertyFlag);
    }
    if reference.has_alias() {
        return Classification::new(RefClass::Inline, AliasMarker);
    }
    if reference.ref_type == TAG_REF_TYPE {
        return Classification::new(RefClass::Tag, TagType);
    }
    if ctx.tag_ids.contains(&reference.to) {
        return Classification::new(RefClass::Inline, KnownTag);
    }
    if let (Some(source), Some(target)) = (ctx.source, ctx.target) {
        if !target.has_aliases() {
            return if check_inline_ref_in_content(source, reference.to) {
                Classification::new(RefClass::Inline, ContentScanHit)
            } else {
                Classification::new(RefClass::PropertyValue, ContentScanMiss)
            };
        }
    }
    if reference.ref_type > TAG_REF_TYPE {
        return Classification::new(RefClass::PropertyValue, PropertyType);
    }
    Classification::new(RefClass::Unknown, Fallback)
}

fn has_property_signal(reference: &BlockRef) -> bool {
    reference.has_data() || reference.ref_type > TAG_REF_TYPE || reference.property_value
}

/// Whether any reference is inline.
///
/// Tag references and references with a property signal are excluded first;
/// any remaining reference counts as inline, whether or not it carries an
/// explicit inline signal.
pub fn is_inline_reference(refs: &[BlockRef]) -> bool {
    refs.iter()
        .filter(|r| r.ref_type != TAG_REF_TYPE)
        .any(|r| !has_property_signal(r))
}

/// Whether any reference holds a property value
pub fn is_property_value_ref(refs: &[BlockRef]) -> bool {
    refs.iter()
        .any(|r| r.has_data() || r.ref_type > 1 || r.property_value)
}

/// Whether any reference is a tag reference
pub fn is_tag_reference(refs: &[BlockRef]) -> bool {
    refs.iter().any(|r| r.ref_type == TAG_REF_TYPE)
}

/// Whether any reference is a plain type-1 inline reference
pub fn is_inline_reference_type1(refs: &[BlockRef]) -> bool {
    refs.iter().any(|r| r.ref_type == 1)
}

/// Whether `block`'s rich content renders an inline reference to `target`
pub fn check_inline_ref_in_content(block: &Block, target: BlockId) -> bool {
    block
        .content
        .iter()
        .any(|fragment| fragment.is_inline_ref() && fragment.target == Some(target))
}

/// Whether `block` looks like an alias created to hold a property value
pub fn is_property_value_alias_block(block: &Block) -> bool {
    if block
        .properties
        .iter()
        .any(|p| PROPERTY_VALUE_NAME.is_match(&p.name))
    {
        return true;
    }

    let contains_keyword = |s: &str| {
        let lower = s.to_lowercase();
        PROPERTY_VALUE_KEYWORDS.iter().any(|k| lower.contains(k))
    };
    block.text().is_some_and(contains_keyword) || block.aliases.iter().any(|a| contains_keyword(a))
}

/// Whether `block` carries a non-empty `tag`/`tags` property
pub fn is_tag_block(block: &Block) -> bool {
    block
        .properties
        .iter()
        .any(|p| (p.name == "tag" || p.name == "tags") && !p.is_empty())
}

/// Outcome of classifying every outgoing reference of a root block
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceBuckets {
    /// Targets of tag references, in first-seen order
    pub tag_ids: Vec<BlockId>,
    /// Targets referenced inline
    pub inline: Vec<BlockId>,
    /// Targets referenced as property values
    pub property: Vec<BlockId>,
    /// Per-reference decisions, in reference order
    pub decisions: Vec<(BlockId, Classification)>,
}

impl ReferenceBuckets {
    /// Tag ids as a set
    pub fn tag_set(&self) -> HashSet<BlockId> {
        self.tag_ids.iter().copied().collect()
    }
}

/// Classify every outgoing reference of `root`.
///
/// `targets` holds whichever referenced blocks could be fetched; missing
/// targets simply skip the content-scan rule. Targets of references that
/// classify as tags are folded into the tag set first, so a later plain
/// reference to a known tag is decided by rule 5. Each target lands in exactly one bucket, with tag taking
/// precedence over property value and property value over inline.
pub fn process_references(root: &Block, targets: &[Block]) -> ReferenceBuckets {
    let mut buckets = ReferenceBuckets::default();

    // The tag rule never consults the context
    let no_tags = HashSet::new();
    let bare = ClassifyContext {
        source: None,
        target: None,
        tag_ids: &no_tags,
    };
    let mut tag_set = HashSet::new();
    for reference in root.refs.iter().filter(|r| r.to != root.id) {
        let is_tag = classify_reference(reference, &bare).class == RefClass::Tag;
        if is_tag && tag_set.insert(reference.to) {
            buckets.tag_ids.push(reference.to);
        }
    }

    let mut property_set = HashSet::new();
    let mut inline_set = HashSet::new();
    let mut property_order = Vec::new();
    let mut inline_order = Vec::new();

    for reference in root.refs.iter().filter(|r| r.to != root.id) {
        let ctx = ClassifyContext {
            source: Some(root),
            target: targets.iter().find(|b| b.id == reference.to),
            tag_ids: &tag_set,
        };
        let decision = classify_reference(reference, &ctx);
        buckets.decisions.push((reference.to, decision));

        match decision.effective() {
            RefClass::Tag => {}
            RefClass::PropertyValue => {
                if property_set.insert(reference.to) {
                    property_order.push(reference.to);
                }
            }
            RefClass::Inline | RefClass::Unknown => {
                if inline_set.insert(reference.to) {
                    inline_order.push(reference.to);
                }
            }
        }
    }

    buckets.property = property_order
        .into_iter()
        .filter(|id| !tag_set.contains(id))
        .collect();
    buckets.inline = inline_order
        .into_iter()
        .filter(|id| !tag_set.contains(id) && !property_set.contains(id))
        .collect();
    buckets
}
