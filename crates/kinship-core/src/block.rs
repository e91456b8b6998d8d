//! Block graph records as read from the host store
//!
//! These types mirror the host's block snapshots. They are owned by the host:
//! nothing in this crate mutates a block after it has been fetched.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Property holding a block's structured representation (dates, journals)
pub const PROP_REPR: &str = "_repr";

/// Property that, when truthy, hides a block from page listings
pub const PROP_HIDE: &str = "_hide";

/// Property holding a custom icon for a block
pub const PROP_ICON: &str = "_icon";

/// Opaque block identifier assigned by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(pub i64);

impl BlockId {
    /// Raw numeric value
    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for BlockId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// A block snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// Primary key
    pub id: BlockId,

    /// Plain text, if any
    #[serde(default)]
    pub text: Option<String>,

    /// Rich-content fragments making up the rendered text
    #[serde(default)]
    pub content: Vec<ContentFragment>,

    /// Alias names; a non-empty list makes this an alias (page) block
    #[serde(default)]
    pub aliases: Vec<String>,

    /// Structural parent
    #[serde(default)]
    pub parent: Option<BlockId>,

    /// Structural children, in display order
    #[serde(default)]
    pub children: Vec<BlockId>,

    /// Outgoing references
    #[serde(default)]
    pub refs: Vec<BlockRef>,

    /// Incoming references
    #[serde(default)]
    pub back_refs: Vec<BlockRef>,

    /// Named properties
    #[serde(default)]
    pub properties: Vec<BlockProperty>,
}

impl Block {
    /// Create an empty block with the given id
    pub fn new(id: impl Into<BlockId>) -> Self {
        Self {
            id: id.into(),
            text: None,
            content: Vec::new(),
            aliases: Vec::new(),
            parent: None,
            children: Vec::new(),
            refs: Vec::new(),
            back_refs: Vec::new(),
            properties: Vec::new(),
        }
    }

    /// Builder-style: set the text
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Builder-style: add an alias
    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Builder-style: set the parent
    #[must_use]
    pub fn with_parent(mut self, parent: impl Into<BlockId>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Builder-style: set the children
    #[must_use]
    pub fn with_children(mut self, children: impl IntoIterator<Item = i64>) -> Self {
        self.children = children.into_iter().map(BlockId).collect();
        self
    }

    /// Builder-style: add an outgoing reference
    #[must_use]
    pub fn with_ref(mut self, reference: BlockRef) -> Self {
        self.refs.push(reference);
        self
    }

    /// Builder-style: add an incoming reference
    #[must_use]
    pub fn with_back_ref(mut self, reference: BlockRef) -> Self {
        self.back_refs.push(reference);
        self
    }

    /// Builder-style: add a property
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: Value) -> Self {
        self.properties.push(BlockProperty::new(name, value));
        self
    }

    /// Builder-style: add a content fragment
    #[must_use]
    pub fn with_fragment(mut self, fragment: ContentFragment) -> Self {
        self.content.push(fragment);
        self
    }

    /// Whether the block carries at least one alias
    pub fn has_aliases(&self) -> bool {
        !self.aliases.is_empty()
    }

    /// Non-empty text, if any
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.trim().is_empty())
    }

    /// First non-empty alias, falling back to the text
    pub fn name(&self) -> Option<&str> {
        self.aliases
            .iter()
            .map(String::as_str)
            .find(|a| !a.is_empty())
            .or_else(|| self.text())
    }

    /// Whether the block has text or an alias to show
    pub fn has_name(&self) -> bool {
        self.name().is_some()
    }

    /// Look up a property by name
    pub fn property(&self, name: &str) -> Option<&BlockProperty> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Ids of the blocks referencing this one, in order, without duplicates
    pub fn back_ref_sources(&self) -> Vec<BlockId> {
        dedup_ids(self.back_refs.iter().map(|r| r.from))
    }

    /// Ids of the blocks this one references, in order, without duplicates
    pub fn ref_targets(&self) -> Vec<BlockId> {
        dedup_ids(self.refs.iter().map(|r| r.to))
    }
}

/// A reference record
///
/// No single field decides what kind of reference this is; see
/// [`crate::classify`] for the heuristics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockRef {
    /// Record id of the reference itself
    #[serde(default)]
    pub id: i64,

    /// Referencing block
    pub from: BlockId,

    /// Referenced block
    pub to: BlockId,

    /// Kind discriminant (0/1 inline, 2 tag, >2 property value)
    #[serde(rename = "type", default)]
    pub ref_type: i64,

    /// Alias marker set when the reference was written through an alias
    #[serde(default)]
    pub alias: Option<String>,

    /// Attribute payload carried by property references
    #[serde(default)]
    pub data: Option<Vec<BlockProperty>>,

    /// Explicit property-value flag set by some host versions
    #[serde(default)]
    pub property_value: bool,
}

impl BlockRef {
    /// Create a reference of the given type
    pub fn new(from: impl Into<BlockId>, to: impl Into<BlockId>, ref_type: i64) -> Self {
        Self {
            id: 0,
            from: from.into(),
            to: to.into(),
            ref_type,
            alias: None,
            data: None,
            property_value: false,
        }
    }

    /// Builder-style: set the alias marker
    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Builder-style: attach a property payload
    #[must_use]
    pub fn with_data(mut self, data: Vec<BlockProperty>) -> Self {
        self.data = Some(data);
        self
    }

    /// Whether the alias marker is present
    pub fn has_alias(&self) -> bool {
        self.alias.as_deref().is_some_and(|a| !a.is_empty())
    }

    /// Whether a non-empty payload is attached
    pub fn has_data(&self) -> bool {
        self.data.as_ref().is_some_and(|d| !d.is_empty())
    }
}

/// A named property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockProperty {
    /// Property name
    pub name: String,

    /// Host value type discriminant
    #[serde(rename = "type", default)]
    pub prop_type: i64,

    /// Raw value
    #[serde(default)]
    pub value: Value,
}

impl BlockProperty {
    /// Create an untyped property
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            prop_type: 0,
            value,
        }
    }

    /// Whether the value is null or an empty string/array/object
    pub fn is_empty(&self) -> bool {
        match &self.value {
            Value::Null => true,
            Value::String(s) => s.trim().is_empty(),
            Value::Array(items) => items.is_empty(),
            Value::Object(map) => map.is_empty(),
            Value::Bool(_) | Value::Number(_) => false,
        }
    }

    /// Whether the value is `true` (or the string `"true"`)
    pub fn is_truthy(&self) -> bool {
        match &self.value {
            Value::Bool(b) => *b,
            Value::String(s) => s.eq_ignore_ascii_case("true"),
            Value::Number(n) => n.as_i64().is_some_and(|n| n != 0),
            _ => false,
        }
    }
}

/// A rich-content fragment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentFragment {
    /// Fragment kind (`t` for text, `trv`/`trva` for inline references, ...)
    #[serde(rename = "t")]
    pub kind: String,

    /// Fragment payload
    #[serde(rename = "v", default)]
    pub value: Value,

    /// Reference target for reference fragments
    #[serde(rename = "r", default)]
    pub target: Option<BlockId>,
}

impl ContentFragment {
    /// Plain text fragment
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            kind: "t".to_string(),
            value: Value::String(value.into()),
            target: None,
        }
    }

    /// Inline reference fragment pointing at `target`
    pub fn inline_ref(target: impl Into<BlockId>, label: impl Into<String>) -> Self {
        Self {
            kind: "trv".to_string(),
            value: Value::String(label.into()),
            target: Some(target.into()),
        }
    }

    /// Whether this fragment renders an inline reference
    pub fn is_inline_ref(&self) -> bool {
        matches!(self.kind.as_str(), "trv" | "trva")
    }
}

/// Order-preserving de-duplication of ids
pub fn dedup_ids(ids: impl IntoIterator<Item = BlockId>) -> Vec<BlockId> {
    let mut seen = std::collections::HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_name_prefers_alias() {
        let block = Block::new(1).with_text("body").with_alias("Page");
        assert_eq!(block.name(), Some("Page"));

        let block = Block::new(2).with_text("body");
        assert_eq!(block.name(), Some("body"));

        let block = Block::new(3).with_text("   ");
        assert!(!block.has_name());
    }

    #[test]
    fn test_name_skips_empty_aliases() {
        let block = Block::new(1).with_text("body").with_alias("").with_alias("Second");
        assert_eq!(block.name(), Some("Second"));

        let block = Block::new(2).with_text("body").with_alias("");
        assert_eq!(block.name(), Some("body"));
    }

    #[test]
    fn test_deserialize_host_shape() {
        let raw = json!({
            "id": 10,
            "text": "hello",
            "aliases": ["Hello"],
            "backRefs": [{"id": 1, "from": 11, "to": 10, "type": 0}],
            "refs": [{"id": 2, "from": 10, "to": 12, "type": 2, "alias": "Tag"}],
            "content": [{"t": "trv", "v": "x", "r": 12}],
            "properties": [{"name": "_hide", "type": 4, "value": true}]
        });
        let block: Block = serde_json::from_value(raw).unwrap();
        assert_eq!(block.back_ref_sources(), vec![BlockId(11)]);
        assert_eq!(block.refs[0].ref_type, 2);
        assert!(block.refs[0].has_alias());
        assert!(block.content[0].is_inline_ref());
        assert!(block.property(PROP_HIDE).unwrap().is_truthy());
    }

    #[test]
    fn test_ref_targets_are_deduplicated() {
        let block = Block::new(1)
            .with_ref(BlockRef::new(1, 5, 0))
            .with_ref(BlockRef::new(1, 6, 1))
            .with_ref(BlockRef::new(1, 5, 2));
        assert_eq!(block.ref_targets(), vec![BlockId(5), BlockId(6)]);
    }

    #[test]
    fn test_property_emptiness() {
        assert!(BlockProperty::new("a", json!(null)).is_empty());
        assert!(BlockProperty::new("a", json!("")).is_empty());
        assert!(BlockProperty::new("a", json!([])).is_empty());
        assert!(!BlockProperty::new("a", json!(0)).is_empty());
        assert!(!BlockProperty::new("a", json!(["x"])).is_empty());
    }
}
