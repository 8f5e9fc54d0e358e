//! Storage key and hash-field codec.
//!
//! Three key families carry the whole graph:
//!
//! | key                 | kind   | content                                   |
//! |---------------------|--------|-------------------------------------------|
//! | `node:<id>`         | scalar | serialized node payload                   |
//! | `childrenOf:<id>`   | hash   | `target:<tid>` and `meta:<tid>:<key>`     |
//! | `parentOf:<id>`     | set    | ids of hosts pointing at `<id>`           |
//!
//! Every encoder is idempotent and every decoder is a no-op on strings that
//! do not carry the prefix, so the codec is total on all strings.
//!
//! Inside forward-hash field names the target id is escaped (`:` becomes
//! `\:`, `\` becomes `\\`), so a metadata field splits at its first
//! unescaped `:` whatever colons the target id or the metadata key hold.
//! Ids free of both characters are stored verbatim.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};

use crate::relation::Metadata;

pub const NODE_PREFIX: &str = "node:";
pub const FORWARD_PREFIX: &str = "childrenOf:";
pub const BACKWARD_PREFIX: &str = "parentOf:";
pub const TARGET_FIELD_PREFIX: &str = "target:";
pub const META_FIELD_PREFIX: &str = "meta:";

const FIELD_ESCAPE: char = '\\';

fn ensure_prefix(prefix: &str, value: &str) -> String {
    if value.starts_with(prefix) {
        value.to_string()
    } else {
        format!("{prefix}{value}")
    }
}

fn strip_prefix<'a>(prefix: &str, value: &'a str) -> &'a str {
    value.strip_prefix(prefix).unwrap_or(value)
}

// ---------------------------------------------------------------------------
// Key families
// ---------------------------------------------------------------------------

/// Value key of a node: `node:<id>`.
pub fn node_key(id: &str) -> String {
    ensure_prefix(NODE_PREFIX, id)
}

/// Strips a `node:` prefix; unprefixed input comes back unchanged.
pub fn node_id_from_key(key: &str) -> &str {
    strip_prefix(NODE_PREFIX, key)
}

/// Forward-adjacency hash of a host: `childrenOf:<id>`.
pub fn forward_key(id: &str) -> String {
    ensure_prefix(FORWARD_PREFIX, id)
}

/// Host id owning a forward-adjacency key.
pub fn host_from_forward_key(key: &str) -> &str {
    strip_prefix(FORWARD_PREFIX, key)
}

/// Backward-adjacency set of a target: `parentOf:<id>`.
pub fn backward_key(id: &str) -> String {
    ensure_prefix(BACKWARD_PREFIX, id)
}

/// Target id owning a backward-adjacency key.
pub fn target_from_backward_key(key: &str) -> &str {
    strip_prefix(BACKWARD_PREFIX, key)
}

// ---------------------------------------------------------------------------
// Forward-hash fields
// ---------------------------------------------------------------------------

/// Escapes `:` and `\` inside a target id embedded in a field name, so
/// the end of the id is always the first unescaped `:`. Ids without either
/// character are embedded verbatim.
fn escape_target(target: &str) -> Cow<'_, str> {
    if !target.contains(|c: char| c == ':' || c == FIELD_ESCAPE) {
        return Cow::Borrowed(target);
    }
    let mut escaped = String::with_capacity(target.len() + 2);
    for c in target.chars() {
        if c == ':' || c == FIELD_ESCAPE {
            escaped.push(FIELD_ESCAPE);
        }
        escaped.push(c);
    }
    Cow::Owned(escaped)
}

/// Reads an escaped target id up to the first unescaped `:`.
///
/// Returns the unescaped id and the remainder after that colon, or `None`
/// as remainder when the input holds no unescaped colon.
fn unescape_target(raw: &str) -> (String, Option<&str>) {
    let mut target = String::with_capacity(raw.len());
    let mut chars = raw.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            FIELD_ESCAPE => match chars.next() {
                Some((_, escaped)) => target.push(escaped),
                None => target.push(FIELD_ESCAPE),
            },
            ':' => return (target, Some(&raw[i + 1..])),
            other => target.push(other),
        }
    }
    (target, None)
}

/// Membership field declaring `target` as a child: `target:<tid>`.
pub fn target_field(target: &str) -> String {
    format!("{TARGET_FIELD_PREFIX}{}", escape_target(target))
}

/// Metadata field for one entry of the edge to `target`: `meta:<tid>:<key>`.
///
/// `<tid>` is escaped, `<key>` is not: everything after the first unescaped
/// `:` is the key.
pub fn meta_field(target: &str, key: &str) -> String {
    format!("{META_FIELD_PREFIX}{}:{key}", escape_target(target))
}

/// All fields a forward hash holds for one target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetFields {
    /// Whether the `target:<tid>` membership field is present. Metadata
    /// without a membership field is orphaned and does not form an edge.
    pub declared: bool,
    pub metadata: Metadata,
}

/// A forward hash grouped by target id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForwardFields {
    pub targets: BTreeMap<String, TargetFields>,
}

impl ForwardFields {
    /// Declared targets with their metadata, i.e. the live edges.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &Metadata)> {
        self.targets
            .iter()
            .filter(|(_, fields)| fields.declared)
            .map(|(target, fields)| (target.as_str(), &fields.metadata))
    }

    /// Metadata fields with no matching membership field.
    pub fn orphans(&self) -> impl Iterator<Item = (&str, &Metadata)> {
        self.targets
            .iter()
            .filter(|(_, fields)| !fields.declared)
            .map(|(target, fields)| (target.as_str(), &fields.metadata))
    }

    pub fn get(&self, target: &str) -> Option<&TargetFields> {
        self.targets.get(target)
    }

    /// Exact field names belonging to `target`, membership field first.
    ///
    /// Built from the decoded grouping, so fields of a different target
    /// whose id merely shares a prefix with `target` are never included.
    pub fn field_names_for(&self, target: &str) -> Vec<String> {
        let Some(fields) = self.targets.get(target) else {
            return Vec::new();
        };
        let mut names = Vec::with_capacity(fields.metadata.len() + 1);
        if fields.declared {
            names.push(target_field(target));
        }
        names.extend(fields.metadata.keys().map(|key| meta_field(target, key)));
        names
    }
}

/// Groups the raw fields of a forward hash by target.
///
/// A metadata field without a matching membership field is recorded as
/// orphaned metadata. Fields matching neither family, and metadata fields
/// with no unescaped `:` after the target, are ignored.
pub fn decode_forward_fields(raw: &HashMap<String, String>) -> ForwardFields {
    let mut out = ForwardFields::default();

    for (field, value) in raw {
        if let Some(rest) = field.strip_prefix(TARGET_FIELD_PREFIX) {
            let (target, _) = unescape_target(rest);
            out.targets.entry(target).or_default().declared = true;
        } else if let Some(rest) = field.strip_prefix(META_FIELD_PREFIX) {
            let (target, Some(key)) = unescape_target(rest) else {
                continue;
            };
            out.targets
                .entry(target)
                .or_default()
                .metadata
                .insert(key.to_string(), value.clone());
        }
    }

    out
}
