//! Tag definitions.
//!
//! Per-tag metadata driving the tree builder: void tags take no children and
//! no closing tag; `svg` opens an XML namespace that descendants inherit.

use once_cell::sync::Lazy;
use std::collections::HashSet;

pub const SVG_NAMESPACE: &str = "svg";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagDefinition {
    pub is_void: bool,
    pub can_self_close: bool,
    pub implicit_namespace: Option<&'static str>,
}

static VOID_TAGS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
        "source", "track", "wbr",
    ]
    .into_iter()
    .collect()
});

const VOID_TAG: TagDefinition = TagDefinition {
    is_void: true,
    can_self_close: true,
    implicit_namespace: None,
};

const SVG_TAG: TagDefinition = TagDefinition {
    is_void: false,
    can_self_close: true,
    implicit_namespace: Some(SVG_NAMESPACE),
};

const DEFAULT_TAG: TagDefinition = TagDefinition {
    is_void: false,
    can_self_close: true,
    implicit_namespace: None,
};

pub fn get_tag_definition(name: &str) -> &'static TagDefinition {
    let lowered = name.to_ascii_lowercase();
    if VOID_TAGS.contains(lowered.as_str()) {
        &VOID_TAG
    } else if lowered == "svg" {
        &SVG_TAG
    } else {
        &DEFAULT_TAG
    }
}
