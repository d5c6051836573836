//! CSS selector generation for picked elements.

use crate::dom::class_suffix;
use crate::dom::path::SEGMENT_SEPARATOR;
use crate::dom::tree::NodeRef;
use std::collections::VecDeque;

/// Build a CSS selector that re-locates `node` (and equivalent elements).
///
/// An element with an id yields `#id`. Otherwise one segment is emitted per
/// level up to the body: the tag, then either `#id` (which ends the walk) or
/// the class tokens, then `:nth-of-type(n)` when the parent holds more than
/// one element with the same tag.
pub fn css_selector(node: NodeRef<'_>) -> String {
    if let Some(id) = node.element_id() {
        return format!("#{}", id);
    }

    let mut segments = VecDeque::new();
    let mut current = Some(node);

    while let Some(element) = current {
        if element.is_root() {
            break;
        }

        let mut segment = element.tag_name().to_string();

        if let Some(id) = element.element_id() {
            segment.push('#');
            segment.push_str(id);
            segments.push_front(segment);
            break;
        }

        if let Some(class) = element.class_name() {
            segment.push_str(&class_suffix(class));
        }

        if let Some(position) = same_type_position(element) {
            segment.push_str(&format!(":nth-of-type({})", position));
        }

        segments.push_front(segment);
        current = element.parent();
    }

    Vec::from(segments).join(SEGMENT_SEPARATOR)
}

/// 1-based position among same-tag siblings, only when the tag is ambiguous
fn same_type_position(element: NodeRef<'_>) -> Option<usize> {
    let same_tag: Vec<_> = element
        .siblings()
        .filter(|sibling| sibling.tag_name() == element.tag_name())
        .collect();

    if same_tag.len() <= 1 {
        return None;
    }

    same_tag
        .iter()
        .position(|sibling| sibling.id() == element.id())
        .map(|index| index + 1)
}
