//! Structural identifier paths.
//!
//! An identifier path names an element by its position below the document
//! body, e.g. `div#parent:nth-child(1) > span.child-class:nth-child(1)`.
//! It is used as the key of a saved selection and is not guaranteed to stay
//! unique once the page changes.

use crate::dom::class_suffix;
use crate::dom::tree::NodeRef;
use std::collections::VecDeque;

/// Separator between path segments
pub const SEGMENT_SEPARATOR: &str = " > ";

/// Build the identifier path from the tree root (exclusive) down to `node`.
///
/// Each level contributes `tag[#id][.class...]:nth-child(n)` where `n` is the
/// 1-based position among all child elements of the parent. The root itself
/// has an empty path.
pub fn identifier_path(node: NodeRef<'_>) -> String {
    let mut segments = VecDeque::new();
    let mut current = Some(node);

    while let Some(element) = current {
        if element.is_root() {
            break;
        }
        let Some(position) = element.child_position() else {
            break;
        };
        segments.push_front(path_segment(element, position + 1));
        current = element.parent();
    }

    Vec::from(segments).join(SEGMENT_SEPARATOR)
}

fn path_segment(element: NodeRef<'_>, position: usize) -> String {
    let mut segment = element.tag_name().to_string();
    if let Some(id) = element.element_id() {
        segment.push('#');
        segment.push_str(id);
    }
    if let Some(class) = element.class_name() {
        segment.push_str(&class_suffix(class));
    }
    segment.push_str(&format!(":nth-child({})", position));
    segment
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{DomTree, ElementNode, NodeId};

    fn body_with(children: Vec<ElementNode>) -> DomTree {
        DomTree::new(ElementNode::new("body").with_children(children))
    }

    #[test]
    fn test_simple_element() {
        let tree = body_with(vec![ElementNode::new("div")]);
        assert_eq!(identifier_path(tree.get(NodeId(1)).unwrap()), "div:nth-child(1)");
    }

    #[test]
    fn test_element_with_id() {
        let tree = body_with(vec![ElementNode::new("div").with_id("test-id")]);
        assert_eq!(identifier_path(tree.get(NodeId(1)).unwrap()), "div#test-id:nth-child(1)");
    }

    #[test]
    fn test_nested_element() {
        let tree = body_with(vec![
            ElementNode::new("div")
                .with_id("parent")
                .with_child(ElementNode::new("span").with_class("child-class")),
        ]);

        let span = tree.get(NodeId(2)).unwrap();
        assert_eq!(
            identifier_path(span),
            "div#parent:nth-child(1) > span.child-class:nth-child(1)"
        );
    }

    #[test]
    fn test_multiple_classes_are_kept_verbatim() {
        let tree = body_with(vec![ElementNode::new("div").with_class("class1 class2 class3")]);
        assert_eq!(
            identifier_path(tree.get(NodeId(1)).unwrap()),
            "div.class1.class2.class3:nth-child(1)"
        );

        let tree = body_with(vec![ElementNode::new("div").with_class("a a  b")]);
        assert_eq!(identifier_path(tree.get(NodeId(1)).unwrap()), "div.a.a..b:nth-child(1)");
    }

    #[test]
    fn test_position_counts_all_sibling_elements() {
        let tree = body_with(vec![
            ElementNode::new("h1"),
            ElementNode::new("p"),
            ElementNode::new("span"),
            ElementNode::new("p"),
        ]);

        assert_eq!(identifier_path(tree.get(NodeId(4)).unwrap()), "p:nth-child(4)");
        assert_eq!(identifier_path(tree.get(NodeId(3)).unwrap()), "span:nth-child(3)");
    }

    #[test]
    fn test_segment_count_matches_depth() {
        let tree = body_with(vec![ElementNode::new("main").with_child(
            ElementNode::new("section").with_child(ElementNode::new("article").with_child(ElementNode::new("p"))),
        )]);

        let p = tree.get(NodeId(4)).unwrap();
        let path = identifier_path(p);
        assert_eq!(path.split(SEGMENT_SEPARATOR).count(), p.ancestors().count());
        assert_eq!(path.split(SEGMENT_SEPARATOR).count(), 4);
    }

    #[test]
    fn test_root_has_empty_path() {
        let tree = body_with(vec![ElementNode::new("div")]);
        assert_eq!(identifier_path(tree.root()), "");
    }

    #[test]
    fn test_empty_id_and_class_are_ignored() {
        let tree = body_with(vec![ElementNode::new("div").with_id("").with_class("")]);
        assert_eq!(identifier_path(tree.get(NodeId(1)).unwrap()), "div:nth-child(1)");
    }

    #[test]
    fn test_idempotent() {
        let tree = body_with(vec![ElementNode::new("ul").with_children(vec![
            ElementNode::new("li"),
            ElementNode::new("li").with_class("active"),
        ])]);
        let li = tree.get(NodeId(3)).unwrap();
        assert_eq!(identifier_path(li), identifier_path(li));
        assert_eq!(identifier_path(li), "ul:nth-child(1) > li.active:nth-child(2)");
    }
}
