use crate::{Id, Node};
use std::ops::ControlFlow;

/// Visits every node in document (pre-order) order until `visit` breaks.
///
/// Iterative, so arbitrarily deep documents are fine.
pub fn walk_document_order<'a, B>(
    root: &'a Node,
    mut visit: impl FnMut(&'a Node) -> ControlFlow<B>,
) -> Option<B> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if let ControlFlow::Break(value) = visit(node) {
            return Some(value);
        }
        if let Some(children) = node.children() {
            stack.extend(children.iter().rev());
        }
    }
    None
}

pub fn find_node_by_id(root: &Node, id: Id) -> Option<&Node> {
    walk_document_order(root, |node| {
        if node.id() == id {
            ControlFlow::Break(node)
        } else {
            ControlFlow::Continue(())
        }
    })
}

/// Comment bodies that precede `target` in document order, or `None` if `target` is not in
/// the tree. A comment never precedes itself; ancestors of `target` are visited before it.
pub fn comments_before(root: &Node, target: Id) -> Option<Vec<&str>> {
    let mut comments = Vec::new();
    walk_document_order(root, |node| {
        if node.id() == target {
            return ControlFlow::Break(());
        }
        if let Some(text) = node.comment_text() {
            comments.push(text);
        }
        ControlFlow::Continue(())
    })?;
    Some(comments)
}

/// All comment bodies in the tree, in document order.
pub fn all_comments(root: &Node) -> Vec<&str> {
    let mut comments = Vec::new();
    walk_document_order(root, |node| {
        if let Some(text) = node.comment_text() {
            comments.push(text);
        }
        ControlFlow::<()>::Continue(())
    });
    comments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{build_dom, tokenize};

    #[test]
    fn comments_before_stops_at_target() {
        let dom = build_dom(&tokenize("<!--a--><div><!--b--><p>x</p><!--c--></div>"));
        let p = {
            let mut found = None;
            walk_document_order(&dom, |node| {
                if matches!(node, Node::Element { name, .. } if name == "p") {
                    found = Some(node.id());
                    return ControlFlow::Break(());
                }
                ControlFlow::Continue(())
            });
            found.expect("p element")
        };
        assert_eq!(comments_before(&dom, p), Some(vec!["a", "b"]));
        assert_eq!(all_comments(&dom), ["a", "b", "c"]);
    }

    #[test]
    fn comments_before_unknown_node_is_none() {
        let dom = build_dom(&tokenize("<!--a-->"));
        assert_eq!(comments_before(&dom, Id(99)), None);
    }

    #[test]
    fn find_node_by_id_matches_builder_ids() {
        let dom = build_dom(&tokenize("<p>x</p>"));
        let text = find_node_by_id(&dom, Id(2)).expect("text node");
        assert!(matches!(text, Node::Text { text, .. } if text == "x"));
    }
}
