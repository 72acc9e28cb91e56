use crate::types::{Id, Node, NodeId, Token, TokenStream};

/// Builds an owned DOM tree from a token stream.
///
/// Nodes are first appended to a flat arena in token order, which is document (pre-order)
/// order, so a node's arena slot doubles as its [`Id`]. End tags close the nearest open
/// element with the same name; end tags matching nothing open are dropped.
pub fn build_dom(stream: &TokenStream) -> Node {
    let mut arena = Arena::with_document();
    let mut open_elements: Vec<usize> = Vec::new();

    for token in stream.iter() {
        let parent = open_elements.last().copied().unwrap_or(Arena::ROOT);
        match token {
            Token::Doctype(doctype) => arena.set_doctype(doctype),
            Token::Comment(text) => {
                arena.append(parent, NodeData::Comment(text.clone()));
            }
            Token::Text(text) if text.is_empty() => {}
            Token::Text(text) => {
                arena.append(parent, NodeData::Text(text.clone()));
            }
            Token::StartTag {
                name,
                attributes,
                self_closing,
            } => {
                let element = arena.append(
                    parent,
                    NodeData::Element {
                        name: name.clone(),
                        attributes: attributes.clone(),
                    },
                );
                if !self_closing {
                    open_elements.push(element);
                }
            }
            Token::EndTag(name) => {
                let matching = open_elements.iter().rposition(|&open| {
                    arena
                        .element_name(open)
                        .is_some_and(|open_name| open_name.eq_ignore_ascii_case(name))
                });
                if let Some(depth) = matching {
                    open_elements.truncate(depth);
                }
            }
        }
    }

    arena.into_tree()
}

#[derive(Debug)]
enum NodeData {
    Document { doctype: Option<String> },
    Element {
        name: String,
        attributes: Vec<(String, Option<String>)>,
    },
    Text(String),
    Comment(String),
}

#[derive(Debug)]
struct Slot {
    data: NodeData,
    children: Vec<usize>,
}

#[derive(Debug)]
struct Arena {
    slots: Vec<Slot>,
}

impl Arena {
    const ROOT: usize = 0;

    fn with_document() -> Self {
        Self {
            slots: vec![Slot {
                data: NodeData::Document { doctype: None },
                children: Vec::new(),
            }],
        }
    }

    fn append(&mut self, parent: usize, data: NodeData) -> usize {
        let index = self.slots.len();
        self.slots.push(Slot {
            data,
            children: Vec::new(),
        });
        self.slots[parent].children.push(index);
        index
    }

    fn set_doctype(&mut self, value: &str) {
        if let NodeData::Document { doctype } = &mut self.slots[Self::ROOT].data {
            *doctype = Some(value.to_string());
        }
    }

    fn element_name(&self, index: usize) -> Option<&str> {
        match &self.slots[index].data {
            NodeData::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Children always sit at higher slots than their parent, so sweeping the slots from the
    /// back finishes every child before the parent that adopts it. No recursion, so nesting
    /// depth is bounded only by memory.
    fn into_tree(self) -> Node {
        let mut finished: Vec<Option<Node>> = Vec::with_capacity(self.slots.len());
        finished.resize_with(self.slots.len(), || None);

        for (index, slot) in self.slots.into_iter().enumerate().rev() {
            let id = Id(index as NodeId);
            let children: Vec<Node> = slot
                .children
                .iter()
                .filter_map(|&child| finished[child].take())
                .collect();
            let node = match slot.data {
                NodeData::Document { doctype } => Node::Document {
                    id,
                    doctype,
                    children,
                },
                NodeData::Element { name, attributes } => Node::Element {
                    id,
                    name,
                    attributes,
                    children,
                },
                NodeData::Text(text) => Node::Text { id, text },
                NodeData::Comment(text) => Node::Comment { id, text },
            };
            if index == Self::ROOT {
                return node;
            }
            finished[index] = Some(node);
        }
        unreachable!("arena always holds the document slot")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenize;
    use crate::traverse::walk_document_order;
    use std::ops::ControlFlow;

    #[test]
    fn deep_nesting_builds_without_recursion() {
        let depth = 10_000;
        let input = format!("{}{}", "<section>".repeat(depth), "</section>".repeat(depth));
        let dom = build_dom(&tokenize(&input));

        let mut max_depth = 0;
        let mut current = &dom;
        while let Some([only]) = current.children() {
            max_depth += 1;
            current = only;
        }
        assert_eq!(max_depth, depth);
        assert!(matches!(current, Node::Element { name, .. } if name == "section"));
    }

    #[test]
    fn ids_follow_document_order() {
        let dom = build_dom(&tokenize("<ul><li>a</li><!--c--><li>b</li></ul><p>d</p>"));
        let mut ids = Vec::new();
        walk_document_order(&dom, |node| {
            ids.push(node.id().0);
            ControlFlow::<()>::Continue(())
        });
        assert_eq!(ids, (0..ids.len() as u32).collect::<Vec<_>>());
        assert_eq!(ids.len(), 9);
    }

    #[test]
    fn stray_end_tag_does_not_close_unrelated_elements() {
        let dom = build_dom(&tokenize("<div><span>a</i>b</span></div>"));
        let span = walk_document_order(&dom, |node| match node {
            Node::Element { name, .. } if name == "span" => ControlFlow::Break(node),
            _ => ControlFlow::Continue(()),
        })
        .expect("span");
        assert_eq!(span.children().map(<[Node]>::len), Some(2));
    }

    #[test]
    fn doctype_is_kept_on_the_document() {
        let dom = build_dom(&tokenize("<!DOCTYPE html><p>x</p>"));
        assert!(matches!(dom, Node::Document { doctype: Some(_), id: Id(0), .. }));
    }
}
