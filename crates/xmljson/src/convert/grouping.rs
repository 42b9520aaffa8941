//! Sibling grouping for the encoder.
//!
//! Children of one parent are bucketed by property name in first-seen order.
//! A bucket with one node that is not array-marked is written as that node's
//! value; anything else is written as a JSON array.

use std::borrow::Cow;
use std::collections::HashMap;

use crate::convert::metadata::is_array;
use crate::convert::names::property_name;
use crate::error::Result;
use crate::xml::{NamespaceScope, NodeId, XmlDocument};

/// Sibling nodes sharing one property name.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeGroup<'a> {
    pub name: String,
    pub nodes: Cow<'a, [NodeId]>,
}

impl NodeGroup<'_> {
    /// Whether the group is written as a JSON array.
    pub fn is_array(&self, doc: &XmlDocument) -> bool {
        match self.nodes.as_ref() {
            [single] => is_array(doc, *single),
            _ => true,
        }
    }
}

/// Groups the children of `parent` by property name.
///
/// A run of children that all share one name borrows the child list as is;
/// buckets are only built once a second name shows up.
pub fn group_children<'a>(
    doc: &'a XmlDocument,
    scope: &NamespaceScope,
    parent: NodeId,
) -> Result<Vec<NodeGroup<'a>>> {
    let children = doc.children(parent);
    let Some((&first, rest)) = children.split_first() else {
        return Ok(Vec::new());
    };
    let first_name = property_name(doc, scope, first)?;

    let mut buckets: Option<(Vec<(String, Vec<NodeId>)>, HashMap<String, usize>)> = None;
    for (offset, &child) in rest.iter().enumerate() {
        let name = property_name(doc, scope, child)?;
        match buckets.as_mut() {
            None if name == first_name => {}
            None => {
                let seen = children[..=offset].to_vec();
                let groups = vec![(first_name.clone(), seen), (name.clone(), vec![child])];
                let index = HashMap::from([(first_name.clone(), 0), (name, 1)]);
                buckets = Some((groups, index));
            }
            Some((groups, index)) => match index.get(&name) {
                Some(&position) => groups[position].1.push(child),
                None => {
                    index.insert(name.clone(), groups.len());
                    groups.push((name, vec![child]));
                }
            },
        }
    }

    let groups = match buckets {
        None => vec![NodeGroup {
            name: first_name,
            nodes: Cow::Borrowed(children),
        }],
        Some((groups, _)) => groups
            .into_iter()
            .map(|(name, nodes)| NodeGroup {
                name,
                nodes: Cow::Owned(nodes),
            })
            .collect(),
    };
    Ok(groups)
}

/// Whether an array-marked element's children are the items of a nested array.
///
/// This is the shape the decoder builds for an array directly inside an
/// array: a wrapper element whose children all repeat its own name.
pub fn is_forced_array(doc: &XmlDocument, element: NodeId) -> bool {
    let children = doc.children(element);
    !children.is_empty()
        && is_array(doc, element)
        && children
            .iter()
            .all(|&child| doc.local_name(child) == doc.local_name(element))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::metadata::add_array_attribute;
    use crate::xml::parse_str;

    fn names(groups: &[NodeGroup<'_>]) -> Vec<(String, usize)> {
        groups
            .iter()
            .map(|g| (g.name.clone(), g.nodes.len()))
            .collect()
    }

    #[test]
    fn test_homogeneous_children_borrow_the_child_list() {
        let doc = parse_str("<r><a/><a/><a/></r>").unwrap();
        let root = doc.root_element().unwrap();
        let groups = group_children(&doc, &NamespaceScope::new(), root).unwrap();
        assert_eq!(names(&groups), vec![("a".to_string(), 3)]);
        assert!(matches!(groups[0].nodes, Cow::Borrowed(_)));
        assert!(groups[0].is_array(&doc));
    }

    #[test]
    fn test_mixed_children_keep_first_seen_order() {
        let doc = parse_str("<r><a/><a/><b/><a/><c/><b/></r>").unwrap();
        let root = doc.root_element().unwrap();
        let groups = group_children(&doc, &NamespaceScope::new(), root).unwrap();
        assert_eq!(
            names(&groups),
            vec![
                ("a".to_string(), 3),
                ("b".to_string(), 2),
                ("c".to_string(), 1)
            ]
        );
        let children = doc.children(root);
        assert_eq!(
            groups[0].nodes.as_ref(),
            &[children[0], children[1], children[3]]
        );
        assert!(!groups[2].is_array(&doc));
    }

    #[test]
    fn test_single_array_marked_child_is_an_array() {
        let mut doc = parse_str("<r><a/></r>").unwrap();
        let root = doc.root_element().unwrap();
        let child = doc.children(root)[0];
        add_array_attribute(&mut doc, child);
        let groups = group_children(&doc, &NamespaceScope::new(), root).unwrap();
        assert!(groups[0].is_array(&doc));
    }

    #[test]
    fn test_no_children_no_groups() {
        let doc = parse_str("<r/>").unwrap();
        let root = doc.root_element().unwrap();
        assert!(
            group_children(&doc, &NamespaceScope::new(), root)
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_forced_array_requires_marker_and_same_names() {
        let mut doc = parse_str("<a><a>1</a><a>2</a></a>").unwrap();
        let root = doc.root_element().unwrap();
        assert!(!is_forced_array(&doc, root));
        add_array_attribute(&mut doc, root);
        assert!(is_forced_array(&doc, root));

        let mut doc = parse_str("<a><b/></a>").unwrap();
        let root = doc.root_element().unwrap();
        add_array_attribute(&mut doc, root);
        assert!(!is_forced_array(&doc, root));
    }
}
