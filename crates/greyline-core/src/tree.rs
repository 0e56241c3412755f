//! [`ElementQuery`] over accessibility hierarchy snapshots.
//!
//! [`TreeQuery`] resolves selectors by walking a fresh hierarchy snapshot on
//! every lookup. Where the snapshot comes from is up to the [`TreeSource`]:
//! a fixed in-memory tree ([`StaticTree`]), a JSON dump that an agent keeps
//! rewriting ([`FileTree`]), or a scripted test double.
//!
//! # Example
//!
//! ```
//! use greyline_core::element::{ElementFrame, UIElement};
//! use greyline_core::query::ElementQuery;
//! use greyline_core::selector::element_by_id;
//! use greyline_core::tree::{StaticTree, TreeQuery};
//!
//! let button = UIElement {
//!     identifier: Some("login-button".to_string()),
//!     element_type: Some("Button".to_string()),
//!     frame: Some(ElementFrame { x: 10.0, y: 20.0, width: 100.0, height: 44.0 }),
//!     ..Default::default()
//! };
//! let query = TreeQuery::new(StaticTree::new(vec![button]));
//!
//! let handle = query.resolve(&element_by_id("login-button")).unwrap();
//! assert_eq!(handle.path(), &[0]);
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, instrument};

use crate::element::UIElement;
use crate::query::{Action, ElementHandle, ElementQuery, QueryError};
use crate::selector::Selector;

/// Supplies hierarchy snapshots and, optionally, executes actions.
pub trait TreeSource {
    /// Returns the root elements of the hierarchy as it is now.
    fn snapshot(&self) -> Result<Vec<UIElement>, QueryError>;

    /// Applies `action` to the element at `path`.
    ///
    /// The default implementation rejects every action; snapshot-only
    /// sources have nothing to act on.
    fn perform(&self, _path: &[usize], element: &UIElement, action: &Action) -> Result<(), QueryError> {
        Err(QueryError::ActionFailed {
            action: action.to_string(),
            element: element.summary(),
            reason: "snapshot source is read-only".to_string(),
        })
    }
}

/// A hierarchy fixed at construction time.
#[derive(Debug, Clone, Default)]
pub struct StaticTree {
    roots: Vec<UIElement>,
}

impl StaticTree {
    pub fn new(roots: Vec<UIElement>) -> Self {
        Self { roots }
    }
}

impl TreeSource for StaticTree {
    fn snapshot(&self) -> Result<Vec<UIElement>, QueryError> {
        Ok(self.roots.clone())
    }
}

/// JSON document holding either a list of roots or a single root element.
#[derive(Deserialize)]
#[serde(untagged)]
enum TreeDocument {
    Many(Vec<UIElement>),
    One(Box<UIElement>),
}

/// Parses a hierarchy dump (a root element or an array of roots).
pub fn parse_tree(json: &str) -> Result<Vec<UIElement>, QueryError> {
    match serde_json::from_str::<TreeDocument>(json) {
        Ok(TreeDocument::Many(roots)) => Ok(roots),
        Ok(TreeDocument::One(root)) => Ok(vec![*root]),
        Err(e) => Err(QueryError::Backend(format!("invalid hierarchy JSON: {}", e))),
    }
}

/// A hierarchy dump on disk, re-read on every snapshot.
#[derive(Debug, Clone)]
pub struct FileTree {
    path: PathBuf,
}

impl FileTree {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TreeSource for FileTree {
    fn snapshot(&self) -> Result<Vec<UIElement>, QueryError> {
        let json = std::fs::read_to_string(&self.path).map_err(|e| {
            QueryError::Backend(format!("cannot read {}: {}", self.path.display(), e))
        })?;
        parse_tree(&json)
    }
}

/// Resolves selectors against snapshots from a [`TreeSource`].
#[derive(Debug, Clone, Default)]
pub struct TreeQuery<S> {
    source: S,
}

impl<S: TreeSource> TreeQuery<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Current snapshot flattened to elements with an identifier or label.
    pub fn list_elements(&self) -> Result<Vec<UIElement>, QueryError> {
        Ok(flatten_elements(&self.source.snapshot()?))
    }
}

impl<S: TreeSource> ElementQuery for TreeQuery<S> {
    #[instrument(skip(self), level = "debug")]
    fn resolve_all(&self, selector: &Selector) -> Result<Vec<ElementHandle>, QueryError> {
        let roots = self.source.snapshot()?;
        let mut found = Vec::new();
        let mut path = Vec::new();
        collect_matches(&roots, selector, &mut path, &mut found);
        debug!(matches = found.len(), "selector resolved");
        Ok(found)
    }

    #[instrument(skip(self, handle), fields(element = %handle.element().summary()), level = "debug")]
    fn perform(&self, handle: &ElementHandle, action: &Action) -> Result<(), QueryError> {
        if matches!(action, Action::Tap) && !handle.element().is_interactable() {
            return Err(QueryError::ActionFailed {
                action: action.to_string(),
                element: handle.element().summary(),
                reason: "element is not interactable".to_string(),
            });
        }
        self.source.perform(handle.path(), handle.element(), action)
    }
}

/// Depth-first search collecting every element matching `selector`.
fn collect_matches(
    elements: &[UIElement],
    selector: &Selector,
    path: &mut Vec<usize>,
    found: &mut Vec<ElementHandle>,
) {
    for (i, element) in elements.iter().enumerate() {
        path.push(i);
        if selector.matches(element) {
            found.push(ElementHandle::new(path.clone(), element.clone()));
        }
        collect_matches(&element.children, selector, path, found);
        path.pop();
    }
}

/// Follows a child-index path from the roots.
pub fn element_at<'a>(roots: &'a [UIElement], path: &[usize]) -> Option<&'a UIElement> {
    let (first, rest) = path.split_first()?;
    let mut current = roots.get(*first)?;
    for &i in rest {
        current = current.children.get(i)?;
    }
    Some(current)
}

/// Flattens a UI element hierarchy into a list of actionable elements.
///
/// Elements without both an identifier and a label are skipped, as they are
/// typically not directly addressable.
pub fn flatten_elements(elements: &[UIElement]) -> Vec<UIElement> {
    let mut result = Vec::new();
    collect_elements(elements, &mut result);
    result
}

fn collect_elements(elements: &[UIElement], result: &mut Vec<UIElement>) {
    for element in elements {
        if element.identifier.is_some() || element.label.is_some() {
            result.push(element.clone());
        }
        collect_elements(&element.children, result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::ElementFrame;
    use crate::selector::{element_by_id, element_by_text, raw_by_id};

    fn visible() -> Option<ElementFrame> {
        Some(ElementFrame { x: 0.0, y: 0.0, width: 320.0, height: 44.0 })
    }

    fn node(id: Option<&str>, label: Option<&str>, children: Vec<UIElement>) -> UIElement {
        UIElement {
            identifier: id.map(String::from),
            label: label.map(String::from),
            frame: visible(),
            children,
            ..Default::default()
        }
    }

    fn sample_tree() -> Vec<UIElement> {
        vec![node(
            Some("main-view"),
            Some("Main View"),
            vec![
                node(Some("login-button"), Some("Log In"), vec![]),
                node(
                    None,
                    None,
                    vec![
                        node(Some("row-1"), Some("Row"), vec![]),
                        node(Some("row-2"), Some("Row"), vec![]),
                    ],
                ),
            ],
        )]
    }

    #[test]
    fn resolve_reports_path_of_nested_match() {
        let query = TreeQuery::new(StaticTree::new(sample_tree()));
        let handle = query.resolve(&element_by_id("row-2")).unwrap();
        assert_eq!(handle.path(), &[0, 1, 1]);
        assert_eq!(handle.element().identifier.as_deref(), Some("row-2"));
    }

    #[test]
    fn duplicate_labels_are_ambiguous_unless_indexed() {
        let query = TreeQuery::new(StaticTree::new(sample_tree()));
        let rows = element_by_text("Row");

        assert!(matches!(
            query.resolve(&rows),
            Err(QueryError::AmbiguousMatch { count: 2, .. })
        ));
        let second = query.resolve(&rows.at_index(1)).unwrap();
        assert_eq!(second.element().identifier.as_deref(), Some("row-2"));
    }

    #[test]
    fn resolve_all_walks_depth_first() {
        let query = TreeQuery::new(StaticTree::new(sample_tree()));
        let all = query.resolve_all(&raw_by_id("*")).unwrap();
        let ids: Vec<_> = all
            .iter()
            .map(|h| h.element().identifier.clone().unwrap())
            .collect();
        assert_eq!(ids, vec!["main-view", "login-button", "row-1", "row-2"]);
    }

    #[test]
    fn static_tree_rejects_actions() {
        let query = TreeQuery::new(StaticTree::new(sample_tree()));
        let handle = query.resolve(&raw_by_id("login-button")).unwrap();
        let err = query.perform(&handle, &Action::Tap).unwrap_err();
        assert!(matches!(err, QueryError::ActionFailed { .. }));
    }

    /// Accepts every action and counts them.
    #[derive(Default)]
    struct CountingTree {
        roots: Vec<UIElement>,
        performed: std::cell::Cell<u32>,
    }

    impl TreeSource for CountingTree {
        fn snapshot(&self) -> Result<Vec<UIElement>, QueryError> {
            Ok(self.roots.clone())
        }

        fn perform(&self, _path: &[usize], _element: &UIElement, _action: &Action) -> Result<(), QueryError> {
            self.performed.set(self.performed.get() + 1);
            Ok(())
        }
    }

    #[test]
    fn tap_on_non_interactable_element_never_reaches_source() {
        let mut hidden = node(Some("hidden"), None, vec![]);
        hidden.visible_fraction = Some(0.1);
        let mut disabled = node(Some("disabled"), None, vec![]);
        disabled.enabled = Some(false);
        let query = TreeQuery::new(CountingTree {
            roots: vec![hidden, disabled, node(Some("ok"), None, vec![])],
            ..Default::default()
        });

        for id in ["hidden", "disabled"] {
            let handle = query.resolve(&raw_by_id(id)).unwrap();
            let err = query.perform(&handle, &Action::Tap).unwrap_err();
            assert!(
                matches!(&err, QueryError::ActionFailed { reason, .. } if reason == "element is not interactable"),
                "{}: {}",
                id,
                err
            );
        }
        assert_eq!(query.source().performed.get(), 0);

        let handle = query.resolve(&raw_by_id("ok")).unwrap();
        query.perform(&handle, &Action::Tap).unwrap();
        assert_eq!(query.source().performed.get(), 1);
    }

    #[test]
    fn element_at_follows_path() {
        let tree = sample_tree();
        assert_eq!(
            element_at(&tree, &[0, 1, 0]).and_then(|e| e.identifier.as_deref()),
            Some("row-1")
        );
        assert!(element_at(&tree, &[0, 5]).is_none());
        assert!(element_at(&tree, &[]).is_none());
    }

    #[test]
    fn parse_tree_accepts_single_root_or_array() {
        let one = parse_tree(r#"{"AXUniqueId": "root", "children": []}"#).unwrap();
        assert_eq!(one.len(), 1);

        let many = parse_tree(r#"[{"AXUniqueId": "a"}, {"AXUniqueId": "b"}]"#).unwrap();
        assert_eq!(many.len(), 2);

        let err = parse_tree("not json").unwrap_err();
        assert!(matches!(err, QueryError::Backend(_)));
    }

    #[test]
    fn file_tree_reports_missing_file_as_backend_error() {
        let source = FileTree::new("/nonexistent/greyline/tree.json");
        let err = source.snapshot().unwrap_err();
        assert!(err.to_string().contains("cannot read"));
    }

    #[test]
    fn test_flatten_elements_with_mixed_hierarchy() {
        let flat = flatten_elements(&sample_tree());
        // The anonymous container (no id, no label) is excluded.
        assert_eq!(flat.len(), 4);
        assert_eq!(flat[0].identifier.as_deref(), Some("main-view"));
        assert_eq!(flat[3].identifier.as_deref(), Some("row-2"));
    }

    #[test]
    fn test_flatten_elements_empty() {
        assert!(flatten_elements(&[]).is_empty());
    }
}
