//! Trie based request router.
//!
//! Routes are `/` separated segments. A segment is either a literal or the wildcard token
//! [`WILDCARD`], which matches the whole remainder of the request path.
//!
//! Matching walks the trie one segment at a time and prefers a literal child. When no literal
//! child matches, the wildcard child (if any) captures every remaining segment, joined by `/`,
//! and matching stops there. There is no backtracking: once a literal child is taken, a wildcard
//! on an upper level is not reconsidered.
//!
//! # Example
//!
//! ```
//! use rook_web::router::Router;
//!
//! let mut router = Router::new();
//! router.insert("/heartbeat", "heartbeat");
//! router.insert("/assets/*", "assets");
//!
//! let matched = router.find("/assets/js/app.js").unwrap();
//! assert_eq!(*matched.handler(), "assets");
//! assert_eq!(matched.param(), Some("js/app.js"));
//!
//! assert!(router.find("/assets").is_none());
//! ```

use std::collections::HashMap;
use std::fmt;

/// The segment token that captures the rest of the path.
pub const WILDCARD: &str = "*";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NodeId(usize);

const ROOT: NodeId = NodeId(0);

struct TrieNode<H> {
    label: String,
    parent: Option<NodeId>,
    children: HashMap<String, NodeId>,
    wildcard: Option<NodeId>,
    is_wildcard: bool,
    handler: Option<H>,
}

impl<H> TrieNode<H> {
    fn new(label: &str, parent: Option<NodeId>, is_wildcard: bool) -> Self {
        Self { label: label.to_string(), parent, children: HashMap::new(), wildcard: None, is_wildcard, handler: None }
    }

    fn vacant() -> Self {
        Self::new("", None, false)
    }

    fn is_leaf(&self) -> bool {
        self.children.is_empty() && self.wildcard.is_none()
    }

    fn is_terminal(&self) -> bool {
        self.handler.is_some()
    }
}

/// The result of a successful [`Router::find`].
#[derive(Debug)]
pub struct RouteMatch<'router, H> {
    handler: &'router H,
    param: Option<String>,
}

impl<'router, H> RouteMatch<'router, H> {
    /// The handler registered for the matched route.
    pub fn handler(&self) -> &'router H {
        self.handler
    }

    /// The path remainder captured by a wildcard, `None` for a literal route.
    pub fn param(&self) -> Option<&str> {
        self.param.as_deref()
    }

    /// Splits the match into the handler and the wildcard capture.
    pub fn into_parts(self) -> (&'router H, Option<String>) {
        (self.handler, self.param)
    }
}

/// A path trie owning its handlers.
///
/// Nodes live in an arena indexed by position. Slots emptied by [`Router::remove`] are kept on
/// a free list and handed out again by later inserts.
pub struct Router<H> {
    nodes: Vec<TrieNode<H>>,
    free: Vec<NodeId>,
    routes: usize,
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

impl<H> Router<H> {
    /// Creates an empty router holding only the root node.
    pub fn new() -> Self {
        Self { nodes: vec![TrieNode::new("/", None, false)], free: Vec::new(), routes: 0 }
    }

    /// Number of registered routes.
    pub fn len(&self) -> usize {
        self.routes
    }

    /// Whether no route is registered.
    pub fn is_empty(&self) -> bool {
        self.routes == 0
    }

    fn node(&self, id: NodeId) -> &TrieNode<H> {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut TrieNode<H> {
        &mut self.nodes[id.0]
    }

    fn alloc(&mut self, label: &str, parent: NodeId, is_wildcard: bool) -> NodeId {
        let node = TrieNode::new(label, Some(parent), is_wildcard);
        match self.free.pop() {
            Some(id) => {
                *self.node_mut(id) = node;
                id
            }
            None => {
                self.nodes.push(node);
                NodeId(self.nodes.len() - 1)
            }
        }
    }

    fn child_or_insert(&mut self, parent: NodeId, segment: &str) -> NodeId {
        if segment == WILDCARD {
            if let Some(id) = self.node(parent).wildcard {
                return id;
            }
            let id = self.alloc(segment, parent, true);
            self.node_mut(parent).wildcard = Some(id);
            return id;
        }

        if let Some(&id) = self.node(parent).children.get(segment) {
            return id;
        }
        let id = self.alloc(segment, parent, false);
        self.node_mut(parent).children.insert(segment.to_string(), id);
        id
    }

    /// Registers `handler` for `path`, returning the handler it replaces, if any.
    ///
    /// `/` (or any path without segments) registers on the root.
    pub fn insert(&mut self, path: &str, handler: H) -> Option<H> {
        let mut current = ROOT;
        for segment in segments(path) {
            current = self.child_or_insert(current, segment);
        }

        let previous = self.node_mut(current).handler.replace(handler);
        if previous.is_none() {
            self.routes += 1;
        }
        previous
    }

    /// Resolves a request path. `None` means no route matched.
    pub fn find(&self, path: &str) -> Option<RouteMatch<'_, H>> {
        let segments = segments(path).collect::<Vec<_>>();
        let mut current = ROOT;
        let mut param = None;

        for (index, segment) in segments.iter().enumerate() {
            let node = self.node(current);
            if let Some(&child) = node.children.get(*segment) {
                current = child;
                continue;
            }

            current = node.wildcard?;
            param = Some(segments[index..].join("/"));
            break;
        }

        let handler = self.node(current).handler.as_ref()?;
        Some(RouteMatch { handler, param })
    }

    /// Finds the node registered for exactly `path`, wildcard tokens included.
    fn locate(&self, path: &str) -> Option<NodeId> {
        segments(path).try_fold(ROOT, |current, segment| {
            let node = self.node(current);
            if segment == WILDCARD { node.wildcard } else { node.children.get(segment).copied() }
        })
    }

    /// Unregisters `path` and prunes the branch it leaves behind.
    ///
    /// Every ancestor that ends up with no children and no handler is unlinked, up to the
    /// first node that still carries a route or another branch. The root is never pruned.
    pub fn remove(&mut self, path: &str) -> Option<H> {
        let target = self.locate(path)?;
        let handler = self.node_mut(target).handler.take()?;
        self.routes -= 1;

        let mut current = target;
        while current != ROOT {
            let node = self.node(current);
            if !node.is_leaf() || node.is_terminal() {
                break;
            }
            let Some(parent) = node.parent else {
                break;
            };

            let vacated = std::mem::replace(self.node_mut(current), TrieNode::vacant());
            let parent_node = self.node_mut(parent);
            if vacated.is_wildcard {
                parent_node.wildcard = None;
            } else {
                parent_node.children.remove(&vacated.label);
            }
            self.free.push(current);
            current = parent;
        }

        Some(handler)
    }
}

impl<H> Default for Router<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> fmt::Debug for Router<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes)
            .field("nodes", &(self.nodes.len() - self.free.len()))
            .field("free", &self.free.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matched(router: &Router<&'static str>, path: &str) -> Option<(&'static str, Option<String>)> {
        router.find(path).map(|matched| {
            let (handler, param) = matched.into_parts();
            (*handler, param)
        })
    }

    #[test]
    fn literal_routes() {
        let mut router = Router::new();
        router.insert("/", "root");
        router.insert("/heartbeat", "heartbeat");
        router.insert("/a/b", "ab");

        assert_eq!(matched(&router, "/"), Some(("root", None)));
        assert_eq!(matched(&router, "/heartbeat"), Some(("heartbeat", None)));
        assert_eq!(matched(&router, "/a/b"), Some(("ab", None)));
        assert_eq!(matched(&router, "/a"), None);
        assert_eq!(matched(&router, "/a/b/c"), None);
        assert_eq!(matched(&router, "/missing"), None);
        assert_eq!(router.len(), 3);
    }

    #[test]
    fn empty_segments_are_ignored() {
        let mut router = Router::new();
        router.insert("/a/b/", "ab");
        assert_eq!(matched(&router, "//a//b"), Some(("ab", None)));
    }

    #[test]
    fn wildcard_captures_rest_of_path() {
        let mut router = Router::new();
        router.insert("/assets/*", "assets");

        assert_eq!(matched(&router, "/assets/app.js"), Some(("assets", Some("app.js".into()))));
        assert_eq!(matched(&router, "/assets/js/vendor/app.js"), Some(("assets", Some("js/vendor/app.js".into()))));
        assert_eq!(matched(&router, "/assets"), None);
    }

    #[test]
    fn literal_wins_over_wildcard() {
        let mut router = Router::new();
        router.insert("/*", "files");
        router.insert("/heartbeat", "heartbeat");

        assert_eq!(matched(&router, "/heartbeat"), Some(("heartbeat", None)));
        assert_eq!(matched(&router, "/index.html"), Some(("files", Some("index.html".into()))));
        assert_eq!(matched(&router, "/heartbeat/extra"), None);
    }

    #[test]
    fn no_backtracking() {
        let mut router = Router::new();
        router.insert("/a/*", "wild");
        router.insert("/a/b/c", "abc");

        assert_eq!(matched(&router, "/a/b/c"), Some(("abc", None)));
        assert_eq!(matched(&router, "/a/x/c"), Some(("wild", Some("x/c".into()))));
        assert_eq!(matched(&router, "/a/b/d"), None);
    }

    #[test]
    fn wildcard_ends_descent() {
        let mut router = Router::new();
        router.insert("/a/*/c", "deep");
        assert_eq!(matched(&router, "/a/x/c"), None);
    }

    #[test]
    fn wildcard_token_is_not_a_literal() {
        let mut router = Router::new();
        router.insert("/files/*", "wild");

        assert_eq!(matched(&router, "/files/*"), Some(("wild", Some("*".into()))));
        assert_eq!(router.remove("/files/*"), Some("wild"));
        assert!(router.is_empty());
    }

    #[test]
    fn reinsert_replaces() {
        let mut router = Router::new();
        assert_eq!(router.insert("/a", "first"), None);
        assert_eq!(router.insert("/a", "second"), Some("first"));
        assert_eq!(matched(&router, "/a"), Some(("second", None)));
        assert_eq!(router.len(), 1);
    }

    #[test]
    fn remove_prunes_dead_branch_only() {
        let mut router = Router::new();
        router.insert("/a/b", "ab");
        router.insert("/a/c", "ac");

        assert_eq!(router.remove("/a/b"), Some("ab"));
        assert_eq!(matched(&router, "/a/b"), None);
        assert_eq!(matched(&router, "/a/c"), Some(("ac", None)));

        let a = router.locate("/a").unwrap();
        assert!(router.node(a).children.contains_key("c"));
        assert!(!router.node(a).children.contains_key("b"));
        assert_eq!(router.free.len(), 1);
    }

    #[test]
    fn remove_prunes_up_to_root() {
        let mut router = Router::new();
        router.insert("/x/y/z", "xyz");
        assert_eq!(router.remove("/x/y/z"), Some("xyz"));

        assert!(router.node(ROOT).is_leaf());
        assert_eq!(router.free.len(), 3);
        assert!(router.is_empty());
    }

    #[test]
    fn remove_keeps_terminal_ancestor() {
        let mut router = Router::new();
        router.insert("/a", "a");
        router.insert("/a/b/c", "abc");

        assert_eq!(router.remove("/a/b/c"), Some("abc"));
        assert_eq!(matched(&router, "/a"), Some(("a", None)));
        assert!(router.node(router.locate("/a").unwrap()).is_leaf());
    }

    #[test]
    fn remove_unknown_or_non_terminal() {
        let mut router = Router::new();
        router.insert("/a/b", "ab");

        assert_eq!(router.remove("/nope"), None);
        assert_eq!(router.remove("/a"), None);
        assert_eq!(matched(&router, "/a/b"), Some(("ab", None)));
    }

    #[test]
    fn freed_slots_are_reused() {
        let mut router = Router::new();
        router.insert("/a/b", "ab");
        router.remove("/a/b");
        let arena = router.nodes.len();

        router.insert("/c/d", "cd");
        assert_eq!(router.nodes.len(), arena);
        assert!(router.free.is_empty());
        assert_eq!(matched(&router, "/c/d"), Some(("cd", None)));
        assert_eq!(matched(&router, "/a/b"), None);
    }

    #[test]
    fn remove_wildcard_route() {
        let mut router = Router::new();
        router.insert("/assets/*", "assets");
        router.insert("/assets/logo.png", "logo");

        assert_eq!(router.remove("/assets/*"), Some("assets"));
        assert_eq!(matched(&router, "/assets/app.js"), None);
        assert_eq!(matched(&router, "/assets/logo.png"), Some(("logo", None)));
    }
}
