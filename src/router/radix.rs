//! Segment-keyed radix tree for parametric and catch-all route matching.
//!
//! One node per path segment. A node can have any number of literal
//! children (keyed by the exact segment string), at most one `:param`
//! child, and at most one `*wildcard` child holding a terminal entry for
//! the rest of the path. Insert/search/remove all operate in segment
//! units — no byte-level prefix compression — because the match semantics
//! (`:` captures one segment, `*` captures the remainder) only compose
//! cleanly at segment boundaries, not at arbitrary string-prefix
//! boundaries (see the routing design notes on this tradeoff).

use std::collections::HashMap;
use std::sync::Arc;

/// A captured `(name, value)` pair, in first-match order.
pub type Captures = Vec<(String, String)>;

struct WildcardChild<T> {
    name: String,
    entry: Arc<T>,
}

pub struct RadixNode<T> {
    children: HashMap<String, RadixNode<T>>,
    param_child: Option<(String, Box<RadixNode<T>>)>,
    wildcard_child: Option<WildcardChild<T>>,
    entry: Option<Arc<T>>,
}

impl<T> Default for RadixNode<T> {
    fn default() -> Self {
        Self {
            children: HashMap::new(),
            param_child: None,
            wildcard_child: None,
            entry: None,
        }
    }
}

/// What kind of segment is being inserted/removed, used to route the
/// operation to the right slot on a node.
pub enum Step<'a> {
    Literal(&'a str),
    Param(&'a str),
    Wildcard(&'a str),
}

impl<T> RadixNode<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `entry` at the end of `steps`. Returns `false` (no-op,
    /// duplicate) if an entry already exists at that exact path.
    pub fn insert(&mut self, steps: &[Step<'_>], entry: Arc<T>) -> bool {
        match steps.split_first() {
            None => {
                if self.entry.is_some() {
                    return false;
                }
                self.entry = Some(entry);
                true
            }
            Some((Step::Literal(seg), rest)) => self
                .children
                .entry(seg.to_string())
                .or_default()
                .insert(rest, entry),
            Some((Step::Param(name), rest)) => {
                let node = match &mut self.param_child {
                    Some((existing_name, node)) => {
                        debug_assert_eq!(existing_name, name, "param name mismatch at same depth");
                        node
                    }
                    None => {
                        self.param_child = Some((name.to_string(), Box::new(RadixNode::new())));
                        &mut self.param_child.as_mut().unwrap().1
                    }
                };
                node.insert(rest, entry)
            }
            Some((Step::Wildcard(name), _rest)) => {
                if self.wildcard_child.is_some() {
                    return false;
                }
                self.wildcard_child = Some(WildcardChild {
                    name: name.to_string(),
                    entry,
                });
                true
            }
        }
    }

    /// Remove the entry at the exact path described by `steps`. Returns
    /// `true` if an entry was removed. Prunes any node left with no entry,
    /// no children, and no param/wildcard child along the way back up.
    pub fn remove(&mut self, steps: &[Step<'_>]) -> bool {
        match steps.split_first() {
            None => {
                let removed = self.entry.take().is_some();
                removed
            }
            Some((Step::Literal(seg), rest)) => {
                let Some(child) = self.children.get_mut(*seg) else {
                    return false;
                };
                let removed = child.remove(rest);
                if removed && child.is_prunable() {
                    self.children.remove(*seg);
                }
                removed
            }
            Some((Step::Param(_), rest)) => {
                let Some((_, node)) = &mut self.param_child else {
                    return false;
                };
                let removed = node.remove(rest);
                if removed && node.is_prunable() {
                    self.param_child = None;
                }
                removed
            }
            Some((Step::Wildcard(_), _rest)) => {
                if self.wildcard_child.is_some() {
                    self.wildcard_child = None;
                    true
                } else {
                    false
                }
            }
        }
    }

    fn is_prunable(&self) -> bool {
        self.entry.is_none()
            && self.children.is_empty()
            && self.param_child.is_none()
            && self.wildcard_child.is_none()
    }

    /// Search for a match against `segments`, appending captures in
    /// first-match order: exact literal child first, then the param
    /// child, then the wildcard child — satisfying "static wins over
    /// parametric wins over catch-all" at every node.
    pub fn search(&self, segments: &[&str], captures: &mut Captures) -> Option<Arc<T>> {
        let Some((first, rest)) = segments.split_first() else {
            if self.entry.is_some() {
                return self.entry.clone();
            }
            if let Some(wc) = &self.wildcard_child {
                captures.push((wc.name.clone(), String::new()));
                return Some(Arc::clone(&wc.entry));
            }
            return None;
        };

        if let Some(child) = self.children.get(*first) {
            if let Some(hit) = child.search(rest, captures) {
                return Some(hit);
            }
        }

        if let Some((name, node)) = &self.param_child {
            captures.push((name.clone(), (*first).to_string()));
            if let Some(hit) = node.search(rest, captures) {
                return Some(hit);
            }
            captures.pop();
        }

        if let Some(wc) = &self.wildcard_child {
            let suffix = segments.join("/");
            captures.push((wc.name.clone(), suffix));
            return Some(Arc::clone(&wc.entry));
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(s: &str) -> Step<'_> {
        Step::Literal(s)
    }
    fn param(s: &str) -> Step<'_> {
        Step::Param(s)
    }
    fn wild(s: &str) -> Step<'_> {
        Step::Wildcard(s)
    }

    #[test]
    fn insert_and_search_literal_path() {
        let mut root = RadixNode::new();
        assert!(root.insert(&[lit("users"), lit("static")], Arc::new(1u32)));
        let mut caps = Captures::new();
        assert_eq!(root.search(&["users", "static"], &mut caps), Some(Arc::new(1)));
        assert!(caps.is_empty());
    }

    #[test]
    fn param_capture() {
        let mut root = RadixNode::new();
        root.insert(&[lit("users"), param("id")], Arc::new(1u32));
        let mut caps = Captures::new();
        let hit = root.search(&["users", "42"], &mut caps);
        assert_eq!(hit, Some(Arc::new(1)));
        assert_eq!(caps, vec![("id".to_string(), "42".to_string())]);
    }

    #[test]
    fn wildcard_captures_remaining_suffix() {
        let mut root = RadixNode::new();
        root.insert(&[lit("files"), wild("path")], Arc::new(1u32));
        let mut caps = Captures::new();
        let hit = root.search(&["files", "img", "logo.png"], &mut caps);
        assert_eq!(hit, Some(Arc::new(1)));
        assert_eq!(caps, vec![("path".to_string(), "img/logo.png".to_string())]);

        let mut caps2 = Captures::new();
        let hit2 = root.search(&["files"], &mut caps2);
        assert_eq!(hit2, Some(Arc::new(1)));
        assert_eq!(caps2, vec![("path".to_string(), "".to_string())]);
    }

    #[test]
    fn duplicate_insert_fails() {
        let mut root = RadixNode::new();
        assert!(root.insert(&[lit("users")], Arc::new(1u32)));
        assert!(!root.insert(&[lit("users")], Arc::new(2u32)));
    }

    #[test]
    fn remove_then_search_misses() {
        let mut root = RadixNode::new();
        root.insert(&[lit("users"), param("id")], Arc::new(1u32));
        assert!(root.remove(&[lit("users"), param("id")]));
        let mut caps = Captures::new();
        assert_eq!(root.search(&["users", "42"], &mut caps), None);
    }

    #[test]
    fn remove_prunes_empty_branches() {
        let mut root = RadixNode::new();
        root.insert(&[lit("a"), lit("b")], Arc::new(1u32));
        assert!(root.remove(&[lit("a"), lit("b")]));
        assert!(root.children.is_empty());
    }

    #[test]
    fn static_beats_param_at_same_depth() {
        let mut root = RadixNode::new();
        root.insert(&[lit("users"), param("id")], Arc::new(1u32));
        root.insert(&[lit("users"), lit("static")], Arc::new(2u32));
        let mut caps = Captures::new();
        let hit = root.search(&["users", "static"], &mut caps);
        assert_eq!(hit, Some(Arc::new(2)));
        assert!(caps.is_empty());
    }

    #[test]
    fn missing_tail_does_not_match_longer_pattern() {
        let mut root = RadixNode::new();
        root.insert(&[lit("api"), param("version"), lit("files"), wild("path")], Arc::new(1u32));
        let mut caps = Captures::new();
        assert_eq!(root.search(&["api", "v2"], &mut caps), None);
    }
}
