//! Three-tier method matcher.
//!
//! Every HTTP method gets its own [`MethodTier`]: a static path map for
//! literal routes, a set of parametric radix trees bucketed by segment
//! count, and a single wildcard radix tree. Lookup tries them in that
//! order — static wins over parametric wins over catch-all — and stops at
//! the first hit.
//!
//! Bucketing parametric routes by segment count means `/users/:id` (2
//! segments) and `/users/:id/posts/:pid` (4 segments) live in different
//! trees; a request path only ever walks the one tree whose segment count
//! matches it, rather than probing every registered depth.
//!
//! # Locking
//!
//! Each method gets its own `RwLock`, discovered through an outer `RwLock`
//! keyed by [`Method`]. Registering a brand-new method takes the outer
//! write lock just long enough to insert an empty tier; every other
//! operation — registration on an existing method, removal, lookup — only
//! ever touches the per-method lock. Two lookups against different
//! methods (or the same method) never block each other; a write to `POST`
//! never blocks a concurrent read of `GET`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use http::Method;

use crate::error::Error;
use crate::handler::BoxedHandler;
use crate::router::pattern::{self, Pattern};
use crate::router::radix::{Captures, RadixNode, Step};

/// A single registered route: its validated pattern and the handler chain
/// (group middleware, followed by the terminal handler) that will run when
/// it matches.
pub struct RouteEntry {
    pub pattern: Pattern,
    pub chain: Vec<BoxedHandler>,
}

#[derive(Default)]
struct MethodTier {
    static_routes: HashMap<String, Arc<RouteEntry>>,
    parametric: HashMap<usize, RadixNode<RouteEntry>>,
    wildcard: RadixNode<RouteEntry>,
}

/// The result of a successful lookup: the matched route and the path
/// parameters captured along the way, in first-match order.
pub struct Matched {
    pub route: Arc<RouteEntry>,
    pub params: Captures,
}

/// Monotonic hit/miss/timing counters for a matcher. Not promised to be
/// exact under concurrent updates (spec §9 open question), only to never go
/// backwards — plain `Relaxed` atomics are enough for that.
#[derive(Default)]
pub struct MatcherStats {
    hits: AtomicU64,
    misses: AtomicU64,
    total_lookup_nanos: AtomicU64,
}

impl MatcherStats {
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Sum of every lookup's wall time, in nanoseconds. Divide by
    /// `hits() + misses()` for a mean; there is no histogram here, just the
    /// running total the spec's open question asks for.
    pub fn total_lookup_nanos(&self) -> u64 {
        self.total_lookup_nanos.load(Ordering::Relaxed)
    }
}

/// The full routing table, one [`MethodTier`] per HTTP method.
pub struct Matcher {
    tiers: RwLock<HashMap<Method, Arc<RwLock<MethodTier>>>>,
    stats: MatcherStats,
}

impl Matcher {
    pub fn new() -> Self {
        Self {
            tiers: RwLock::new(HashMap::new()),
            stats: MatcherStats::default(),
        }
    }

    pub fn stats(&self) -> &MatcherStats {
        &self.stats
    }

    fn tier_for(&self, method: &Method) -> Arc<RwLock<MethodTier>> {
        if let Some(tier) = self.tiers.read().unwrap().get(method) {
            return Arc::clone(tier);
        }
        let mut tiers = self.tiers.write().unwrap();
        Arc::clone(
            tiers
                .entry(method.clone())
                .or_insert_with(|| Arc::new(RwLock::new(MethodTier::default()))),
        )
    }

    /// Validates `raw`, then registers it against `method` with the given
    /// handler chain. Fails on a malformed pattern or an exact duplicate
    /// `(method, pattern)` pair; never fails at lookup time.
    pub fn register(&self, method: Method, raw: &str, chain: Vec<BoxedHandler>) -> Result<(), Error> {
        let pat = pattern::parse(raw)?;
        let tier = self.tier_for(&method);
        let mut tier = tier.write().unwrap();

        let entry = Arc::new(RouteEntry {
            pattern: pat.clone(),
            chain,
        });

        if pat.is_static() {
            let key = pat.raw.clone();
            if tier.static_routes.contains_key(&key) {
                return Err(Error::DuplicateRoute {
                    method,
                    pattern: raw.to_string(),
                });
            }
            tier.static_routes.insert(key, entry);
            return Ok(());
        }

        let steps = to_steps(&pat);
        let inserted = if pat.has_wildcard() {
            tier.wildcard.insert(&steps, entry)
        } else {
            tier.parametric
                .entry(pat.segment_count())
                .or_default()
                .insert(&steps, entry)
        };

        if !inserted {
            return Err(Error::DuplicateRoute {
                method,
                pattern: raw.to_string(),
            });
        }
        Ok(())
    }

    /// Removes a previously registered `(method, pattern)` pair. Returns
    /// `true` if a route was removed.
    pub fn remove(&self, method: &Method, raw: &str) -> Result<bool, Error> {
        let pat = pattern::parse(raw)?;
        let Some(tier) = self.tiers.read().unwrap().get(method).cloned() else {
            return Ok(false);
        };
        let mut tier = tier.write().unwrap();

        if pat.is_static() {
            return Ok(tier.static_routes.remove(&pat.raw).is_some());
        }

        let steps = to_steps(&pat);
        if pat.has_wildcard() {
            Ok(tier.wildcard.remove(&steps))
        } else {
            let Some(tree) = tier.parametric.get_mut(&pat.segment_count()) else {
                return Ok(false);
            };
            Ok(tree.remove(&steps))
        }
    }

    /// Resolves `method` + a raw request target (path, optionally followed
    /// by `?query` and/or `#fragment`) to a matched route.
    ///
    /// The fragment (anything from the first `#` onward) is discarded
    /// before matching, per the URL spec — it is never sent to the server
    /// by a conforming client, but we strip it defensively. The query
    /// string, if present, is returned unparsed alongside the match so the
    /// caller can run it through [`crate::query::parse`] only once a route
    /// was actually found.
    pub fn lookup<'a>(&self, method: &Method, target: &'a str) -> Option<(Matched, Option<&'a str>)> {
        let started = Instant::now();
        let result = self.lookup_inner(method, target);
        self.stats.total_lookup_nanos.fetch_add(started.elapsed().as_nanos() as u64, Ordering::Relaxed);
        if result.is_some() {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.stats.misses.fetch_add(1, Ordering::Relaxed);
        }
        result
    }

    fn lookup_inner<'a>(&self, method: &Method, target: &'a str) -> Option<(Matched, Option<&'a str>)> {
        let without_fragment = target.split('#').next().unwrap_or(target);
        let (path, query) = match without_fragment.split_once('?') {
            Some((p, q)) => (p, Some(q)),
            None => (without_fragment, None),
        };

        let tier = self.tiers.read().unwrap().get(method).cloned()?;
        let tier = tier.read().unwrap();

        if let Some(entry) = tier.static_routes.get(path) {
            return Some((
                Matched {
                    route: Arc::clone(entry),
                    params: Vec::new(),
                },
                query,
            ));
        }

        let segments: Vec<&str> = path
            .trim_start_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();

        if let Some(tree) = tier.parametric.get(&segments.len()) {
            let mut captures = Captures::new();
            if let Some(route) = tree.search(&segments, &mut captures) {
                return Some((
                    Matched {
                        route,
                        params: captures,
                    },
                    query,
                ));
            }
        }

        let mut captures = Captures::new();
        if let Some(route) = tier.wildcard.search(&segments, &mut captures) {
            return Some((
                Matched {
                    route,
                    params: captures,
                },
                query,
            ));
        }

        None
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new()
    }
}

fn to_steps(pattern: &Pattern) -> Vec<Step<'_>> {
    pattern
        .segments
        .iter()
        .map(|s| match s {
            crate::router::pattern::Segment::Literal(s) => Step::Literal(s),
            crate::router::pattern::Segment::Param(s) => Step::Param(s),
            crate::router::pattern::Segment::Wildcard(s) => Step::Wildcard(s),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;

    fn noop_chain() -> Vec<BoxedHandler> {
        use crate::handler::Handler;
        async fn h(ctx: Context) -> Context {
            ctx
        }
        vec![h.into_boxed_handler()]
    }

    #[test]
    fn registers_and_matches_static_route() {
        let m = Matcher::new();
        m.register(Method::GET, "/health", noop_chain()).unwrap();
        let (matched, query) = m.lookup(&Method::GET, "/health?x=1").unwrap();
        assert!(matched.params.is_empty());
        assert_eq!(query, Some("x=1"));
    }

    #[test]
    fn registers_and_matches_parametric_route() {
        let m = Matcher::new();
        m.register(Method::GET, "/users/:id", noop_chain()).unwrap();
        let (matched, _) = m.lookup(&Method::GET, "/users/42").unwrap();
        assert_eq!(matched.params, vec![("id".to_string(), "42".to_string())]);
    }

    #[test]
    fn strips_fragment_before_matching() {
        let m = Matcher::new();
        m.register(Method::GET, "/docs", noop_chain()).unwrap();
        assert!(m.lookup(&Method::GET, "/docs#section-1").is_some());
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let m = Matcher::new();
        m.register(Method::GET, "/users/:id", noop_chain()).unwrap();
        let err = m.register(Method::GET, "/users/:other", noop_chain());
        assert!(matches!(err, Err(Error::DuplicateRoute { .. })));
    }

    #[test]
    fn same_pattern_different_methods_does_not_collide() {
        let m = Matcher::new();
        m.register(Method::GET, "/users/:id", noop_chain()).unwrap();
        assert!(m.register(Method::POST, "/users/:id", noop_chain()).is_ok());
    }

    #[test]
    fn remove_then_lookup_misses() {
        let m = Matcher::new();
        m.register(Method::GET, "/users/:id", noop_chain()).unwrap();
        assert!(m.remove(&Method::GET, "/users/:id").unwrap());
        assert!(m.lookup(&Method::GET, "/users/42").is_none());
    }

    #[test]
    fn static_wins_over_parametric_at_same_segment_count() {
        let m = Matcher::new();
        m.register(Method::GET, "/users/:id", noop_chain()).unwrap();
        m.register(Method::GET, "/users/me", noop_chain()).unwrap();
        let (matched, _) = m.lookup(&Method::GET, "/users/me").unwrap();
        assert!(matched.params.is_empty());
    }

    #[test]
    fn wildcard_matches_when_no_static_or_parametric_tier_fits() {
        let m = Matcher::new();
        m.register(Method::GET, "/files/*path", noop_chain()).unwrap();
        let (matched, _) = m.lookup(&Method::GET, "/files/a/b/c.txt").unwrap();
        assert_eq!(matched.params, vec![("path".to_string(), "a/b/c.txt".to_string())]);
    }

    #[test]
    fn stats_are_monotonic_across_hits_and_misses() {
        let m = Matcher::new();
        m.register(Method::GET, "/health", noop_chain()).unwrap();
        m.lookup(&Method::GET, "/health");
        m.lookup(&Method::GET, "/missing");
        m.lookup(&Method::GET, "/health");
        assert_eq!(m.stats().hits(), 2);
        assert_eq!(m.stats().misses(), 1);
    }
}
