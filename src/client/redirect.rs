//! Redirect policy (spec §6): `follow=false` leaves the first redirect in
//! place (the caller sees the 3xx response as-is); `Handlers` can veto any
//! hop, and a veto always stops following regardless of how many handlers
//! are registered (the spec leaves multi-handler disagreement undefined —
//! DESIGN.md records this as a decided Open Question: any veto wins).

use std::sync::Arc;

use crate::client::response::ClientResponse;

pub type RedirectHandler = Arc<dyn Fn(&ClientResponse) -> bool + Send + Sync>;

/// `MaxHops == 0` is treated as "effectively 10", per spec §6.
pub const DEFAULT_MAX_HOPS: u32 = 10;

#[derive(Clone)]
pub struct RedirectPolicy {
    pub follow: bool,
    pub max_hops: u32,
    pub handlers: Vec<RedirectHandler>,
}

impl RedirectPolicy {
    pub fn follow(max_hops: u32) -> Self {
        Self { follow: true, max_hops: if max_hops == 0 { DEFAULT_MAX_HOPS } else { max_hops }, handlers: Vec::new() }
    }

    pub fn none() -> Self {
        Self { follow: false, max_hops: 0, handlers: Vec::new() }
    }

    pub fn with_handler(mut self, f: impl Fn(&ClientResponse) -> bool + Send + Sync + 'static) -> Self {
        self.handlers.push(Arc::new(f));
        self
    }

    /// Whether following should continue past `resp`: every handler must
    /// allow it (any veto stops following).
    pub(crate) fn permits(&self, resp: &ClientResponse) -> bool {
        self.handlers.iter().all(|h| h(resp))
    }
}

impl Default for RedirectPolicy {
    fn default() -> Self {
        Self::follow(DEFAULT_MAX_HOPS)
    }
}

pub(crate) fn is_redirect(status: http::StatusCode) -> bool {
    status.is_redirection()
}

pub(crate) fn location(resp: &ClientResponse) -> Option<String> {
    resp.headers().get(http::header::LOCATION)?.to_str().ok().map(str::to_string)
}
