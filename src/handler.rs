//! Handler trait and type erasure.
//!
//! # How async handlers are stored
//!
//! A route's chain is a `Vec` of handlers of potentially different
//! concrete types — middleware closures, named `async fn`s, whatever the
//! caller registered. Rust collections can only hold one concrete type, so
//! we use **trait objects** (`dyn ErasedHandler`) to hide the concrete
//! handler type behind a common interface and store everything uniformly.
//!
//! The chain from user code to vtable call is:
//!
//! ```text
//! async fn hello(ctx: Context) -> Context { … }     ← user writes this
//!        ↓ router.get("/", hello)
//! hello.into_boxed_handler()                        ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(hello))                        ← heap-allocated wrapper
//!        ↓  stored as BoxedHandler = Arc<dyn ErasedHandler>
//! handler.call(ctx)  at request time                ← one vtable dispatch
//!        ↓
//! Box::pin(async { hello(ctx).await })              ← BoxFuture
//! ```
//!
//! The only runtime cost per handler in the chain is **one Arc clone**
//! (atomic inc) + **one virtual call** — negligible compared to network I/O.
//! `Context` itself is threaded through by value; see its module docs for
//! why that shape, rather than `&mut Context`, is what makes storing
//! handlers behind `dyn` possible at all.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::Context;

// ── Internal types ────────────────────────────────────────────────────────────

/// A heap-allocated, type-erased future that resolves to the (possibly
/// further-mutated) [`Context`] handed back up the chain.
pub(crate) type BoxFuture = Pin<Box<dyn Future<Output = Context> + Send + 'static>>;

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// return type of the public `Handler` trait's `into_boxed_handler` method.
/// External crates cannot usefully interact with this trait.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, ctx: Context) -> BoxFuture;
}

/// A heap-allocated, type-erased handler shared across concurrent requests.
///
/// `#[doc(hidden)] pub` for the same reason as `ErasedHandler`. `Arc` gives
/// cheap, thread-safe shared ownership (one atomic reference count
/// increment per handler per request) without copying the handler.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid route handler or middleware function.
///
/// You never implement this yourself. It is automatically satisfied for any
/// `async fn` with the signature:
///
/// ```text
/// async fn name(ctx: Context) -> Context
/// ```
///
/// A handler that wants to run logic both before and after the rest of the
/// chain calls `ctx.next().await` and keeps working with the `Context` it
/// gets back; one that wants to short-circuit calls [`Context::abort`]
/// instead of (or before) calling `next`.
///
/// The trait is **sealed** (via the private `Sealed` supertrait): only the
/// blanket impl below can satisfy it. This prevents accidental misuse and
/// keeps the API surface stable across versions.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

/// The sealing module. Because `Sealed` is private, external crates cannot
/// name it and therefore cannot implement `Handler` on their own types.
mod private {
    pub trait Sealed {}
}

// ── Blanket implementations ───────────────────────────────────────────────────

/// Implement the sealing trait for any function with the right signature.
///
/// `Fn(Context) -> Fut` covers:
///   - named `async fn` items
///   - `async` closures (when they stabilise)
///   - any struct that implements `Fn`
impl<F, Fut> private::Sealed for F
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Context> + Send + 'static,
{
}

/// Implement `Handler` for any function with the right signature.
impl<F, Fut> Handler for F
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Context> + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

// ── Concrete wrapper ──────────────────────────────────────────────────────────

/// Newtype wrapper that holds a concrete handler `F` and implements
/// [`ErasedHandler`], bridging the typed world to the trait-object world.
struct FnHandler<F>(F);

impl<F, Fut> ErasedHandler for FnHandler<F>
where
    F: Fn(Context) -> Fut + Send + Sync,
    Fut: Future<Output = Context> + Send + 'static,
{
    fn call(&self, ctx: Context) -> BoxFuture {
        Box::pin((self.0)(ctx))
    }
}
