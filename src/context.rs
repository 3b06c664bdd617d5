use crate::record::WebRequestDetail;
use std::cell::RefCell;
use std::sync::Arc;

/// Snapshot of the request-scoped values attached to errors and log lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub user: Option<String>,
    pub web_request: Option<WebRequestDetail>,
    pub transaction_id: Option<String>,
}

/// Read-only source of request-scoped context.
///
/// Every lookup is optional: an absent value is simply left out of the
/// produced record.
pub trait ContextProvider: Send + Sync {
    fn current_user(&self) -> Option<String>;
    fn current_web_request(&self) -> Option<WebRequestDetail>;
    fn current_transaction_id(&self) -> Option<String>;

    /// Whether this provider is linked to an active APM trace. Only
    /// consulted by [`LinkedContext`].
    fn is_linked(&self) -> bool {
        true
    }
}

/// Provider that never has any context.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoContext;

impl ContextProvider for NoContext {
    fn current_user(&self) -> Option<String> {
        None
    }

    fn current_web_request(&self) -> Option<WebRequestDetail> {
        None
    }

    fn current_transaction_id(&self) -> Option<String> {
        None
    }

    fn is_linked(&self) -> bool {
        false
    }
}

/// Provider returning the same snapshot for every lookup.
#[derive(Debug, Clone, Default)]
pub struct StaticContext(pub RequestContext);

impl ContextProvider for StaticContext {
    fn current_user(&self) -> Option<String> {
        self.0.user.clone()
    }

    fn current_web_request(&self) -> Option<WebRequestDetail> {
        self.0.web_request.clone()
    }

    fn current_transaction_id(&self) -> Option<String> {
        self.0.transaction_id.clone()
    }
}

thread_local! {
    static CURRENT: RefCell<Vec<RequestContext>> = const { RefCell::new(Vec::new()) };
}

/// Thread-scoped context. Request handlers call [`ThreadContext::enter`]
/// and keep the guard alive for the duration of the request; lookups made
/// on the same thread see the innermost entered context.
///
/// The guard is `!Send` and must not be held across an `.await`: a Tokio
/// task can resume on another worker thread. Async handlers should give
/// the adapter a per-request [`StaticContext`] or their own task-local
/// [`ContextProvider`] instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadContext;

impl ThreadContext {
    pub fn enter(ctx: RequestContext) -> ContextGuard {
        CURRENT.with(|stack| stack.borrow_mut().push(ctx));
        ContextGuard { _not_send: std::marker::PhantomData }
    }

    fn with_current<T>(f: impl FnOnce(&RequestContext) -> Option<T>) -> Option<T> {
        CURRENT
            .try_with(|stack| stack.borrow().last().and_then(f))
            .ok()
            .flatten()
    }
}

impl ContextProvider for ThreadContext {
    fn current_user(&self) -> Option<String> {
        Self::with_current(|ctx| ctx.user.clone())
    }

    fn current_web_request(&self) -> Option<WebRequestDetail> {
        Self::with_current(|ctx| ctx.web_request.clone())
    }

    fn current_transaction_id(&self) -> Option<String> {
        Self::with_current(|ctx| ctx.transaction_id.clone())
    }

    fn is_linked(&self) -> bool {
        CURRENT
            .try_with(|stack| !stack.borrow().is_empty())
            .unwrap_or(false)
    }
}

/// Pops the context pushed by [`ThreadContext::enter`] when dropped.
#[must_use = "the context is left as soon as the guard is dropped"]
pub struct ContextGuard {
    // Must be dropped on the thread that entered it.
    _not_send: std::marker::PhantomData<*const ()>,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        let _ = CURRENT.try_with(|stack| stack.borrow_mut().pop());
    }
}

/// Reads from an APM-linked provider while it reports itself linked and
/// from a fallback provider otherwise.
#[derive(Clone)]
pub struct LinkedContext {
    apm: Arc<dyn ContextProvider>,
    fallback: Arc<dyn ContextProvider>,
}

impl LinkedContext {
    pub fn new(apm: Arc<dyn ContextProvider>, fallback: Arc<dyn ContextProvider>) -> Self {
        Self { apm, fallback }
    }

    fn active(&self) -> &dyn ContextProvider {
        if self.apm.is_linked() {
            self.apm.as_ref()
        } else {
            self.fallback.as_ref()
        }
    }
}

impl ContextProvider for LinkedContext {
    fn current_user(&self) -> Option<String> {
        self.active().current_user()
    }

    fn current_web_request(&self) -> Option<WebRequestDetail> {
        self.active().current_web_request()
    }

    fn current_transaction_id(&self) -> Option<String> {
        self.active().current_transaction_id()
    }

    fn is_linked(&self) -> bool {
        self.apm.is_linked()
    }
}
