//! Side effect descriptions returned by reducers.

use std::future::Future;
use std::pin::Pin;

/// Describes a side effect to be executed by the store runtime.
///
/// Effects are NOT executed immediately. They are values returned from a
/// reducer and run by the store *after* the mutation that produced them has
/// durably committed, which is exactly why a notification failure can
/// never roll back state.
///
/// # Type Parameters
///
/// - `Action`: the action type an effect can produce (feedback loop)
pub enum Effect<Action> {
    /// No-op effect.
    None,

    /// Arbitrary async computation.
    ///
    /// Returns `Option<Action>` - if `Some`, the action is fed back into
    /// the reducer as its own, later mutation. This is how the results of
    /// external calls (membership checks, broadcast sends) re-enter the
    /// store without ever holding its lock.
    Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),
}

// Manual Debug implementation since Future doesn't implement Debug
impl<Action> std::fmt::Debug for Effect<Action> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Effect::None => write!(f, "Effect::None"),
            Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
        }
    }
}

impl<Action> Effect<Action> {
    /// Wraps an async computation into an effect.
    pub fn future<F>(fut: F) -> Self
    where
        F: Future<Output = Option<Action>> + Send + 'static,
    {
        Effect::Future(Box::pin(fut))
    }

    /// Whether this effect does nothing.
    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Effect::None)
    }
}
