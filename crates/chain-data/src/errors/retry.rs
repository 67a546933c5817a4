/// Classification for retry policy.
///
/// Used by the [`ResilientClient`](crate::client::ResilientClient) to decide
/// whether a failed attempt is worth another try.
///
/// | Class | Retry? | Sleep first? |
/// |-------|--------|--------------|
/// | `Never` | No | - |
/// | `WithBackoff` | Yes, while attempts remain | Yes, per [`BackoffPolicy`](crate::backoff::BackoffPolicy) |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// The provider answered and rejected the request, or the answer cannot
    /// be used. Asking again will not change the outcome.
    Never,

    /// Transient failure such as a timeout, a dropped connection, a 5xx or a
    /// rate limit.
    WithBackoff,
}

impl RetryClass {
    pub fn is_retryable(self) -> bool {
        matches!(self, RetryClass::WithBackoff)
    }
}
