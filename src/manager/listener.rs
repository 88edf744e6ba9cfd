use crate::credentials::token::Token;
use crate::error::TokenError;

type OnNext = Box<dyn Fn(Token) -> anyhow::Result<()> + Send + Sync>;
type OnError = Box<dyn Fn(&TokenError) + Send + Sync>;

/// Consumer-supplied callbacks notified on credential events.
///
/// Own the listener in an `Arc` and hand the manager a reference at
/// `start`; the manager keeps only a `Weak`, so dropping the owning
/// `Arc` silently ends deliveries. A panicking callback propagates
/// into the renewal task; the manager does not catch it.
#[derive(Default)]
pub struct CredentialsListener {
    on_next: Option<OnNext>,
    on_error: Option<OnError>,
}

impl CredentialsListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called with every renewed token, taking ownership of it.
    /// Returning an error fails the cycle with
    /// [`TokenError::TokenRenewal`].
    pub fn with_on_next(
        mut self,
        callback: impl Fn(Token) -> anyhow::Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.on_next = Some(Box::new(callback));
        self
    }

    /// Called once when a renewal cycle fails terminally.
    pub fn with_on_error(mut self, callback: impl Fn(&TokenError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Box::new(callback));
        self
    }

    /// Invokes `on_next` if registered; `None` when no slot is set.
    pub(crate) fn notify_next(&self, token: Token) -> Option<anyhow::Result<()>> {
        self.on_next.as_ref().map(|callback| callback(token))
    }

    /// Invokes `on_error` if registered; reports whether a callback
    /// consumed the error.
    pub(crate) fn notify_error(&self, err: &TokenError) -> bool {
        match &self.on_error {
            Some(callback) => {
                callback(err);
                true
            }
            None => false,
        }
    }
}
