use std::sync::{Arc, Weak};
use std::time::Duration;

use anyhow::anyhow;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::credentials::token::{Token, TokenResponse};
use crate::error::TokenError;
use crate::helpers::time::now_ms;
use crate::manager::config::TokenManagerConfig;
use crate::manager::listener::CredentialsListener;
use crate::manager::schedule::renewal_delay;
use crate::provider::IdentityProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Created,
    Running,
    Stopped,
}

/// Mutable state shared between the manager facade, the renewal task
/// and stop handles. Locks are held only for field access, never
/// across an await.
struct ManagerState {
    phase: Phase,
    retries: u32,
    listener: Option<Weak<CredentialsListener>>,
    renewal_task: Option<JoinHandle<()>>,
}

/// Scheduler that keeps a credential fresh by renewing it before it
/// expires and notifying the registered listener.
///
/// Lifecycle is `Created -> Running -> Stopped`; `start` is valid once,
/// `stop` from anywhere and repeatedly. Dropping the manager stops it.
pub struct TokenManager {
    provider: Arc<dyn IdentityProvider>,
    config: TokenManagerConfig,
    state: Arc<Mutex<ManagerState>>,
    cancel: CancellationToken,
}

impl TokenManager {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        config: TokenManagerConfig,
    ) -> Result<Self, TokenError> {
        config.validate()?;
        Ok(Self {
            provider,
            config,
            state: Arc::new(Mutex::new(ManagerState {
                phase: Phase::Created,
                retries: 0,
                listener: None,
                renewal_task: None,
            })),
            cancel: CancellationToken::new(),
        })
    }

    /// One-shot acquisition with the configured retry policy.
    ///
    /// Independent of the renewal loop: may run concurrently with it
    /// and stays available after the manager went idle or was stopped.
    pub async fn acquire_token(&self, force_refresh: bool) -> Result<TokenResponse, TokenError> {
        acquire_with_retry(
            self.provider.as_ref(),
            &self.config,
            &self.state,
            force_refresh,
            None,
        )
        .await
    }

    /// Transition `Created -> Running` and arm the first renewal cycle
    /// to fire after `initial_delay`.
    ///
    /// With `block_for_initial` the call returns only once that first
    /// cycle has completed, successfully or not. The manager stores a
    /// `Weak` to `listener`: dropping the owning `Arc` ends deliveries.
    /// The returned handle is equivalent to calling [`Self::stop`].
    pub async fn start(
        &self,
        listener: &Arc<CredentialsListener>,
        block_for_initial: bool,
        initial_delay: Duration,
    ) -> Result<StopHandle, TokenError> {
        let (init_tx, init_rx) = oneshot::channel();

        {
            let mut state = self.state.lock();
            match state.phase {
                Phase::Created => {}
                Phase::Running => {
                    return Err(TokenError::InvalidState("token manager is already started"))
                }
                Phase::Stopped => return Err(TokenError::InvalidState("token manager is stopped")),
            }
            state.phase = Phase::Running;
            state.listener = Some(Arc::downgrade(listener));

            let ctx = RenewalContext {
                provider: self.provider.clone(),
                config: self.config.clone(),
                state: self.state.clone(),
                cancel: self.cancel.clone(),
            };
            state.renewal_task = Some(tokio::spawn(run_renewal_loop(ctx, initial_delay, init_tx)));
        }

        if block_for_initial {
            // Resolves when the first cycle completes; a stop in the
            // meantime drops the sender and unblocks as well.
            let _ = init_rx.await;
        }

        Ok(StopHandle {
            state: self.state.clone(),
            cancel: self.cancel.clone(),
        })
    }

    /// Cancel pending renewal work and transition to `Stopped`.
    ///
    /// Idempotent, non-blocking and callable from any task. An
    /// in-flight provider call is not interrupted, but nothing is
    /// delivered or re-armed once the flag is set.
    pub fn stop(&self) {
        stop_manager(&self.state, &self.cancel);
    }
}

impl Drop for TokenManager {
    fn drop(&mut self) {
        stop_manager(&self.state, &self.cancel);
    }
}

/// Handle returned by [`TokenManager::start`]. Cloneable; stopping
/// through it is equivalent to stopping the manager itself.
#[derive(Clone)]
pub struct StopHandle {
    state: Arc<Mutex<ManagerState>>,
    cancel: CancellationToken,
}

impl StopHandle {
    pub fn stop(&self) {
        stop_manager(&self.state, &self.cancel);
    }
}

fn stop_manager(state: &Mutex<ManagerState>, cancel: &CancellationToken) {
    let mut state = state.lock();
    if state.phase == Phase::Stopped {
        return;
    }
    state.phase = Phase::Stopped;
    // Wakes the renewal task out of its timer; an in-flight cycle runs
    // to completion but neither delivers nor re-arms.
    cancel.cancel();
    state.renewal_task = None;
    debug!("token manager stopped");
}

/// Everything the background renewal task needs. Holds no reference to
/// the manager facade, so pending work never keeps the manager alive.
struct RenewalContext {
    provider: Arc<dyn IdentityProvider>,
    config: TokenManagerConfig,
    state: Arc<Mutex<ManagerState>>,
    cancel: CancellationToken,
}

/// Timer chain driving the renewal cycles. One cycle in flight at a
/// time; the next is armed only after the previous one finished its
/// delivery or error path.
async fn run_renewal_loop(
    ctx: RenewalContext,
    initial_delay: Duration,
    init_tx: oneshot::Sender<()>,
) {
    let mut delay = initial_delay;
    let mut init_tx = Some(init_tx);

    loop {
        tokio::select! {
            _ = ctx.cancel.cancelled() => break,
            _ = sleep(delay) => {}
        }

        let outcome = renew_once(&ctx).await;

        if let Some(tx) = init_tx.take() {
            let _ = tx.send(());
        }

        match outcome {
            Ok(Some(next)) => {
                if ctx.cancel.is_cancelled() {
                    break;
                }
                debug!(delay_ms = next.as_millis() as u64, "next renewal armed");
                delay = next;
            }
            Ok(None) => {
                debug!("renewal chain complete, no further cycles");
                break;
            }
            Err(err) => {
                // No live error callback to hand this to.
                error!("unhandled token renewal failure: {err}");
                break;
            }
        }
    }
}

/// One renewal cycle: acquire, validate, deliver, compute next delay.
/// `Ok(Some(delay))` arms the next cycle, `Ok(None)` ends the chain,
/// `Err` is a terminal failure nobody listened to.
async fn renew_once(ctx: &RenewalContext) -> Result<Option<Duration>, TokenError> {
    info!("token renewal cycle start");

    let acquired = acquire_with_retry(
        ctx.provider.as_ref(),
        &ctx.config,
        &ctx.state,
        true,
        Some(&ctx.cancel),
    )
    .await;

    let response = match acquired {
        Ok(response) => response,
        Err(err) => return deliver_error(ctx, err),
    };

    let token = response.into_token();
    let delay = token
        .expires_at_ms()
        .map(|expires_at| renewal_delay(&ctx.config, expires_at, token.received_at_ms(), now_ms()));

    // A token born expired is useless even though the provider call
    // nominally succeeded.
    if token.is_expired() {
        return deliver_error(
            ctx,
            TokenError::TokenRenewal("requested token is already expired".to_owned()),
        );
    }

    if ctx.cancel.is_cancelled() {
        // Stopped while the request was in flight.
        return Ok(None);
    }

    let Some(listener) = live_listener(&ctx.state) else {
        debug!("credentials listener is gone, skipping delivery");
        return Ok(None);
    };

    match listener.notify_next(token) {
        None => {
            debug!("no on_next callback registered, skipping delivery");
            return Ok(None);
        }
        Some(Err(err)) => {
            return deliver_error(
                ctx,
                TokenError::TokenRenewal(format!("on_next callback failed: {err}")),
            );
        }
        Some(Ok(())) => {}
    }

    match delay {
        Some(delay) if delay > Duration::ZERO => Ok(Some(delay)),
        Some(_) => {
            warn!("renewal point already passed, leaving the manager idle");
            Ok(None)
        }
        None => {
            info!("token never expires, no further renewal scheduled");
            Ok(None)
        }
    }
}

/// Terminal-failure path: hand the error to a live `on_error` callback,
/// or bubble it to the cycle driver when none is registered.
fn deliver_error(ctx: &RenewalContext, err: TokenError) -> Result<Option<Duration>, TokenError> {
    if ctx.cancel.is_cancelled() {
        return Ok(None);
    }
    match live_listener(&ctx.state) {
        Some(listener) if listener.notify_error(&err) => Ok(None),
        _ => Err(err),
    }
}

fn live_listener(state: &Mutex<ManagerState>) -> Option<Arc<CredentialsListener>> {
    state.lock().listener.as_ref().and_then(Weak::upgrade)
}

/// Provider request with the policy-driven retry loop around it.
///
/// The attempt counter is shared between the renewal task and direct
/// `acquire_token` callers and resets on every success, so a fresh
/// failure streak gets the full budget again. When `cancel` is given
/// the backoff sleep aborts early on stop.
async fn acquire_with_retry(
    provider: &dyn IdentityProvider,
    config: &TokenManagerConfig,
    state: &Mutex<ManagerState>,
    force_refresh: bool,
    cancel: Option<&CancellationToken>,
) -> Result<TokenResponse, TokenError> {
    let max_attempts = config.retry_policy.max_attempts;
    let retry_delay = config.retry_policy.delay;

    loop {
        match request_once(provider, config, force_refresh).await {
            Ok(token) => {
                state.lock().retries = 0;
                return Ok(TokenResponse::new(token));
            }
            Err(err @ TokenError::RequestToken(_)) => {
                let exhausted = {
                    let mut st = state.lock();
                    if st.retries < max_attempts {
                        st.retries += 1;
                        warn!(
                            "token request attempt {}/{} failed: {err}",
                            st.retries, max_attempts
                        );
                        false
                    } else {
                        true
                    }
                };
                if exhausted {
                    error!("token request failed after {max_attempts} retries: {err}");
                    return Err(err);
                }
                match cancel {
                    Some(cancel) => {
                        tokio::select! {
                            _ = cancel.cancelled() => return Err(err),
                            _ = sleep(retry_delay) => {}
                        }
                    }
                    None => sleep(retry_delay).await,
                }
            }
            Err(err) => return Err(err),
        }
    }
}

async fn request_once(
    provider: &dyn IdentityProvider,
    config: &TokenManagerConfig,
    force_refresh: bool,
) -> Result<Token, TokenError> {
    if config.request_execution_timeout.is_zero() {
        return provider.request_token(force_refresh).await;
    }
    match timeout(
        config.request_execution_timeout,
        provider.request_token(force_refresh),
    )
    .await
    {
        Ok(result) => result,
        Err(_) => Err(TokenError::RequestToken(anyhow!(
            "identity provider request exceeded {} ms",
            config.request_execution_timeout.as_millis()
        ))),
    }
}
