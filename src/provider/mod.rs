/// Provider module
///
/// Facade of the external identity provider the manager renews tokens
/// against. Implementations own the wire protocol; this crate only
/// consumes the capability.
use async_trait::async_trait;

use crate::credentials::token::Token;
use crate::error::TokenError;

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Obtain a credential. Fails with [`TokenError::RequestToken`] on
    /// any transport or authentication failure.
    async fn request_token(&self, force_refresh: bool) -> Result<Token, TokenError>;
}
