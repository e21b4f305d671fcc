//! Async HTTP clients for the Nile dashboard.
//!
//! Three remote surfaces share one transport layer:
//!
//! - [`InventoryClient`]: the vendor inventory / authorization API, with
//!   bounded retry on authorization rejections and network failures.
//! - [`KeyStoreClient`]: the backend that stores the user's API keys.
//! - [`CognitoClient`]: the hosted identity provider, behind the
//!   [`IdentityProvider`] trait.
//!
//! Every request takes a [`CancellationToken`](tokio_util::sync::CancellationToken);
//! cancellation surfaces as [`Error::Cancelled`], never as a failure.

pub mod auth;
pub mod error;
pub mod fetch;
pub mod identity;
pub mod inventory;
pub mod keystore;
pub mod retry;
pub mod transport;

pub use auth::ApiCredential;
pub use error::Error;
pub use fetch::RawResponse;
pub use identity::{
    CodeDelivery, CognitoClient, IdentityProvider, SessionTokens, SignUpOutcome, TokenClaims,
    UserAttribute, UserProfile,
};
pub use inventory::{ClientPageQuery, InventoryClient};
pub use keystore::KeyStoreClient;
pub use retry::{BackoffRange, RetryPolicy, Sleeper, TokioSleeper};
pub use transport::{TlsMode, TransportConfig};
