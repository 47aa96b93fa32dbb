pub mod identity;
pub mod ledger;

pub use identity::{IdentityError, IdentityProvider, OAuthIdentityClient, DEFAULT_USERINFO_URL};
pub use ledger::{ContributionLedger, LedgerError, RpcLedgerClient};
