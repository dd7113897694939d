//! Tier-scoped configuration parameter lookups.

use crate::error::ClientResult;
use async_trait::async_trait;

/// Source of tier configuration parameters.
///
/// Vendor metadata occasionally lives on the reseller tier rather than the
/// record itself; this seam answers "what is parameter `name` for tier
/// account X on product Y". Lookup failures and absent parameters are both
/// answered with `None` by implementations that prefer degradation over
/// failure; the HTTP implementation reports transport errors and leaves the
/// degradation decision to the caller.
#[async_trait]
pub trait TierParameterSource: Send + Sync {
    /// Resolves a configuration parameter scoped to (tier account, product).
    async fn tier_parameter(
        &self,
        account_id: &str,
        product_id: &str,
        parameter: &str,
    ) -> ClientResult<Option<String>>;
}
