//! Chain-status collaborator.
//!
//! The reconciler only ever asks one question: has this signature, sent by
//! this owner, reached finality? Transport, RPC endpoints and the custodial
//! keypair live behind the trait.

use async_trait::async_trait;
use stakeline_types::{Result, TxSignature, UserId};

/// Finality lookups against the settlement chain.
#[async_trait]
pub trait ChainStatus: Send + Sync {
    /// `Ok(true)` once finalized, `Ok(false)` while not yet.
    ///
    /// # Errors
    /// Returns [`stakeline_types::StakelineError::ChainStatus`] when the
    /// lookup itself failed. The caller must not treat that as either answer.
    async fn is_finalized(&self, signature: &TxSignature, owner: &UserId) -> Result<bool>;
}

#[cfg(any(test, feature = "test-helpers"))]
pub use scripted::InMemoryChain;

#[cfg(any(test, feature = "test-helpers"))]
mod scripted {
    use std::collections::{HashMap, HashSet};
    use std::sync::{Mutex, MutexGuard, PoisonError};

    use async_trait::async_trait;
    use stakeline_types::{Result, StakelineError, TxSignature, UserId};

    use super::ChainStatus;

    #[derive(Debug, Default)]
    struct Script {
        finalized: HashSet<TxSignature>,
        failing: HashSet<TxSignature>,
        lookups: HashMap<TxSignature, usize>,
    }

    /// Scripted chain for tests. Unknown signatures are not finalized.
    #[derive(Debug, Default)]
    pub struct InMemoryChain {
        script: Mutex<Script>,
    }

    impl InMemoryChain {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Report `signature` as finalized from now on.
        pub fn finalize(&self, signature: &TxSignature) {
            let mut script = self.lock();
            script.failing.remove(signature);
            script.finalized.insert(signature.clone());
        }

        /// Make lookups of `signature` fail until it is finalized.
        pub fn fail(&self, signature: &TxSignature) {
            self.lock().failing.insert(signature.clone());
        }

        /// How many times `signature` was looked up.
        pub fn lookups(&self, signature: &TxSignature) -> usize {
            self.lock().lookups.get(signature).copied().unwrap_or(0)
        }

        fn lock(&self) -> MutexGuard<'_, Script> {
            self.script.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    #[async_trait]
    impl ChainStatus for InMemoryChain {
        async fn is_finalized(&self, signature: &TxSignature, _owner: &UserId) -> Result<bool> {
            let mut script = self.lock();
            *script.lookups.entry(signature.clone()).or_default() += 1;
            if script.failing.contains(signature) {
                return Err(StakelineError::ChainStatus {
                    reason: format!("lookup of {signature} timed out"),
                });
            }
            Ok(script.finalized.contains(signature))
        }
    }
}
