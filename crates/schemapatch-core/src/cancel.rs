//! Cooperative cancellation
//!
//! The generator is synchronous, so it only polls the token between CRDs and
//! between writes.

pub use tokio_util::sync::CancellationToken;

use crate::error::{PatchError, Result};

/// Turn a cancelled token into [`PatchError::Cancelled`]
pub trait CancellationCheck {
    fn check(&self) -> Result<()>;
}

impl CancellationCheck for CancellationToken {
    fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(PatchError::Cancelled)
        } else {
            Ok(())
        }
    }
}
