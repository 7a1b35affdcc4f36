//! Build sessions: stale builds never overwrite fresher results.
//!
//! Every build takes a ticket. Starting a build invalidates all earlier
//! tickets, and a build finishing with a stale ticket reports
//! [`ProfileError::Superseded`] instead of its record.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::models::CountryProfileRecord;

use super::{ProfileAssembler, ProfileError, ProfileResult};

/// Proof that a build was started, carrying its generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildTicket {
    generation: u64,
}

impl BuildTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Hands out monotonically increasing build tickets.
#[derive(Debug, Default)]
pub struct BuildSession {
    generation: AtomicU64,
}

impl BuildSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a build, invalidating every earlier ticket.
    pub fn begin(&self) -> BuildTicket {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        BuildTicket { generation }
    }

    pub fn is_current(&self, ticket: &BuildTicket) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket.generation
    }

    /// Pass `result` through if `ticket` is still current.
    pub fn finish<T>(&self, ticket: BuildTicket, result: ProfileResult<T>) -> ProfileResult<T> {
        if self.is_current(&ticket) {
            result
        } else {
            tracing::debug!(
                generation = ticket.generation,
                current = self.generation.load(Ordering::SeqCst),
                "discarding superseded build"
            );
            Err(ProfileError::Superseded)
        }
    }
}

/// An assembler paired with a build session.
#[derive(Debug)]
pub struct ProfileSession {
    assembler: Arc<ProfileAssembler>,
    session: BuildSession,
}

impl ProfileSession {
    pub fn new(assembler: Arc<ProfileAssembler>) -> Self {
        Self {
            assembler,
            session: BuildSession::new(),
        }
    }

    pub fn assembler(&self) -> &ProfileAssembler {
        &self.assembler
    }

    /// Assemble a profile. Fails with `Superseded` if another build started meanwhile.
    pub async fn build(&self, scope_id: &str, reporting_year: i32) -> ProfileResult<CountryProfileRecord> {
        let ticket = self.session.begin();
        let result = self.assembler.assemble(scope_id, reporting_year).await;
        self.session.finish(ticket, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tickets_increase() {
        let session = BuildSession::new();
        let first = session.begin();
        let second = session.begin();
        assert!(second.generation() > first.generation());
    }

    #[test]
    fn test_newer_ticket_supersedes_older() {
        let session = BuildSession::new();
        let old = session.begin();
        let new = session.begin();

        assert!(!session.is_current(&old));
        assert!(session.is_current(&new));
        assert!(matches!(session.finish(old, Ok(1)), Err(ProfileError::Superseded)));
        assert_eq!(session.finish(new, Ok(2)).unwrap(), 2);
    }

    #[test]
    fn test_stale_error_is_also_superseded() {
        let session = BuildSession::new();
        let old = session.begin();
        let _new = session.begin();

        let failed: ProfileResult<()> = Err(ProfileError::Config(
            crate::config::ConfigError::Invalid("broken".into()),
        ));
        let result = session.finish(old, failed);
        assert!(matches!(result, Err(ProfileError::Superseded)));
    }
}
