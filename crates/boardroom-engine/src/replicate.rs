//! Post-commit replication sinks for the engine binary.
//!
//! The production sink mirrors the data directory into a git repository
//! after every commit, so the company's public record survives restarts
//! and can be watched from anywhere git can reach. Replication is
//! best-effort by contract: every failure here is logged upstream and
//! ignored.

use std::path::PathBuf;

use tokio::process::Command;
use tracing::debug;

use boardroom_core::replicate::{ReplicationError, ReplicationSink};
use boardroom_types::{CompanyState, EventRecord};

/// The sink the engine wires in, chosen by configuration.
pub enum Replicator {
    /// Mirror the data directory into a git repository.
    Git(GitReplicator),
    /// Replication disabled; publishing is a no-op.
    Disabled,
}

impl ReplicationSink for Replicator {
    async fn publish(
        &self,
        state: &CompanyState,
        history: &[EventRecord],
    ) -> Result<(), ReplicationError> {
        match self {
            Self::Git(git) => git.publish(state, history).await,
            Self::Disabled => Ok(()),
        }
    }
}

/// Publishes the committed documents by running `git add/commit/push`
/// in the repository holding the data directory.
pub struct GitReplicator {
    repo_dir: PathBuf,
}

impl GitReplicator {
    /// Create a replicator running git in the given directory.
    pub const fn new(repo_dir: PathBuf) -> Self {
        Self { repo_dir }
    }

    /// Run one git subcommand, mapping any failure to a sink error.
    async fn git(&self, args: &[&str]) -> Result<std::process::Output, ReplicationError> {
        Command::new("git")
            .current_dir(&self.repo_dir)
            .args(args)
            .output()
            .await
            .map_err(|e| ReplicationError(format!("git {} failed to spawn: {e}", args.join(" "))))
    }

    async fn publish(
        &self,
        _state: &CompanyState,
        history: &[EventRecord],
    ) -> Result<(), ReplicationError> {
        let add = self.git(&["add", "-A"]).await?;
        if !add.status.success() {
            return Err(ReplicationError(format!(
                "git add exited with {}: {}",
                add.status,
                String::from_utf8_lossy(&add.stderr)
            )));
        }

        let subject = history
            .first()
            .map_or_else(|| String::from("Update company records"), |r| r.title.clone());
        let commit = self.git(&["commit", "-m", &subject]).await?;
        if !commit.status.success() {
            let stdout = String::from_utf8_lossy(&commit.stdout);
            // An unchanged tree is not a failure; the documents were
            // already mirrored.
            if stdout.contains("nothing to commit") {
                debug!("replication skipped, tree unchanged");
                return Ok(());
            }
            return Err(ReplicationError(format!(
                "git commit exited with {}: {}",
                commit.status,
                String::from_utf8_lossy(&commit.stderr)
            )));
        }

        let push = self.git(&["push"]).await?;
        if !push.status.success() {
            return Err(ReplicationError(format!(
                "git push exited with {}: {}",
                push.status,
                String::from_utf8_lossy(&push.stderr)
            )));
        }

        debug!(subject = %subject, "replication pushed");
        Ok(())
    }
}
