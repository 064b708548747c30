//! Collaborator Capabilities
//!
//! The orchestrator owns no transport. It is handed:
//! - a `ClusterAdminClient` that runs admin commands and can read the raw
//!   `local.system.replset` document
//! - a `ProgressNotifier` for operator messages and backoff sleeps

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use super::errors::AdminCommandError;
use super::types::Document;

/// Boxed future returned by collaborator traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Result of a single admin round-trip.
pub type CommandResult<T> = Result<T, AdminCommandError>;

/// Connection to a replica set's administrative interface.
pub trait ClusterAdminClient: Send + Sync {
    /// Run a command against the `admin` database.
    fn run_admin_command(&self, command: Document) -> BoxFuture<'_, CommandResult<Document>>;

    /// Read the single document of `local.system.replset`, if any.
    fn read_system_replset(&self) -> BoxFuture<'_, CommandResult<Option<Document>>>;

    /// Connection string, used for display only.
    fn connection_uri(&self) -> String {
        String::from("<unknown>")
    }
}

/// Operator-facing side channel.
pub trait ProgressNotifier: Send + Sync {
    /// Fire-and-forget message to the operator.
    fn print(&self, message: &str);

    /// Suspend the current flow.
    fn sleep(&self, duration: Duration) -> BoxFuture<'_, ()>;
}

/// Notifier that writes to stdout and sleeps on the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl ProgressNotifier for ConsoleNotifier {
    fn print(&self, message: &str) {
        println!("{}", message);
    }

    fn sleep(&self, duration: Duration) -> BoxFuture<'_, ()> {
        Box::pin(tokio::time::sleep(duration))
    }
}
