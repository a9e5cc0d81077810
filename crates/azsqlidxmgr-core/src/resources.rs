//! Resource enumeration seam
//!
//! Each level of the hierarchy is exposed as a lazy stream so pages are only
//! fetched as the traversal reaches them.

use futures::stream::BoxStream;

use crate::error::CoreError;
use crate::model::{Database, ReplicationLink, Server, Subscription};

/// A lazily paginated sequence of resources
pub type ResourceStream<'a, T> = BoxStream<'a, Result<T, CoreError>>;

/// Enumerates subscriptions, servers, databases and replication links
pub trait ResourceProvider: Send + Sync {
    fn subscriptions(&self) -> ResourceStream<'_, Subscription>;

    fn servers<'a>(&'a self, subscription: &'a Subscription) -> ResourceStream<'a, Server>;

    fn databases<'a>(&'a self, server: &'a Server) -> ResourceStream<'a, Database>;

    fn replication_links<'a>(&'a self, database: &'a Database)
    -> ResourceStream<'a, ReplicationLink>;
}
