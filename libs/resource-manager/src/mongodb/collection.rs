use async_trait::async_trait;
use mongodb::{
    Collection, Database,
    bson::{Document, doc},
};
use std::any::Any;

use crate::driver::CollectionHandle;
use crate::error::DriverResult;

/// Collection handle backed by the MongoDB driver
///
/// Retrieve it from a [`SharedHandle`](crate::SharedHandle) with
/// `handle.as_any().downcast_ref::<MongoCollection>()` to run queries.
#[derive(Debug, Clone)]
pub struct MongoCollection {
    database: Database,
    collection: Collection<Document>,
}

impl MongoCollection {
    pub fn new(database: Database, collection_name: &str) -> Self {
        let collection = database.collection::<Document>(collection_name);
        Self {
            database,
            collection,
        }
    }

    /// Get the underlying collection for queries
    pub fn collection(&self) -> &Collection<Document> {
        &self.collection
    }

    /// The same collection deserializing into `T`
    pub fn typed<T: Send + Sync>(&self) -> Collection<T> {
        self.collection.clone_with_type()
    }

    pub fn database(&self) -> &Database {
        &self.database
    }
}

#[async_trait]
impl CollectionHandle for MongoCollection {
    fn database_name(&self) -> &str {
        self.database.name()
    }

    fn collection_name(&self) -> &str {
        self.collection.name()
    }

    async fn ping(&self) -> DriverResult<()> {
        self.database.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
