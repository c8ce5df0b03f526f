//! MongoDB driver collaborator
//!
//! Opens connections with the official `mongodb` crate and hands out
//! [`MongoCollection`] handles.

mod collection;
mod connector;

pub use collection::MongoCollection;
pub use connector::{MongoConnection, MongoDriver};

// Re-export MongoDB types for convenience
pub use mongodb::{Client, Collection, Database, bson::Document};
