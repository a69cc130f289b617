//! Serverless SQL databases

pub mod resource_database;

pub use resource_database::SqlDatabaseResource;
