//! Typed facades over the Scaleway REST API and its AWS-compatible endpoints

pub mod account;
pub mod aws;
pub mod billing;
pub mod client;
pub mod common;
pub mod edge_services;
pub mod error;
pub mod file;
pub mod function;
pub mod inference;
pub mod mnq;
pub mod registry;
pub mod sdb;

pub use client::Client;
pub use error::ApiError;
