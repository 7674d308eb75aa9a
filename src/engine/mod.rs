//! Database Engine Module

pub mod crud;
pub mod database;
pub mod metadata;
pub mod persistence;

pub use database::Database;
pub use metadata::Catalog;
