// Database module
// SQLite holds both the site content tables and the embedding store

pub mod sqlite;

pub use sqlite::*;
