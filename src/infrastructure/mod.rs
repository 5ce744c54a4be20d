pub mod agent;
pub mod embeddings;
pub mod index;
pub mod memory;
pub mod sqlite;
