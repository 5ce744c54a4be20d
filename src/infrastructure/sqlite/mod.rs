pub mod corpus_store;
pub mod migrations;
