pub mod corpus_store;
