pub mod agent_port;
pub mod corpus_store;
pub mod embedding_port;
pub mod vector_index;
