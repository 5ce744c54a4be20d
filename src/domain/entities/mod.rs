pub mod embedding_record;
pub mod match_result;
