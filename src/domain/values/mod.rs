pub mod conversation_stage;
pub mod match_options;
pub mod similarity;
