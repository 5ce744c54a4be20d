use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "simmatch", about = "Similarity matching over embedding records")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a record to a group
    Add {
        /// Group (conversation/entity) the record belongs to
        group_key: String,
        /// JSON with fields, metadata, and optionally text (to embed) or vector
        json: String,
    },
    /// Show one record
    Get { id: String },
    /// Merge payload fields/metadata into a record
    Update {
        id: String,
        /// JSON with fields and/or metadata
        json: String,
    },
    /// Attach a vector to a record
    Attach {
        id: String,
        /// JSON array of floats
        vector: String,
    },
    /// Delete a record
    Delete { id: String },
    /// Match records against a query vector
    Match {
        /// JSON array of floats
        vector: String,
        #[arg(long, default_value = "0.7")]
        threshold: f64,
        #[arg(long, default_value = "5")]
        limit: usize,
        /// Deadline for the storage call in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
    /// Embed a text and match records against it
    MatchText {
        text: String,
        #[arg(long, default_value = "0.7")]
        threshold: f64,
        #[arg(long, default_value = "5")]
        limit: usize,
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
    /// Match other groups against a group's latest vector
    History {
        group_key: String,
        #[arg(long, default_value = "0.8")]
        threshold: f64,
        #[arg(long, default_value = "10")]
        limit: usize,
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
    /// Embed records that have no vector yet
    Reindex,
    /// Show corpus statistics
    Stats,
    /// Send a message to the conversational agent
    Converse {
        conversation_id: String,
        message: String,
        /// Current dialogue stage (greeting, collecting_name, ..., closing)
        #[arg(long, default_value = "greeting")]
        stage: String,
    },
    /// Check that the conversational agent is up
    Health,
}
