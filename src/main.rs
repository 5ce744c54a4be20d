use clap::Parser;
use serde::Serialize;
use simmatch::cli::commands::{Cli, Commands};
use simmatch::config::Settings;
use simmatch::domain::entities::embedding_record::Payload;
use simmatch::domain::values::conversation_stage::ConversationStage;
use simmatch::domain::values::match_options::MatchOptions;
use simmatch::{logging, SimMatch};
use std::time::Duration;

#[tokio::main]
async fn main() {
    let settings = match Settings::from_env() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading configuration: {e}");
            std::process::exit(1);
        }
    };
    logging::init(&settings.log_level);

    let cli = Cli::parse();
    let sm = match SimMatch::new(&settings) {
        Ok(sm) => sm,
        Err(e) => {
            eprintln!("Error initializing simmatch: {e}");
            std::process::exit(1);
        }
    };

    let result = run_command(sm, cli.command).await;
    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run_command(sm: SimMatch, cmd: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        Commands::Add { group_key, json } => {
            let data: serde_json::Value = serde_json::from_str(&json)?;
            let payload = parse_payload(&data)?;
            let text = data["text"].as_str().map(String::from);
            let vector = data
                .get("vector")
                .filter(|v| !v.is_null())
                .map(|v| serde_json::from_value::<Vec<f32>>(v.clone()))
                .transpose()?;
            let record = sm.add_record(group_key, payload, text, vector).await?;
            print_json(&record)?;
        }
        Commands::Get { id } => {
            print_json(&sm.get_record(&id).await?)?;
        }
        Commands::Update { id, json } => {
            let data: serde_json::Value = serde_json::from_str(&json)?;
            let record = sm.update_payload(&id, parse_payload(&data)?).await?;
            print_json(&record)?;
        }
        Commands::Attach { id, vector } => {
            let vector: Vec<f32> = serde_json::from_str(&vector)?;
            print_json(&sm.attach_vector(&id, vector).await?)?;
        }
        Commands::Delete { id } => {
            sm.delete_record(&id).await?;
            println!("Deleted {id}");
        }
        Commands::Match {
            vector,
            threshold,
            limit,
            timeout_ms,
        } => {
            let vector: Vec<f32> = serde_json::from_str(&vector)?;
            let options = match_options(threshold, limit, timeout_ms);
            print_json(&sm.match_by_vector(&vector, options).await?)?;
        }
        Commands::MatchText {
            text,
            threshold,
            limit,
            timeout_ms,
        } => {
            let options = match_options(threshold, limit, timeout_ms);
            print_json(&sm.match_by_text(&text, options).await?)?;
        }
        Commands::History {
            group_key,
            threshold,
            limit,
            timeout_ms,
        } => {
            let options = match_options(threshold, limit, timeout_ms);
            print_json(&sm.match_by_group_history(&group_key, options).await?)?;
        }
        Commands::Reindex => {
            let count = sm.reindex().await?;
            println!("Reindexed {count} records");
        }
        Commands::Stats => {
            print_json(&sm.stats().await?)?;
        }
        Commands::Converse {
            conversation_id,
            message,
            stage,
        } => {
            let stage: ConversationStage = stage.parse().map_err(|e: String| e)?;
            let turn = sm.converse(conversation_id, message, stage).await?;
            print_json(&turn)?;
        }
        Commands::Health => {
            if sm.agent_health().await? {
                println!("Agent is healthy");
            } else {
                return Err("Agent health check failed".into());
            }
        }
    }
    Ok(())
}

fn match_options(threshold: f64, limit: usize, timeout_ms: Option<u64>) -> MatchOptions {
    let options = MatchOptions::new(threshold, limit);
    match timeout_ms {
        Some(ms) => options.with_timeout(Duration::from_millis(ms)),
        None => options,
    }
}

fn parse_payload(data: &serde_json::Value) -> Result<Payload, Box<dyn std::error::Error>> {
    let mut payload = Payload::new();
    if let Some(fields) = data.get("fields").and_then(|f| f.as_object()) {
        for (name, value) in fields {
            let text = value
                .as_str()
                .ok_or_else(|| format!("Field '{name}' must be a string"))?;
            payload.fields.insert(name.clone(), text.to_string());
        }
    }
    if let Some(metadata) = data.get("metadata") {
        payload.metadata = metadata
            .as_object()
            .cloned()
            .ok_or("metadata must be a JSON object")?;
    }
    Ok(payload)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
