//! CLI command implementations.
//!
//! Contains the business logic for each CLI command.

use crate::assistant::Assistant;
use crate::cli::output::{
    OutputFormat, format_answer, format_chunks, format_ingest, format_memory,
    format_search_results, format_status,
};
use crate::cli::parser::{Cli, Commands};
use crate::chunking::SegmentMode;
use crate::config::Config;
use crate::error::{CommandError, Result, StorageError};
use crate::ingest::{Ingestor, InputType};
use crate::llm::OpenAiCompleter;
use crate::memory::MemoryAssembler;
use crate::search::SearchEngine;
use crate::storage::{DOCUMENTS_COLLECTION, MEMORY_COLLECTION, SqliteVectorStore, VectorStore};
use regex::RegexBuilder;
use std::path::Path;

/// Executes the CLI command.
///
/// # Arguments
///
/// * `cli` - Parsed CLI arguments.
///
/// # Returns
///
/// Result with output string on success.
///
/// # Errors
///
/// Returns an error if the command fails to execute.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);
    let db_path = cli.get_db_path();

    match &cli.command {
        Commands::Init { force } => cmd_init(&db_path, *force),
        Commands::Status => cmd_status(&db_path, format),
        Commands::Reset {
            memory,
            documents,
            yes,
        } => cmd_reset(&db_path, *memory, *documents, *yes),
        Commands::Chunk {
            file,
            mode,
            input_type,
            chunk_size,
            no_normalize,
        } => {
            let mut config = load_config(cli)?;
            apply_parsing_overrides(&mut config, *mode, *input_type);
            if let Some(size) = chunk_size {
                config.parsing.chunk_size = *size;
            }
            if *no_normalize {
                config.parsing.enforce_uniform_chunks = false;
            }
            cmd_chunk(&config, file, format)
        }
        Commands::Ingest {
            file,
            mode,
            input_type,
        } => {
            let mut config = load_config(cli)?;
            apply_parsing_overrides(&mut config, *mode, *input_type);
            cmd_ingest(&db_path, &config, file, format)
        }
        Commands::Search {
            query,
            max_distance,
            max_tokens,
        } => {
            let mut config = load_config(cli)?;
            if let Some(distance) = max_distance {
                config.search.max_distance = *distance;
            }
            if let Some(tokens) = max_tokens {
                config.search.max_tokens = *tokens;
            }
            cmd_search(&db_path, &config, &query.join(" "), format)
        }
        Commands::Ask { query } => {
            let config = load_config(cli)?;
            cmd_ask(&db_path, config, &query.join(" "), format)
        }
        Commands::Memory { filter, last } => {
            cmd_memory(&db_path, filter.as_deref(), *last, format)
        }
        Commands::Config => Config::default_toml(),
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let config = Config::load_from(cli.get_config_path())?;
    Ok(config)
}

fn apply_parsing_overrides(
    config: &mut Config,
    mode: Option<SegmentMode>,
    input_type: Option<InputType>,
) {
    if let Some(mode) = mode {
        config.parsing.mode = mode;
    }
    if let Some(input_type) = input_type {
        config.parsing.input_type = input_type;
    }
}

/// Opens the store and ensures it's initialized.
fn open_store(db_path: &Path) -> Result<SqliteVectorStore> {
    let store = SqliteVectorStore::open(db_path)?;

    if !store.is_initialized()? {
        return Err(StorageError::NotInitialized.into());
    }

    Ok(store)
}

// ==================== Command Implementations ====================

fn cmd_init(db_path: &Path, force: bool) -> Result<String> {
    if db_path.exists() && !force {
        return Err(CommandError::ExecutionFailed(
            "Database already exists. Use --force to reinitialize.".to_string(),
        )
        .into());
    }

    if force && db_path.exists() {
        std::fs::remove_file(db_path).map_err(|e| {
            CommandError::ExecutionFailed(format!("Failed to remove existing database: {e}"))
        })?;
    }

    let mut store = SqliteVectorStore::open(db_path)?;
    store.init()?;

    Ok(format!(
        "Initialized ragline database at: {}\n",
        db_path.display()
    ))
}

fn cmd_status(db_path: &Path, format: OutputFormat) -> Result<String> {
    let store = open_store(db_path)?;
    let stats = store.stats()?;
    Ok(format_status(&stats, format))
}

fn cmd_reset(db_path: &Path, memory: bool, documents: bool, yes: bool) -> Result<String> {
    if !yes {
        return Err(CommandError::ExecutionFailed(
            "Use --yes to confirm reset. This will delete stored data.".to_string(),
        )
        .into());
    }

    let mut store = open_store(db_path)?;
    let (collection, label) = match (memory, documents) {
        (true, _) => (Some(MEMORY_COLLECTION), "memory"),
        (_, true) => (Some(DOCUMENTS_COLLECTION), "documents"),
        _ => (None, "all data"),
    };
    store.reset(collection)?;

    Ok(format!("Reset {label}.\n"))
}

fn cmd_chunk(config: &Config, file: &Path, format: OutputFormat) -> Result<String> {
    config.validate()?;
    let prepared = Ingestor::new(config.ingest_options()).prepare_path(file)?;
    Ok(format_chunks(&prepared.documents, format))
}

fn cmd_ingest(db_path: &Path, config: &Config, file: &Path, format: OutputFormat) -> Result<String> {
    config.validate()?;
    let mut store = open_store(db_path)?;
    let prepared = Ingestor::new(config.ingest_options()).prepare_path(file)?;
    let count = prepared.write_to(&mut store)?;
    Ok(format_ingest(&file.display().to_string(), count, format))
}

fn cmd_search(db_path: &Path, config: &Config, query: &str, format: OutputFormat) -> Result<String> {
    config.validate()?;
    let store = open_store(db_path)?;
    let engine = SearchEngine::new(config.result_filter(), config.search.max_results);
    let result = engine.search_one(&store, query)?;
    Ok(format_search_results(&result, query, format))
}

fn cmd_ask(db_path: &Path, config: Config, query: &str, format: OutputFormat) -> Result<String> {
    let store = open_store(db_path)?;
    let completer =
        OpenAiCompleter::from_env(config.response.base_url.as_str(), config.response.model.as_str())?;
    let mut assistant = Assistant::new(config, Box::new(store), Box::new(completer))?;
    let answer = assistant.ask(query)?;
    Ok(format_answer(&answer, format))
}

fn cmd_memory(
    db_path: &Path,
    filter: Option<&str>,
    last: Option<usize>,
    format: OutputFormat,
) -> Result<String> {
    let store = open_store(db_path)?;
    let mut turns = MemoryAssembler::persisted_turns(&store)?;

    if let Some(pattern) = filter {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| CommandError::InvalidArgument(format!("Invalid regex: {e}")))?;
        turns.retain(|turn| regex.is_match(&turn.query) || regex.is_match(&turn.response));
    }

    if let Some(n) = last {
        let skip = turns.len().saturating_sub(n);
        turns.drain(..skip);
    }

    Ok(format_memory(&turns, format))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Metadata;
    use tempfile::TempDir;

    fn cli(dir: &TempDir, command: Commands) -> Cli {
        Cli {
            db_path: Some(dir.path().join("ragline.db")),
            config: Some(dir.path().join("ragline.toml")),
            verbose: false,
            format: "text".to_string(),
            command,
        }
    }

    fn init(dir: &TempDir) {
        execute(&cli(dir, Commands::Init { force: false })).unwrap();
    }

    #[test]
    fn test_init_twice_requires_force() {
        let dir = TempDir::new().unwrap();
        init(&dir);
        assert!(execute(&cli(&dir, Commands::Init { force: false })).is_err());
        assert!(execute(&cli(&dir, Commands::Init { force: true })).is_ok());
    }

    #[test]
    fn test_status_requires_init() {
        let dir = TempDir::new().unwrap();
        let err = execute(&cli(&dir, Commands::Status)).unwrap_err();
        assert!(err.to_string().contains("not initialized"));
    }

    #[test]
    fn test_ingest_search_reset() {
        let dir = TempDir::new().unwrap();
        init(&dir);
        let file = dir.path().join("facts.txt");
        std::fs::write(&file, "Paris is the capital of France.\n\nBread is baked.").unwrap();

        let out = execute(&cli(
            &dir,
            Commands::Ingest {
                file,
                mode: Some(SegmentMode::ByBlankLine),
                input_type: None,
            },
        ))
        .unwrap();
        assert!(out.starts_with("Ingested"));

        let out = execute(&cli(
            &dir,
            Commands::Search {
                query: vec!["capital".into(), "of".into(), "France".into()],
                max_distance: Some(2.0),
                max_tokens: None,
            },
        ))
        .unwrap();
        assert!(out.contains("facts:"));

        execute(&cli(
            &dir,
            Commands::Reset {
                memory: false,
                documents: true,
                yes: true,
            },
        ))
        .unwrap();
        let store = open_store(&dir.path().join("ragline.db")).unwrap();
        assert_eq!(store.count(DOCUMENTS_COLLECTION).unwrap(), 0);
    }

    #[test]
    fn test_reset_requires_yes() {
        let dir = TempDir::new().unwrap();
        init(&dir);
        let reset = Commands::Reset {
            memory: false,
            documents: false,
            yes: false,
        };
        assert!(execute(&cli(&dir, reset)).is_err());
    }

    #[test]
    fn test_chunk_does_not_need_store() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("notes.txt");
        std::fs::write(&file, "first\nsecond\nthird").unwrap();

        let out = execute(&cli(
            &dir,
            Commands::Chunk {
                file,
                mode: Some(SegmentMode::ByNewline),
                input_type: None,
                chunk_size: None,
                no_normalize: true,
            },
        ))
        .unwrap();
        assert!(out.ends_with("3 chunks\n"));
    }

    #[test]
    fn test_memory_filter() {
        let dir = TempDir::new().unwrap();
        init(&dir);
        let mut store = open_store(&dir.path().join("ragline.db")).unwrap();
        let metadatas: Vec<Metadata> = ["user", "assistant"]
            .iter()
            .map(|role| {
                let mut meta = Metadata::new();
                meta.insert("role".into(), (*role).into());
                meta.insert("turn_id".into(), 1.into());
                meta
            })
            .collect();
        store
            .upsert(
                MEMORY_COLLECTION,
                &["turn-1-user".to_string(), "turn-1-assistant".to_string()],
                &["Capital of France?".to_string(), "Paris.".to_string()],
                Some(metadatas.as_slice()),
            )
            .unwrap();
        drop(store);

        let matching = execute(&cli(
            &dir,
            Commands::Memory {
                filter: Some("PARIS".into()),
                last: None,
            },
        ))
        .unwrap();
        assert!(matching.contains("[1] assistant: Paris."));

        let none = execute(&cli(
            &dir,
            Commands::Memory {
                filter: Some("rome".into()),
                last: None,
            },
        ))
        .unwrap();
        assert_eq!(none, "No memory entries.\n");

        let invalid = execute(&cli(
            &dir,
            Commands::Memory {
                filter: Some("(".into()),
                last: None,
            },
        ));
        assert!(invalid.is_err());
    }

    #[test]
    fn test_config_prints_defaults() {
        let dir = TempDir::new().unwrap();
        let out = execute(&cli(&dir, Commands::Config)).unwrap();
        assert!(out.contains("[memory]"));
    }
}
