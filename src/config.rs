//! Configuration file loading.
//!
//! Settings come from a TOML file (default `ragline.toml`). A missing file
//! means defaults; every section and key is optional.

use crate::chunking::{DEFAULT_CHUNK_SIZE, SegmentMode, chunk_budget};
use crate::error::{Error, Result};
use crate::filter::ResultFilter;
use crate::ingest::{IngestOptions, InputType};
use crate::llm::{DEFAULT_BASE_URL, JsonSchema, SamplingParams};
use crate::memory::MemorySettings;
use crate::prompt::OutputType;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "ragline.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Completion endpoint and sampling.
    pub response: ResponseConfig,
    /// Segmentation.
    pub parsing: ParsingConfig,
    /// Conversation memory.
    pub memory: MemoryConfig,
    /// Retrieval limits.
    pub search: SearchConfig,
    /// Answer format.
    pub output: OutputConfig,
}

/// `[response]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseConfig {
    /// Model identifier.
    pub model: String,
    /// Sampling temperature, 0.0 to 2.0.
    pub temperature: f32,
    /// Output token cap.
    pub max_output_tokens: u32,
    /// Nucleus sampling cutoff.
    pub top_p: f32,
    /// OpenAI-compatible endpoint base URL.
    pub base_url: String,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: 1.0,
            max_output_tokens: 1024,
            top_p: 1.0,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

fn default_model() -> String {
    "gpt-4.1-mini".into()
}

/// `[parsing]` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParsingConfig {
    /// Plain-text segmentation mode.
    pub mode: SegmentMode,
    /// Input type, `auto` to pick by extension.
    pub input_type: InputType,
    /// Normalize chunk lengths after segmentation.
    pub enforce_uniform_chunks: bool,
    /// Chunk size in characters.
    pub chunk_size: usize,
    /// Keep the own prose of markdown chapters that are split.
    pub keep_parent_prose: bool,
}

impl Default for ParsingConfig {
    fn default() -> Self {
        Self {
            mode: SegmentMode::Auto,
            input_type: InputType::Auto,
            enforce_uniform_chunks: true,
            chunk_size: DEFAULT_CHUNK_SIZE,
            keep_parent_prose: true,
        }
    }
}

/// `[memory]` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Recent turns kept verbatim.
    pub max_entries: usize,
    /// Relevance-matched turns added to the context.
    pub max_search_results: usize,
    /// Token budget per compacted line.
    pub tokens_per_memory: usize,
    /// Compact turns before persisting.
    pub compaction: bool,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        let settings = MemorySettings::default();
        Self {
            max_entries: settings.max_entries,
            max_search_results: settings.max_search_results,
            tokens_per_memory: settings.tokens_per_memory,
            compaction: settings.compaction,
        }
    }
}

/// `[search]` section.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Token budget over the kept search results.
    pub max_tokens: usize,
    /// Maximum cosine distance of a kept result.
    pub max_distance: f32,
    /// Results requested from the store per query.
    pub max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_tokens: 2048,
            max_distance: 1.2,
            max_results: 96,
        }
    }
}

/// `[output]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Answer format.
    #[serde(rename = "type")]
    pub output_type: OutputType,
    /// JSON schema file, required for `json` output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_path: Option<PathBuf>,
}

impl Config {
    /// Loads configuration from `path`, falling back to defaults if the
    /// file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file cannot be read, parsed or fails
    /// validation.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("cannot read {}: {e}", path.display())))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::config(format!("cannot parse {}: {e}", path.display())))?;

        config.validate()?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first invalid value.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.response.temperature) {
            return Err(Error::config("response.temperature must be between 0.0 and 2.0"));
        }
        if !(0.0..=1.0).contains(&self.response.top_p) {
            return Err(Error::config("response.top_p must be between 0.0 and 1.0"));
        }
        if self.response.max_output_tokens == 0 {
            return Err(Error::config("response.max_output_tokens must be > 0"));
        }
        if self.chunk_budget() == 0 {
            return Err(Error::config(format!(
                "parsing.chunk_size must be at least {} characters",
                crate::tokens::tokens_to_chars(1)
            )));
        }
        if self.memory.max_entries == 0 {
            return Err(Error::config("memory.max_entries must be > 0"));
        }
        if self.memory.compaction && self.memory.tokens_per_memory == 0 {
            return Err(Error::config("memory.tokens_per_memory must be > 0"));
        }
        if self.search.max_distance < 0.0 {
            return Err(Error::config("search.max_distance must not be negative"));
        }
        if self.search.max_results == 0 {
            return Err(Error::config("search.max_results must be > 0"));
        }
        Ok(())
    }

    /// The default configuration as TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn default_toml() -> Result<String> {
        toml::to_string_pretty(&Self::default())
            .map_err(|e| Error::config(format!("cannot serialize configuration: {e}")))
    }

    /// Effective chunk budget derived from `parsing.chunk_size`.
    #[must_use]
    pub const fn chunk_budget(&self) -> usize {
        chunk_budget(self.parsing.chunk_size)
    }

    /// Sampling parameters for answer completions.
    #[must_use]
    pub const fn sampling(&self) -> SamplingParams {
        SamplingParams {
            max_output_tokens: self.response.max_output_tokens,
            temperature: self.response.temperature,
            top_p: self.response.top_p,
        }
    }

    /// Memory limits.
    #[must_use]
    pub const fn memory_settings(&self) -> MemorySettings {
        MemorySettings {
            max_entries: self.memory.max_entries,
            max_search_results: self.memory.max_search_results,
            tokens_per_memory: self.memory.tokens_per_memory,
            compaction: self.memory.compaction,
        }
    }

    /// Search result filter.
    #[must_use]
    pub const fn result_filter(&self) -> ResultFilter {
        ResultFilter::new(self.search.max_distance, self.search.max_tokens)
    }

    /// Ingestion options.
    #[must_use]
    pub const fn ingest_options(&self) -> IngestOptions {
        IngestOptions {
            input_type: self.parsing.input_type,
            mode: self.parsing.mode,
            chunk_budget: self.chunk_budget(),
            enforce_uniform: self.parsing.enforce_uniform_chunks,
            keep_parent_prose: self.parsing.keep_parent_prose,
        }
    }

    /// Loads the output schema when JSON output is configured.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if JSON output has no schema path or the
    /// schema cannot be loaded.
    pub fn json_schema(&self) -> Result<Option<JsonSchema>> {
        if self.output.output_type != OutputType::Json {
            return Ok(None);
        }
        let path = self
            .output
            .schema_path
            .as_ref()
            .ok_or_else(|| Error::config("output.type = \"json\" requires output.schema_path"))?;
        JsonSchema::load(path).map(Some)
    }
}
