//! End-to-end pipeline.
//!
//! [`Assistant`] owns the store, the completion endpoint and the memory
//! assembler, and runs ingestion and question answering against them.

use crate::config::Config;
use crate::core::{Message, MemoryTurn, RetrievalResult};
use crate::error::Result;
use crate::ingest::{Ingestor, PreparedDocuments};
use crate::llm::{Completer, CompletionRequest, JsonSchema};
use crate::memory::MemoryAssembler;
use crate::prompt::{Answer, PromptParts, build_system_prompt};
use crate::search::SearchEngine;
use crate::storage::VectorStore;
use std::path::Path;

/// Retrieval-augmented assistant.
pub struct Assistant {
    config: Config,
    store: Box<dyn VectorStore>,
    completer: Box<dyn Completer>,
    memory: MemoryAssembler,
    schema: Option<JsonSchema>,
}

impl Assistant {
    /// Creates an assistant. The store is initialized if needed and memory
    /// numbering continues after the turns already persisted.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the output schema
    /// cannot be loaded or the store cannot be initialized.
    pub fn new(
        config: Config,
        mut store: Box<dyn VectorStore>,
        completer: Box<dyn Completer>,
    ) -> Result<Self> {
        config.validate()?;
        let schema = config.json_schema()?;
        if !store.is_initialized()? {
            store.init()?;
        }
        let memory = MemoryAssembler::resume(config.memory_settings(), store.as_ref())?;

        Ok(Self {
            config,
            store,
            completer,
            memory,
            schema,
        })
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// The backing store.
    #[must_use]
    pub fn store(&self) -> &dyn VectorStore {
        self.store.as_ref()
    }

    /// Conversation memory.
    #[must_use]
    pub const fn memory(&self) -> &MemoryAssembler {
        &self.memory
    }

    /// Prepares `path` and writes its documents to the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the input cannot be prepared or stored.
    pub fn ingest<P: AsRef<Path>>(&mut self, path: P) -> Result<usize> {
        let prepared = Ingestor::new(self.config.ingest_options()).prepare_path(path)?;
        self.store_documents(&prepared)
    }

    /// Writes already prepared documents to the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store write fails.
    pub fn store_documents(&mut self, prepared: &PreparedDocuments) -> Result<usize> {
        prepared.write_to(self.store.as_mut())
    }

    /// Retrieves filtered documents for `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store query fails.
    pub fn search(&self, query: &str) -> Result<RetrievalResult> {
        self.engine().search_one(self.store.as_ref(), query)
    }

    /// Answers `query` from the stored documents and conversation memory,
    /// then records the turn.
    ///
    /// # Errors
    ///
    /// Returns an error if retrieval, the completion call or recording the
    /// turn fails.
    pub fn ask(&mut self, query: &str) -> Result<Answer> {
        let results = self.search(query)?;
        let recent = self.memory.recent_transcript();
        let system_prompt = build_system_prompt(&PromptParts {
            output_type: self.config.output.output_type,
            schema: self.schema.as_ref(),
            results: &results,
            recent_memories: &recent,
            query,
        });

        let mut context = self
            .memory
            .build_context(self.store.as_ref(), &system_prompt, query)?;
        context.push(Message::user(query));
        let request = CompletionRequest::from_context(context, self.config.sampling())
            .with_schema(self.schema.clone());

        tracing::info!(
            hits = results.len(),
            messages = request.messages.len(),
            "requesting answer"
        );
        let text = self.completer.complete(&request)?;

        self.memory.record_turn(
            self.store.as_mut(),
            self.completer.as_ref(),
            MemoryTurn::completed(query, text.clone()),
        )?;

        Ok(Answer::decode(text, self.schema.is_some()))
    }

    fn engine(&self) -> SearchEngine {
        SearchEngine::new(self.config.result_filter(), self.config.search.max_results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Role;
    use crate::llm::testing::ScriptedCompleter;
    use crate::prompt::OutputType;
    use crate::storage::{DOCUMENTS_COLLECTION, MEMORY_COLLECTION, SqliteVectorStore};
    use std::sync::Arc;

    /// Shares one scripted completer between the assistant and the test.
    struct Shared(Arc<ScriptedCompleter>);

    impl Completer for Shared {
        fn model(&self) -> &str {
            self.0.model()
        }

        fn complete(&self, request: &CompletionRequest) -> Result<String> {
            self.0.complete(request)
        }
    }

    fn assistant(config: Config, replies: &[&str]) -> (Assistant, Arc<ScriptedCompleter>) {
        let completer = Arc::new(ScriptedCompleter::new(replies.iter().copied()));
        let store = Box::new(SqliteVectorStore::in_memory().unwrap());
        let assistant =
            Assistant::new(config, store, Box::new(Shared(Arc::clone(&completer)))).unwrap();
        (assistant, completer)
    }

    fn write_facts(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("facts.txt");
        std::fs::write(
            &path,
            "Paris is the capital of France.\n\nRome is the capital of Italy.",
        )
        .unwrap();
        path
    }

    fn uncompacted() -> Config {
        let mut config = Config::default();
        config.memory.compaction = false;
        config.parsing.enforce_uniform_chunks = false;
        config.search.max_distance = 2.0;
        config
    }

    #[test]
    fn test_ingest_then_search() {
        let dir = tempfile::tempdir().unwrap();
        let (mut assistant, _) = assistant(uncompacted(), &[]);

        assert_eq!(assistant.ingest(write_facts(dir.path())).unwrap(), 2);
        assert_eq!(assistant.store().count(DOCUMENTS_COLLECTION).unwrap(), 2);

        let hits = assistant.search("capital of France").unwrap();
        assert_eq!(hits.ids()[0], "facts:1");
    }

    #[test]
    fn test_reingest_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_facts(dir.path());
        let (mut assistant, _) = assistant(uncompacted(), &[]);

        assistant.ingest(&path).unwrap();
        assistant.ingest(&path).unwrap();
        assert_eq!(assistant.store().count(DOCUMENTS_COLLECTION).unwrap(), 2);
    }

    #[test]
    fn test_ask_builds_prompt_and_records_turn() {
        let dir = tempfile::tempdir().unwrap();
        let (mut assistant, completer) = assistant(uncompacted(), &["Paris."]);
        assistant.ingest(write_facts(dir.path())).unwrap();

        let answer = assistant.ask("What is the capital of France?").unwrap();
        assert_eq!(answer, Answer::Text("Paris.".into()));

        let requests = completer.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert!(request.system_prompt.contains("Paris is the capital of France."));
        assert!(request.system_prompt.contains("Latest User-Query: What is the capital of France?"));
        assert_eq!(request.messages.last().unwrap().role, Role::User);
        assert!(request.json_schema.is_none());
        drop(requests);

        assert_eq!(assistant.store().count(MEMORY_COLLECTION).unwrap(), 2);
        assert_eq!(assistant.memory().recent().count(), 1);
    }

    #[test]
    fn test_second_question_sees_first_turn() {
        let (mut assistant, completer) = assistant(uncompacted(), &["Paris.", "About 2 million."]);

        assistant.ask("What is the capital of France?").unwrap();
        assistant.ask("How many people live there?").unwrap();

        let requests = completer.requests.lock().unwrap();
        let second = &requests[1];
        assert!(second.system_prompt.contains("What is the capital of France?\nParis."));
        assert_eq!(second.messages[0], Message::user("What is the capital of France?"));
        assert_eq!(second.messages[1], Message::assistant("Paris."));
    }

    #[test]
    fn test_compaction_uses_extra_call() {
        let mut config = uncompacted();
        config.memory.compaction = true;
        let (mut assistant, completer) =
            assistant(config, &["Paris.", "capital of France?\nParis."]);

        assistant.ask("What is the capital of France?").unwrap();
        assert_eq!(completer.request_count(), 2);

        let turns = MemoryAssembler::persisted_turns(assistant.store()).unwrap();
        assert_eq!(turns[0].query, "capital of France?");
        assert_eq!(turns[0].response, "Paris.");
    }

    #[test]
    fn test_json_output_decodes_answer() {
        let dir = tempfile::tempdir().unwrap();
        let schema_path = dir.path().join("schema.json");
        std::fs::write(
            &schema_path,
            r#"{"name": "answer", "schema": {"type": "object", "properties": {"city": {"type": "string", "description": "City"}}}}"#,
        )
        .unwrap();

        let mut config = uncompacted();
        config.output.output_type = OutputType::Json;
        config.output.schema_path = Some(schema_path);
        let (mut assistant, completer) = assistant(config, &[r#"{"city": "Paris"}"#]);

        let answer = assistant.ask("Capital of France?").unwrap();
        assert_eq!(answer, Answer::Json(serde_json::json!({"city": "Paris"})));

        let requests = completer.requests.lock().unwrap();
        assert_eq!(requests[0].json_schema.as_ref().unwrap().name, "answer");
        assert!(requests[0].system_prompt.contains("'city' [string]: City"));
    }

    #[test]
    fn test_json_output_without_schema_is_rejected() {
        let mut config = Config::default();
        config.output.output_type = OutputType::Json;
        let store = Box::new(SqliteVectorStore::in_memory().unwrap());
        let result = Assistant::new(config, store, Box::new(ScriptedCompleter::default()));
        assert!(matches!(result, Err(crate::Error::Config { .. })));
    }
}
