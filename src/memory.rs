//! Conversation memory.
//!
//! Completed turns are kept verbatim in a bounded ring buffer and persisted
//! to the `memory` collection as two documents, one per role, sharing a
//! `turn_id`. Before persisting, a turn may be compacted by an auxiliary
//! model call that shortens the query line and the response line.
//!
//! Context for a new query is the most recent persisted turns followed by
//! the persisted turns most similar to the query, behind a system message.

use crate::core::{Message, Metadata, MemoryTurn, Role};
use crate::error::{Error, Result};
use crate::io::unicode::tail_chars;
use crate::llm::{Completer, CompletionRequest, SamplingParams};
use crate::storage::{MEMORY_COLLECTION, StoredDocuments, VectorStore};
use crate::tokens::tokens_to_chars;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet, VecDeque};

/// Instructions for the compaction call.
pub const COMPACTION_PROMPT: &str = "\
RULES:
- Do not add any text that is not already there.
- Do not comment on anything. Only modify the text as instructed below.

Shorten every line of the input. Keep the format: one shortened text per line.
Do not output blank lines. If there is no input, output nothing.
The output must have exactly the same number of lines as the input.";

/// Memory limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemorySettings {
    /// Ring buffer capacity and number of recent persisted turns in context.
    pub max_entries: usize,
    /// Number of relevance-matched persisted turns in context.
    pub max_search_results: usize,
    /// Token budget per compacted line.
    pub tokens_per_memory: usize,
    /// Whether turns are compacted before persisting.
    pub compaction: bool,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            max_entries: 5,
            max_search_results: 3,
            tokens_per_memory: 200,
            compaction: true,
        }
    }
}

/// A turn as read back from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersistedTurn {
    /// Sequence number assigned when recorded.
    pub turn_id: u64,
    /// Stored (possibly compacted) query.
    pub query: String,
    /// Stored (possibly compacted) response.
    pub response: String,
}

impl PersistedTurn {
    fn to_messages(&self) -> [Message; 2] {
        [
            Message::user(self.query.clone()),
            Message::assistant(self.response.clone()),
        ]
    }
}

/// Builds model context from conversation history and records new turns.
#[derive(Debug, Clone)]
pub struct MemoryAssembler {
    settings: MemorySettings,
    recent: VecDeque<(u64, MemoryTurn)>,
    next_turn_id: u64,
}

impl MemoryAssembler {
    /// Creates an assembler with an empty history.
    #[must_use]
    pub fn new(settings: MemorySettings) -> Self {
        Self {
            settings,
            recent: VecDeque::with_capacity(settings.max_entries),
            next_turn_id: 1,
        }
    }

    /// Creates an assembler that continues numbering after the turns
    /// already persisted in `store`. The ring buffer starts empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn resume(settings: MemorySettings, store: &dyn VectorStore) -> Result<Self> {
        let mut assembler = Self::new(settings);
        let dump = store.get(MEMORY_COLLECTION)?;
        assembler.next_turn_id = dump
            .metadatas
            .iter()
            .filter_map(|m| m.as_ref().and_then(turn_id_of))
            .max()
            .map_or(1, |max| max + 1);
        Ok(assembler)
    }

    /// Memory limits.
    #[must_use]
    pub const fn settings(&self) -> &MemorySettings {
        &self.settings
    }

    /// Recent turns, oldest first, exactly as recorded.
    pub fn recent(&self) -> impl Iterator<Item = &MemoryTurn> {
        self.recent.iter().map(|(_, turn)| turn)
    }

    /// Recent turns as plain text: query line then response line per turn.
    #[must_use]
    pub fn recent_transcript(&self) -> String {
        self.recent()
            .flat_map(|turn| [turn.query.as_str(), turn.response.as_deref().unwrap_or("")])
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Assembles the message list for a new query.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or queried.
    pub fn build_context(
        &self,
        store: &dyn VectorStore,
        system_prompt: &str,
        user_query: &str,
    ) -> Result<Vec<Message>> {
        let turns = persisted_turns_from(&store.get(MEMORY_COLLECTION)?);

        let recent: Vec<PersistedTurn> = turns
            .values()
            .rev()
            .take(self.settings.max_entries)
            .rev()
            .map(|stored| self.verbatim_or(stored))
            .collect();
        let recent_ids: HashSet<u64> = recent.iter().map(|t| t.turn_id).collect();

        let relevant = self.relevant_turns(store, user_query, &turns, &recent_ids)?;

        tracing::debug!(
            recent = recent.len(),
            relevant = relevant.len(),
            "assembled memory context"
        );

        let mut messages = vec![Message::system(system_prompt)];
        for turn in recent.iter().chain(&relevant) {
            messages.extend(turn.to_messages());
        }
        Ok(messages)
    }

    /// Compacts, persists and remembers a completed turn.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Contract`] if the turn has no response, or an error
    /// if the compaction call or the store write fails.
    pub fn record_turn(
        &mut self,
        store: &mut dyn VectorStore,
        completer: &dyn Completer,
        turn: MemoryTurn,
    ) -> Result<()> {
        let Some(response) = turn.response.as_deref() else {
            return Err(Error::contract("cannot record a turn without a response"));
        };

        let lines = if self.settings.compaction {
            let lines = [flatten(&turn.query), flatten(response)];
            self.compact(completer, &lines)?
        } else {
            vec![turn.query.clone(), response.to_string()]
        };

        let turn_id = self.next_turn_id;
        self.persist(store, turn_id, &lines)?;
        self.next_turn_id += 1;

        self.recent.push_back((turn_id, turn));
        while self.recent.len() > self.settings.max_entries {
            self.recent.pop_front();
        }
        Ok(())
    }

    /// Shortens a `[query, response]` pair with one auxiliary model call.
    ///
    /// If the reply does not have exactly as many lines as the input, each
    /// line is instead cut to its trailing `tokens_to_chars(tokens_per_memory)`
    /// characters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Contract`] unless `lines` holds exactly two items,
    /// or the completer's error if the call fails.
    pub fn compact(&self, completer: &dyn Completer, lines: &[String]) -> Result<Vec<String>> {
        if lines.len() != 2 {
            return Err(Error::contract(format!(
                "compaction expects 2 lines (query, response), got {}",
                lines.len()
            )));
        }

        let per_line = u32::try_from(self.settings.tokens_per_memory).unwrap_or(u32::MAX);
        let request = CompletionRequest::new(
            COMPACTION_PROMPT,
            vec![Message::user(lines.join("\n"))],
            SamplingParams {
                max_output_tokens: per_line.saturating_mul(3),
                ..SamplingParams::default()
            },
        );
        let reply = completer.complete(&request)?;
        let shortened: Vec<String> = reply.trim().lines().map(str::to_string).collect();

        if shortened.len() == lines.len() {
            return Ok(shortened);
        }

        let keep = tokens_to_chars(self.settings.tokens_per_memory);
        tracing::warn!(
            expected = lines.len(),
            got = shortened.len(),
            keep_chars = keep,
            "compaction returned wrong line count, truncating instead"
        );
        Ok(lines
            .iter()
            .map(|line| tail_chars(line, keep).to_string())
            .collect())
    }

    /// Reads every persisted turn, ordered by turn id.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn persisted_turns(store: &dyn VectorStore) -> Result<Vec<PersistedTurn>> {
        Ok(persisted_turns_from(&store.get(MEMORY_COLLECTION)?)
            .into_values()
            .collect())
    }

    fn verbatim_or(&self, stored: &PersistedTurn) -> PersistedTurn {
        self.recent
            .iter()
            .find(|(id, _)| *id == stored.turn_id)
            .map_or_else(
                || stored.clone(),
                |(id, turn)| PersistedTurn {
                    turn_id: *id,
                    query: turn.query.clone(),
                    response: turn.response.clone().unwrap_or_default(),
                },
            )
    }

    fn relevant_turns(
        &self,
        store: &dyn VectorStore,
        user_query: &str,
        turns: &BTreeMap<u64, PersistedTurn>,
        exclude: &HashSet<u64>,
    ) -> Result<Vec<PersistedTurn>> {
        if self.settings.max_search_results == 0 || turns.len() <= exclude.len() {
            return Ok(Vec::new());
        }

        let hits = store
            .query(MEMORY_COLLECTION, &[user_query], turns.len() * 2)?
            .into_iter()
            .next()
            .unwrap_or_default();

        let mut seen = HashSet::new();
        let relevant = hits
            .metadatas()
            .iter()
            .filter_map(|m| m.as_ref().and_then(turn_id_of))
            .filter(|id| !exclude.contains(id) && seen.insert(*id))
            .filter_map(|id| turns.get(&id).cloned())
            .take(self.settings.max_search_results)
            .collect();
        Ok(relevant)
    }

    fn persist(&self, store: &mut dyn VectorStore, turn_id: u64, lines: &[String]) -> Result<()> {
        let roles = [Role::User, Role::Assistant];
        let ids: Vec<String> = roles
            .iter()
            .map(|role| format!("turn-{turn_id}-{role}"))
            .collect();
        let metadatas: Vec<Metadata> = roles
            .iter()
            .map(|role| {
                let mut meta = Metadata::new();
                meta.insert("role".into(), role.as_str().into());
                meta.insert("turn_id".into(), turn_id.into());
                meta
            })
            .collect();

        store.upsert(MEMORY_COLLECTION, &ids, lines, Some(metadatas.as_slice()))?;
        tracing::debug!(turn_id, "persisted memory turn");
        Ok(())
    }
}

fn turn_id_of(metadata: &Metadata) -> Option<u64> {
    metadata.get("turn_id").and_then(serde_json::Value::as_u64)
}

fn role_of(metadata: &Metadata) -> Option<Role> {
    metadata
        .get("role")
        .and_then(serde_json::Value::as_str)
        .and_then(Role::parse)
}

fn flatten(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Groups role documents back into turns.
fn persisted_turns_from(dump: &StoredDocuments) -> BTreeMap<u64, PersistedTurn> {
    let mut turns: BTreeMap<u64, PersistedTurn> = BTreeMap::new();
    for (document, metadata) in dump.documents.iter().zip(&dump.metadatas) {
        let Some(metadata) = metadata else { continue };
        let (Some(turn_id), Some(role)) = (turn_id_of(metadata), role_of(metadata)) else {
            continue;
        };
        let entry = turns.entry(turn_id).or_insert_with(|| PersistedTurn {
            turn_id,
            query: String::new(),
            response: String::new(),
        });
        match role {
            Role::User => entry.query.clone_from(document),
            Role::Assistant => entry.response.clone_from(document),
            Role::System => {}
        }
    }
    turns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedCompleter;
    use crate::storage::SqliteVectorStore;
    use proptest::prelude::*;

    fn store() -> SqliteVectorStore {
        let mut store = SqliteVectorStore::in_memory().unwrap();
        store.init().unwrap();
        store
    }

    fn settings(max_entries: usize, max_search_results: usize, compaction: bool) -> MemorySettings {
        MemorySettings {
            max_entries,
            max_search_results,
            tokens_per_memory: 200,
            compaction,
        }
    }

    fn lines(query: &str, response: &str) -> Vec<String> {
        vec![query.to_string(), response.to_string()]
    }

    #[test]
    fn test_compaction_fallback_on_wrong_line_count() {
        let memory = MemoryAssembler::new(MemorySettings::default());
        let completer = ScriptedCompleter::new(["France: Paris."]);
        let input = lines(
            "What is the capital of France?",
            "The capital of France is Paris.",
        );

        let compacted = memory.compact(&completer, &input).unwrap();
        assert_eq!(compacted, input);
        assert_eq!(completer.request_count(), 1);
    }

    #[test]
    fn test_compaction_fallback_keeps_trailing_chars() {
        let memory = MemoryAssembler::new(MemorySettings {
            tokens_per_memory: 2,
            ..MemorySettings::default()
        });
        let completer = ScriptedCompleter::new(["one\ntwo\nthree"]);
        let compacted = memory
            .compact(&completer, &lines("0123456789abc", "short"))
            .unwrap();
        assert_eq!(compacted, vec!["56789abc".to_string(), "short".to_string()]);
    }

    #[test]
    fn test_compaction_uses_model_lines() {
        let memory = MemoryAssembler::new(MemorySettings::default());
        let completer = ScriptedCompleter::new(["Capital of France?\nParis.\n"]);
        let compacted = memory
            .compact(&completer, &lines("What is the capital of France?", "It is Paris."))
            .unwrap();
        assert_eq!(compacted, vec!["Capital of France?", "Paris."]);

        let requests = completer.requests.lock().unwrap();
        assert_eq!(requests[0].system_prompt, COMPACTION_PROMPT);
        assert_eq!(
            requests[0].messages[0].content,
            "What is the capital of France?\nIt is Paris."
        );
    }

    #[test]
    fn test_compaction_rejects_wrong_arity() {
        let memory = MemoryAssembler::new(MemorySettings::default());
        let completer = ScriptedCompleter::default();
        for input in [vec![], vec!["q".to_string()], vec!["a".into(), "b".into(), "c".into()]] {
            let err = memory.compact(&completer, &input).unwrap_err();
            assert!(matches!(err, Error::Contract { .. }));
        }
        assert_eq!(completer.request_count(), 0);
    }

    #[test]
    fn test_record_turn_persists_two_role_documents() {
        let mut store = store();
        let mut memory = MemoryAssembler::new(settings(5, 3, false));
        let completer = ScriptedCompleter::default();

        memory
            .record_turn(&mut store, &completer, MemoryTurn::completed("q1", "r1"))
            .unwrap();

        let dump = store.get(MEMORY_COLLECTION).unwrap();
        assert_eq!(dump.ids, ["turn-1-user", "turn-1-assistant"]);
        assert_eq!(dump.documents, ["q1", "r1"]);
        let roles: Vec<Option<Role>> = dump
            .metadatas
            .iter()
            .map(|m| m.as_ref().and_then(role_of))
            .collect();
        assert_eq!(roles, [Some(Role::User), Some(Role::Assistant)]);
        assert_eq!(completer.request_count(), 0);
    }

    #[test]
    fn test_record_turn_stores_compacted_keeps_verbatim() {
        let mut store = store();
        let mut memory = MemoryAssembler::new(settings(5, 3, true));
        let completer = ScriptedCompleter::new(["short q\nshort r"]);

        let turn = MemoryTurn::completed("a long query", "a long response");
        memory.record_turn(&mut store, &completer, turn.clone()).unwrap();

        assert_eq!(store.get(MEMORY_COLLECTION).unwrap().documents, ["short q", "short r"]);
        assert_eq!(memory.recent().next(), Some(&turn));
    }

    #[test]
    fn test_record_pending_turn_is_contract_violation() {
        let mut store = store();
        let mut memory = MemoryAssembler::new(MemorySettings::default());
        let err = memory
            .record_turn(&mut store, &ScriptedCompleter::default(), MemoryTurn::new("q"))
            .unwrap_err();
        assert!(matches!(err, Error::Contract { .. }));
    }

    #[test]
    fn test_build_context_recent_then_relevant() {
        let mut store = store();
        let mut memory = MemoryAssembler::new(settings(2, 1, false));
        let completer = ScriptedCompleter::default();

        for (q, r) in [
            ("tell me about paris france", "paris is the capital of france"),
            ("rust ownership", "values have one owner"),
            ("what about cats", "cats sleep a lot"),
            ("and dogs", "dogs bark"),
        ] {
            memory
                .record_turn(&mut store, &completer, MemoryTurn::completed(q, r))
                .unwrap();
        }

        let messages = memory
            .build_context(&store, "system prompt", "capital of france")
            .unwrap();

        assert_eq!(messages[0], Message::system("system prompt"));
        let contents: Vec<&str> = messages[1..].iter().map(|m| m.content.as_str()).collect();
        assert_eq!(
            contents,
            [
                "what about cats",
                "cats sleep a lot",
                "and dogs",
                "dogs bark",
                "tell me about paris france",
                "paris is the capital of france",
            ]
        );
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(messages[2].role, Role::Assistant);
    }

    #[test]
    fn test_build_context_prefers_verbatim_recent() {
        let mut store = store();
        let mut memory = MemoryAssembler::new(settings(5, 3, true));
        let completer = ScriptedCompleter::new(["q\nr"]);

        memory
            .record_turn(
                &mut store,
                &completer,
                MemoryTurn::completed("full query", "full response"),
            )
            .unwrap();

        let messages = memory.build_context(&store, "sys", "anything").unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].content, "full query");
        assert_eq!(messages[2].content, "full response");

        let resumed = MemoryAssembler::resume(*memory.settings(), &store).unwrap();
        let messages = resumed.build_context(&store, "sys", "anything").unwrap();
        assert_eq!(messages[1].content, "q");
    }

    #[test]
    fn test_resume_continues_turn_ids() {
        let mut store = store();
        let mut memory = MemoryAssembler::new(settings(5, 3, false));
        let completer = ScriptedCompleter::default();
        memory
            .record_turn(&mut store, &completer, MemoryTurn::completed("q1", "r1"))
            .unwrap();

        let mut resumed = MemoryAssembler::resume(*memory.settings(), &store).unwrap();
        resumed
            .record_turn(&mut store, &completer, MemoryTurn::completed("q2", "r2"))
            .unwrap();

        let turns = MemoryAssembler::persisted_turns(&store).unwrap();
        let ids: Vec<u64> = turns.iter().map(|t| t.turn_id).collect();
        assert_eq!(ids, [1, 2]);
        assert_eq!(turns[1].query, "q2");
    }

    #[test]
    fn test_empty_history_context() {
        let store = store();
        let memory = MemoryAssembler::new(MemorySettings::default());
        let messages = memory.build_context(&store, "sys", "hello").unwrap();
        assert_eq!(messages, vec![Message::system("sys")]);
    }

    #[test]
    fn test_recent_transcript() {
        let mut store = store();
        let mut memory = MemoryAssembler::new(settings(5, 3, false));
        memory
            .record_turn(
                &mut store,
                &ScriptedCompleter::default(),
                MemoryTurn::completed("hi", "hello"),
            )
            .unwrap();
        assert_eq!(memory.recent_transcript(), "hi\nhello");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_ring_buffer_bounded_and_ordered(max_entries in 1usize..6, turns in 0usize..12) {
            let mut store = store();
            let mut memory = MemoryAssembler::new(settings(max_entries, 0, false));
            let completer = ScriptedCompleter::default();

            for i in 0..turns {
                memory
                    .record_turn(&mut store, &completer, MemoryTurn::completed(format!("q{i}"), format!("r{i}")))
                    .unwrap();
                prop_assert!(memory.recent().count() <= max_entries);
            }

            let expected: Vec<String> = (turns.saturating_sub(max_entries)..turns)
                .map(|i| format!("q{i}"))
                .collect();
            let actual: Vec<String> = memory.recent().map(|t| t.query.clone()).collect();
            prop_assert_eq!(actual, expected);
        }
    }
}
