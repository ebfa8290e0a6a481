//! Chunk commands: insert a chunk, execute the current chunk, execute all
//! previous chunks.
//!
//! Execution is delegated to a host-provided [`ChunkExecutor`]. Without one
//! the execute commands are not registered at all.

use rmdchunk_core::{ChunkNode, parse_chunk};
use serde::Serialize;

use crate::context::DocumentContext;
use crate::error::EditorError;
use crate::placement::{can_insert, insert_chunk};

/// Keybinding of the insert command.
pub const INSERT_CHUNK_KEY: &str = "Mod-Alt-i";

/// Language assumed for "previous chunks" when the selection is not in a chunk.
pub const DEFAULT_LANGUAGE: &str = "r";

/// Identifiers of the commands contributed by the chunk extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EditorCommandId {
    /// Insert a new chunk at the selection.
    RmdChunk,
    /// Execute the chunk holding the selection.
    ExecuteCurrentRmdChunk,
    /// Execute every chunk before the selection.
    ExecutePreviousRmdChunks,
}

impl EditorCommandId {
    /// Command name as registered with the host.
    pub fn as_str(self) -> &'static str {
        match self {
            EditorCommandId::RmdChunk => "RmdChunk",
            EditorCommandId::ExecuteCurrentRmdChunk => "ExecuteCurrentRmdChunk",
            EditorCommandId::ExecutePreviousRmdChunks => "ExecutePreviousRmdChunks",
        }
    }

    /// Keybindings of the command.
    pub fn keymap(self) -> &'static [&'static str] {
        match self {
            EditorCommandId::RmdChunk => &[INSERT_CHUNK_KEY],
            EditorCommandId::ExecuteCurrentRmdChunk
            | EditorCommandId::ExecutePreviousRmdChunks => &[],
        }
    }
}

impl std::fmt::Display for EditorCommandId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Chunk text handed to the executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutableChunk {
    /// Language tag, if the header starts with one.
    pub lang: Option<String>,
    /// Header text between the braces.
    pub meta: String,
    /// Code below the header.
    pub code: String,
}

impl ExecutableChunk {
    /// Parses a chunk node; `None` when it has no header line.
    pub fn from_node(node: &ChunkNode) -> Option<Self> {
        let parsed = node.parse()?;
        Some(Self {
            lang: parsed.language().map(str::to_string),
            meta: parsed.meta.to_string(),
            code: parsed.code.to_string(),
        })
    }
}

/// Host capability that runs chunk code.
pub trait ChunkExecutor {
    /// Hands a chunk over for execution. Completion is the host's concern.
    fn execute_chunk(&self, chunk: &ExecutableChunk);
}

impl<F> ChunkExecutor for F
where
    F: Fn(&ExecutableChunk),
{
    fn execute_chunk(&self, chunk: &ExecutableChunk) {
        (self)(chunk)
    }
}

/// The chunk extension's command set.
pub struct ChunkCommands {
    executor: Option<Box<dyn ChunkExecutor>>,
}

impl ChunkCommands {
    /// Creates the command set; execute commands exist only with an executor.
    pub fn new(executor: Option<Box<dyn ChunkExecutor>>) -> Self {
        Self { executor }
    }

    /// Registered commands.
    pub fn commands(&self) -> Vec<EditorCommandId> {
        let mut commands = vec![EditorCommandId::RmdChunk];
        if self.executor.is_some() {
            commands.push(EditorCommandId::ExecuteCurrentRmdChunk);
            commands.push(EditorCommandId::ExecutePreviousRmdChunks);
        }
        commands
    }

    /// Command bound to `key`, if any.
    pub fn command_for_key(&self, key: &str) -> Option<EditorCommandId> {
        self.commands()
            .into_iter()
            .find(|id| id.keymap().contains(&key))
    }

    /// Whether `id` is registered and applicable in `context`.
    pub fn can_run(&self, id: EditorCommandId, context: &impl DocumentContext) -> bool {
        if !self.commands().contains(&id) {
            return false;
        }
        match id {
            EditorCommandId::RmdChunk => can_insert(context.document(), context.selection()),
            EditorCommandId::ExecuteCurrentRmdChunk => current_chunk(context).is_some(),
            EditorCommandId::ExecutePreviousRmdChunks => previous_chunks(context).is_some(),
        }
    }

    /// Runs `id`. Returns whether the command handled the request.
    pub fn run(
        &self,
        id: EditorCommandId,
        context: &mut impl DocumentContext,
    ) -> Result<bool, EditorError> {
        log::debug!("running {id}");
        match id {
            EditorCommandId::RmdChunk => insert_chunk(context, ChunkNode::seed()),
            EditorCommandId::ExecuteCurrentRmdChunk => {
                Ok(self.execute(current_chunk(context)))
            }
            EditorCommandId::ExecutePreviousRmdChunks => {
                Ok(self.execute(previous_chunks(context)))
            }
        }
    }

    fn execute(&self, chunk: Option<ExecutableChunk>) -> bool {
        match (&self.executor, chunk) {
            (Some(executor), Some(chunk)) => {
                executor.execute_chunk(&chunk);
                true
            }
            _ => false,
        }
    }
}

impl std::fmt::Debug for ChunkCommands {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkCommands")
            .field("executor", &self.executor.is_some())
            .finish()
    }
}

/// The chunk holding the selection.
pub fn current_chunk(context: &impl DocumentContext) -> Option<ExecutableChunk> {
    context
        .document()
        .node(&context.selection().path)?
        .as_chunk()
        .and_then(ExecutableChunk::from_node)
}

/// Every chunk before the selection that shares the current language and is
/// not disabled with `eval=FALSE`, merged into one.
pub fn previous_chunks(context: &impl DocumentContext) -> Option<ExecutableChunk> {
    let document = context.document();
    let selection = &context.selection().path;
    let language = document
        .node(selection)
        .and_then(|node| node.as_chunk())
        .and_then(ChunkNode::language)
        .unwrap_or(DEFAULT_LANGUAGE);

    let mut merged: Option<ExecutableChunk> = None;
    for (path, node) in document.chunks() {
        if path.as_slice() >= selection.as_slice() {
            break;
        }
        let Some(parsed) = parse_chunk(&node.raw_content) else {
            continue;
        };
        if parsed.language() != Some(language) || eval_disabled(parsed.option("eval")) {
            continue;
        }
        match merged.as_mut() {
            Some(chunk) => {
                chunk.code.push('\n');
                chunk.code.push_str(parsed.code);
            }
            None => {
                merged = Some(ExecutableChunk {
                    lang: Some(language.to_string()),
                    meta: parsed.meta.to_string(),
                    code: parsed.code.to_string(),
                });
            }
        }
    }
    merged
}

fn eval_disabled(eval: Option<String>) -> bool {
    matches!(eval.as_deref(), Some("FALSE" | "F"))
}
