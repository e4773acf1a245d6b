//! Two-tier conversation memory.
//!
//! The recent window of a conversation is always a suffix of its durable log:
//! a window is seeded from the log tail the first time a conversation is
//! written in this process. Every append rewrites the whole store file, so a
//! write costs O(total messages).

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::{Path, PathBuf};

use docsage_core::{Error, Result};
use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::types::{Message, Role};

/// Context window fed into the summary.
const SUMMARY_CONTEXT: usize = 10;
/// Messages rendered in the summary.
const SUMMARY_MESSAGES: usize = 6;
/// Per-message character limit in the summary.
const SUMMARY_CHARS: usize = 200;

#[derive(Default)]
struct Tiers {
    recent: HashMap<String, VecDeque<Message>>,
    durable: BTreeMap<String, Vec<Message>>,
}

pub struct ConversationMemory {
    path: PathBuf,
    max_short_term: usize,
    max_long_term: usize,
    tiers: RwLock<Tiers>,
    flush_lock: Mutex<()>,
}

impl ConversationMemory {
    /// Open the store at `path`. A missing file starts empty; unreadable
    /// records are skipped.
    pub fn open(path: impl AsRef<Path>, max_short_term: usize, max_long_term: usize) -> Self {
        let path = path.as_ref().to_path_buf();
        let max_short_term = max_short_term.max(1);
        let max_long_term = max_long_term.max(max_short_term);
        let durable = load_store(&path);

        info!(
            "Memory initialized (short-term: {}, long-term: {}, {} conversations loaded)",
            max_short_term,
            max_long_term,
            durable.len()
        );

        Self {
            path,
            max_short_term,
            max_long_term,
            tiers: RwLock::new(Tiers {
                recent: HashMap::new(),
                durable,
            }),
            flush_lock: Mutex::new(()),
        }
    }

    /// Append a message to both tiers and persist every conversation.
    ///
    /// A failed write is logged; the in-memory state is still updated.
    pub fn add_message(
        &self,
        conversation_id: &str,
        role: Role,
        content: &str,
        metadata: Option<Map<String, Value>>,
    ) -> Message {
        let message = Message::new(role, content, metadata.unwrap_or_default());

        let _flush = self.flush_lock.lock();
        let snapshot = {
            let mut tiers = self.tiers.write();
            let Tiers { recent, durable } = &mut *tiers;

            let log = durable.entry(conversation_id.to_string()).or_default();
            let window = recent
                .entry(conversation_id.to_string())
                .or_insert_with(|| tail(log, self.max_short_term).iter().cloned().collect());

            window.push_back(message.clone());
            while window.len() > self.max_short_term {
                window.pop_front();
            }

            log.push(message.clone());
            if log.len() > self.max_long_term {
                let excess = log.len() - self.max_long_term;
                log.drain(..excess);
            }

            serde_json::to_string_pretty(&*durable)
        };

        match snapshot {
            Ok(data) => {
                if let Err(e) = write_atomic(&self.path, &data) {
                    warn!("Failed to save conversation history: {}", e);
                }
            }
            Err(e) => warn!("Failed to serialize conversation history: {}", e),
        }

        message
    }

    /// The last `max_messages` messages, from the recent window when present,
    /// otherwise from the durable log.
    pub fn get_context(&self, conversation_id: &str, max_messages: usize) -> Vec<Message> {
        let tiers = self.tiers.read();
        if let Some(window) = tiers.recent.get(conversation_id) {
            let skip = window.len().saturating_sub(max_messages);
            return window.iter().skip(skip).cloned().collect();
        }
        tiers
            .durable
            .get(conversation_id)
            .map(|log| tail(log, max_messages).to_vec())
            .unwrap_or_default()
    }

    /// `"User: ..."` / `"Assistant: ..."` lines for the latest turns, or an
    /// empty string when the conversation has no history.
    pub fn get_conversation_summary(&self, conversation_id: &str) -> String {
        let context = self.get_context(conversation_id, SUMMARY_CONTEXT);
        tail(&context, SUMMARY_MESSAGES)
            .iter()
            .map(|m| format!("{}: {}", m.role.label(), truncate(&m.content, SUMMARY_CHARS)))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Remove both tiers for `conversation_id` and persist the removal.
    /// Returns whether anything was removed.
    pub fn clear_conversation(&self, conversation_id: &str) -> bool {
        let _flush = self.flush_lock.lock();
        let (removed, snapshot) = {
            let mut tiers = self.tiers.write();
            let in_recent = tiers.recent.remove(conversation_id).is_some();
            let in_durable = tiers.durable.remove(conversation_id).is_some();
            let snapshot = in_durable.then(|| serde_json::to_string_pretty(&tiers.durable));
            (in_recent || in_durable, snapshot)
        };

        if let Some(snapshot) = snapshot {
            let written = snapshot
                .map_err(Error::from)
                .and_then(|data| write_atomic(&self.path, &data));
            if let Err(e) = written {
                warn!("Failed to persist cleared conversation: {}", e);
            }
        }
        debug!("Cleared conversation {} (existed: {})", conversation_id, removed);
        removed
    }

    /// Every known conversation id, sorted.
    pub fn conversation_ids(&self) -> Vec<String> {
        let tiers = self.tiers.read();
        let mut ids: Vec<String> = tiers
            .durable
            .keys()
            .chain(tiers.recent.keys())
            .cloned()
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }

    /// The full durable log for a conversation.
    pub fn history(&self, conversation_id: &str) -> Vec<Message> {
        self.tiers
            .read()
            .durable
            .get(conversation_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Size of the recent window, zero if none exists yet.
    pub fn recent_len(&self, conversation_id: &str) -> usize {
        self.tiers
            .read()
            .recent
            .get(conversation_id)
            .map_or(0, VecDeque::len)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn tail<T>(items: &[T], n: usize) -> &[T] {
    &items[items.len().saturating_sub(n)..]
}

fn truncate(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &content[..idx]),
        None => content.to_string(),
    }
}

/// Load every conversation that parses. Records that do not are skipped; the
/// original file is kept next to the store as `<name>.corrupt` before any
/// later write can replace it.
fn load_store(path: &Path) -> BTreeMap<String, Vec<Message>> {
    let data = match std::fs::read_to_string(path) {
        Ok(data) => data,
        Err(_) => return BTreeMap::new(),
    };

    let raw = match serde_json::from_str::<Map<String, Value>>(&data) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Could not parse conversation history ({}); starting empty", e);
            quarantine(path, |from, to| std::fs::rename(from, to));
            return BTreeMap::new();
        }
    };

    let mut store = BTreeMap::new();
    let mut skipped = 0usize;
    for (conversation_id, records) in raw {
        let Value::Array(records) = records else {
            warn!("Skipping conversation {}: not a message list", conversation_id);
            skipped += 1;
            continue;
        };
        let mut log = Vec::with_capacity(records.len());
        for record in records {
            match serde_json::from_value::<Message>(record) {
                Ok(message) => log.push(message),
                Err(e) => {
                    warn!("Skipping message in {}: {}", conversation_id, e);
                    skipped += 1;
                }
            }
        }
        store.insert(conversation_id, log);
    }

    if skipped > 0 {
        quarantine(path, |from, to| std::fs::copy(from, to).map(|_| ()));
    }
    let total: usize = store.values().map(Vec::len).sum();
    info!(
        "Loaded {} messages from {} ({} records skipped)",
        total,
        path.display(),
        skipped
    );
    store
}

fn corrupt_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".corrupt");
    PathBuf::from(name)
}

fn quarantine(path: &Path, keep: impl FnOnce(&Path, &Path) -> std::io::Result<()>) {
    let target = corrupt_path(path);
    match keep(path, &target) {
        Ok(()) => warn!("Kept unreadable history at {}", target.display()),
        Err(e) => warn!("Could not preserve {}: {}", path.display(), e),
    }
}

/// Write to a temporary sibling, then rename over the target.
fn write_atomic(path: &Path, data: &str) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, data)
        .and_then(|_| std::fs::rename(&tmp, path))
        .map_err(|e| Error::Persistence(format!("{}: {e}", path.display())))
}
