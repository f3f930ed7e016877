//! Observability hooks: trace sinks and the profiler boundary.
//!
//! Both hooks are purely observational — nothing here may affect control
//! flow. The engine brackets each chain resolution with profiler push/pop and
//! reports commands, function calls, and errors to an optional trace sink.
//!
//! [`TraceLog`] is a concrete sink that records hash-chained JSONL records,
//! suitable for function-debugging sessions where a tamper-evident transcript
//! of every executed command is wanted.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// ---------------------------------------------------------------------------
// Hooks
// ---------------------------------------------------------------------------

/// Observer for command execution, attached to one execution context.
pub trait TraceSink {
    /// A command chain was queued for resolution at the given depth.
    fn on_command(&mut self, depth: u32, command: &str);

    /// A stored function was expanded: new depth, function id, body length.
    fn on_call(&mut self, depth: u32, function: &str, actions: usize);

    /// An error was reported to a source's error sink.
    fn on_error(&mut self, message: &str);
}

/// Profiler boundary: push/pop bracketing around chain resolution.
pub trait Profiler {
    fn push(&mut self, label: &str);
    fn pop(&mut self);
}

/// Profiler that does nothing; the default when the host attaches none.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProfiler;

impl Profiler for NoopProfiler {
    fn push(&mut self, _label: &str) {}
    fn pop(&mut self) {}
}

// ---------------------------------------------------------------------------
// RecordingTrace
// ---------------------------------------------------------------------------

/// One observed engine event, as captured by [`RecordingTrace`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceEvent {
    Command {
        depth: u32,
        command: String,
    },
    Call {
        depth: u32,
        function: String,
        actions: usize,
    },
    Error {
        message: String,
    },
}

/// In-memory sink that records every event, in order.
#[derive(Debug, Default)]
pub struct RecordingTrace {
    pub events: Vec<TraceEvent>,
}

impl RecordingTrace {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TraceSink for RecordingTrace {
    fn on_command(&mut self, depth: u32, command: &str) {
        self.events.push(TraceEvent::Command {
            depth,
            command: command.to_string(),
        });
    }

    fn on_call(&mut self, depth: u32, function: &str, actions: usize) {
        self.events.push(TraceEvent::Call {
            depth,
            function: function.to_string(),
            actions,
        });
    }

    fn on_error(&mut self, message: &str) {
        self.events.push(TraceEvent::Error {
            message: message.to_string(),
        });
    }
}

// ---------------------------------------------------------------------------
// TraceLog — hash-chained JSONL records
// ---------------------------------------------------------------------------

/// Hash a record's canonical serialization.
fn sha256_hash(data: &str) -> String {
    format!("sha256:{:x}", Sha256::digest(data.as_bytes()))
}

/// Hash-chained trace transcript.
///
/// Each record carries a monotonic sequence number, the hash of the previous
/// record, and its own hash, so a transcript can be verified after the fact.
/// Records accumulate in memory; [`TraceLog::to_jsonl`] renders the JSONL
/// form for persistence by the host.
pub struct TraceLog {
    run_id: String,
    seq: u64,
    prev_hash: String,
    records: Vec<serde_json::Value>,
}

impl TraceLog {
    pub fn new() -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            seq: 0,
            prev_hash: "sha256:genesis".to_string(),
            records: Vec::new(),
        }
    }

    /// Unique id of this trace run.
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// The recorded events, oldest first.
    pub fn records(&self) -> &[serde_json::Value] {
        &self.records
    }

    /// Render the transcript as JSON Lines.
    pub fn to_jsonl(&self) -> String {
        let mut out = String::new();
        for record in &self.records {
            out.push_str(&record.to_string());
            out.push('\n');
        }
        out
    }

    /// Verify the hash chain; returns `false` if any record was altered.
    pub fn verify_chain(&self) -> bool {
        let mut prev = "sha256:genesis".to_string();
        for record in &self.records {
            let Some(claimed) = record.get("hash").and_then(|h| h.as_str()) else {
                return false;
            };
            if record.get("prev").and_then(|p| p.as_str()) != Some(prev.as_str()) {
                return false;
            }
            let mut unhashed = record.clone();
            if let Some(obj) = unhashed.as_object_mut() {
                obj.remove("hash");
            }
            if sha256_hash(&unhashed.to_string()) != claimed {
                return false;
            }
            prev = claimed.to_string();
        }
        true
    }

    fn emit(&mut self, event: serde_json::Value) {
        let mut record = serde_json::json!({
            "run": self.run_id,
            "seq": self.seq,
            "ts": Utc::now().to_rfc3339(),
            "prev": self.prev_hash,
            "event": event,
        });
        let hash = sha256_hash(&record.to_string());
        record["hash"] = serde_json::Value::String(hash.clone());
        self.prev_hash = hash;
        self.seq += 1;
        self.records.push(record);
    }
}

impl Default for TraceLog {
    fn default() -> Self {
        Self::new()
    }
}

impl TraceSink for TraceLog {
    fn on_command(&mut self, depth: u32, command: &str) {
        self.emit(serde_json::json!({
            "kind": "command",
            "depth": depth,
            "command": command,
        }));
    }

    fn on_call(&mut self, depth: u32, function: &str, actions: usize) {
        self.emit(serde_json::json!({
            "kind": "call",
            "depth": depth,
            "function": function,
            "actions": actions,
        }));
    }

    fn on_error(&mut self, message: &str) {
        self.emit(serde_json::json!({
            "kind": "error",
            "message": message,
        }));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
