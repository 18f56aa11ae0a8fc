//! Hook dispatcher — priority-ordered event pipeline.
//!
//! A process-wide registry mapping an event name to an ordered list of
//! handlers. Executing an event runs the handlers sequentially, piping one
//! mutable payload through each handler in turn; this is a transform
//! pipeline, not a fan-out. Ordering is (priority ascending, registration
//! order ascending) and deterministic.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use serde_json::Value;
use uuid::Uuid;

use crate::context::CapabilityContext;
use crate::definition::HookHandler;
use crate::error::PluginError;

/// A registered hook entry.
struct HookEntry {
    id: Uuid,
    plugin: String,
    priority: i32,
    /// Monotonic registration sequence, breaks priority ties.
    seq: u64,
    strict: bool,
    handler: HookHandler,
}

/// Introspection view of a registration, without the handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookInfo {
    pub id: Uuid,
    pub plugin: String,
    pub event: String,
    pub priority: i32,
    pub strict: bool,
}

/// Central hook registry and executor.
///
/// Registration is synchronous; execution is async. `execute` snapshots the
/// entries for its event before running, so a handler may register or
/// unregister hooks without deadlocking the dispatcher — changes take
/// effect from the next execution.
#[derive(Default)]
pub struct HookDispatcher {
    hooks: RwLock<HashMap<String, Vec<HookEntry>>>,
    next_seq: AtomicU64,
}

impl HookDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for an event. Returns the registration id used
    /// by [`unregister`](Self::unregister).
    ///
    /// `strict` opts the hook into failure propagation: a strict handler
    /// error aborts the pipeline and reaches the event's caller, while a
    /// non-strict failure is logged and the payload passes through
    /// unchanged.
    pub fn register(
        &self,
        event: impl Into<String>,
        plugin: impl Into<String>,
        priority: i32,
        strict: bool,
        handler: HookHandler,
    ) -> Uuid {
        let event = event.into();
        let entry = HookEntry {
            id: Uuid::new_v4(),
            plugin: plugin.into(),
            priority,
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            strict,
            handler,
        };
        let id = entry.id;

        let mut hooks = self.hooks.write().unwrap_or_else(|e| e.into_inner());
        hooks.entry(event.clone()).or_default().push(entry);

        tracing::debug!(event = %event, priority, strict, "hook registered");
        id
    }

    /// Remove a single registration. Returns whether it existed.
    pub fn unregister(&self, id: Uuid) -> bool {
        let mut hooks = self.hooks.write().unwrap_or_else(|e| e.into_inner());
        for entries in hooks.values_mut() {
            let before = entries.len();
            entries.retain(|e| e.id != id);
            if entries.len() != before {
                return true;
            }
        }
        false
    }

    /// Remove every registration owned by a plugin, across all events.
    /// Called at uninstall so no hook of a gone plugin can ever fire.
    pub fn unregister_plugin(&self, plugin: &str) -> usize {
        let mut hooks = self.hooks.write().unwrap_or_else(|e| e.into_inner());
        let mut removed = 0;
        for entries in hooks.values_mut() {
            let before = entries.len();
            entries.retain(|e| e.plugin != plugin);
            removed += before - entries.len();
        }
        if removed > 0 {
            tracing::debug!(plugin = %plugin, removed, "plugin hooks unregistered");
        }
        removed
    }

    /// Registrations for an event, in execution order.
    pub fn hooks_for(&self, event: &str) -> Vec<HookInfo> {
        let hooks = self.hooks.read().unwrap_or_else(|e| e.into_inner());
        let Some(entries) = hooks.get(event) else {
            return Vec::new();
        };
        let mut infos: Vec<(i32, u64, HookInfo)> = entries
            .iter()
            .map(|e| {
                (
                    e.priority,
                    e.seq,
                    HookInfo {
                        id: e.id,
                        plugin: e.plugin.clone(),
                        event: event.to_string(),
                        priority: e.priority,
                        strict: e.strict,
                    },
                )
            })
            .collect();
        infos.sort_by_key(|(priority, seq, _)| (*priority, *seq));
        infos.into_iter().map(|(_, _, info)| info).collect()
    }

    /// Execute an event, piping the payload through every subscribed
    /// handler in (priority, registration) order.
    ///
    /// Handlers run strictly sequentially, one awaited at a time, because
    /// each receives the previous handler's output. An event with no
    /// registrations returns the payload unchanged.
    pub async fn execute(
        &self,
        event: &str,
        payload: Value,
        ctx: &CapabilityContext,
    ) -> Result<Value, PluginError> {
        // Snapshot under the lock, run outside it.
        let mut entries: Vec<(i32, u64, String, bool, HookHandler)> = {
            let hooks = self.hooks.read().unwrap_or_else(|e| e.into_inner());
            match hooks.get(event) {
                Some(list) => list
                    .iter()
                    .map(|e| {
                        (
                            e.priority,
                            e.seq,
                            e.plugin.clone(),
                            e.strict,
                            e.handler.clone(),
                        )
                    })
                    .collect(),
                None => return Ok(payload),
            }
        };
        entries.sort_by_key(|(priority, seq, _, _, _)| (*priority, *seq));

        let mut current = payload;
        for (_, _, plugin, strict, handler) in entries {
            let start = std::time::Instant::now();
            let handler_ctx = ctx.for_plugin(&plugin);

            match handler(current.clone(), handler_ctx).await {
                Ok(next) => {
                    tracing::debug!(
                        plugin = %plugin,
                        event = %event,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "hook handled"
                    );
                    current = next;
                }
                Err(e) if strict => {
                    tracing::error!(
                        plugin = %plugin,
                        event = %event,
                        "strict hook failed, aborting pipeline: {e}"
                    );
                    return Err(e);
                }
                Err(e) => {
                    // Payload passes through unchanged from this handler.
                    tracing::warn!(
                        plugin = %plugin,
                        event = %event,
                        "hook failed, continuing: {e}"
                    );
                }
            }
        }

        Ok(current)
    }
}

impl std::fmt::Debug for HookDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let hooks = self.hooks.read().unwrap_or_else(|e| e.into_inner());
        let counts: HashMap<&str, usize> =
            hooks.iter().map(|(k, v)| (k.as_str(), v.len())).collect();
        f.debug_struct("HookDispatcher")
            .field("events", &counts)
            .finish()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────
