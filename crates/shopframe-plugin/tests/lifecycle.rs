//! End-to-end lifecycle test: an audit plugin is built, loaded, installed,
//! exercised through the hook pipeline, and uninstalled, using only the
//! crate's public API with in-memory host capabilities.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use shopframe_plugin::{
    BundledSource, CapabilityContext, HookFuture, KeyValueStore, LifecycleFuture, LoadOptions,
    PluginBuilder, PluginError, PluginLoader, PluginStatus, ServiceRegistry, StructuredStore,
};

// ─── In-memory host capabilities ────────────────────────────────────────

/// Records every statement instead of executing it.
#[derive(Default)]
struct RecordingStore {
    statements: Mutex<Vec<String>>,
}

#[async_trait]
impl StructuredStore for RecordingStore {
    async fn run(&self, sql: &str, _params: &[Value]) -> Result<u64, PluginError> {
        self.statements.lock().unwrap().push(sql.to_string());
        Ok(1)
    }

    async fn all(&self, _sql: &str, _params: &[Value]) -> Result<Vec<Value>, PluginError> {
        Ok(Vec::new())
    }

    async fn first(&self, _sql: &str, _params: &[Value]) -> Result<Option<Value>, PluginError> {
        Ok(None)
    }
}

#[derive(Default)]
struct MemoryKv {
    entries: Mutex<HashMap<String, Value>>,
}

#[async_trait]
impl KeyValueStore for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<Value>, PluginError> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn put(
        &self,
        key: &str,
        value: Value,
        _ttl: Option<Duration>,
    ) -> Result<(), PluginError> {
        self.entries.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, PluginError> {
        Ok(self.entries.lock().unwrap().remove(key).is_some())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, PluginError> {
        let entries = self.entries.lock().unwrap();
        let mut keys: Vec<String> = entries
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}

fn host(loader: &PluginLoader, store: Arc<RecordingStore>) -> CapabilityContext {
    CapabilityContext::new(
        store,
        Arc::new(MemoryKv::default()),
        loader.dispatcher().clone(),
        Arc::new(ServiceRegistry::new()),
    )
}

// ─── The audit plugin ───────────────────────────────────────────────────

/// An audit-trail plugin: creates its table at install, stamps every
/// created content item with audit metadata, and drops the table when
/// uninstalled with data removal.
fn audit_plugin() -> shopframe_plugin::PluginDefinition {
    PluginBuilder::new("audit", "1.0.0", "Audit trail for content changes")
        .metadata(Some("Shopframe".into()), Some("MIT".into()), None)
        .hook("content:create", 5, Arc::new(|mut payload, ctx| -> HookFuture {
            Box::pin(async move {
                ctx.storage()
                    .run(
                        "INSERT INTO audit_log (event, payload) VALUES (?, ?)",
                        &[json!("content:create"), payload.clone()],
                    )
                    .await?;
                payload["metadata"]["audit"] = json!({"type": "audit", "version": "1.0.0"});
                Ok(payload)
            })
        }))
        .on_install(Arc::new(|ctx| -> LifecycleFuture {
            Box::pin(async move {
                ctx.storage()
                    .run(
                        "CREATE TABLE IF NOT EXISTS audit_log (id INTEGER PRIMARY KEY, event TEXT, payload TEXT)",
                        &[],
                    )
                    .await?;
                ctx.logger().info("audit table ready");
                Ok(())
            })
        }))
        .on_uninstall(Arc::new(|ctx| -> LifecycleFuture {
            Box::pin(async move {
                if ctx.remove_data() {
                    ctx.storage().run("DROP TABLE audit_log", &[]).await?;
                }
                Ok(())
            })
        }))
        .build()
        .expect("audit plugin definition is valid")
}

// ─── Scenario ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_audit_plugin_full_lifecycle() {
    let source = Arc::new(BundledSource::new());
    source.register_definition("plugins/audit", audit_plugin());

    let loader = PluginLoader::new(source);
    let store = Arc::new(RecordingStore::default());
    let ctx = host(&loader, store.clone());

    // Load + install in one step.
    let result = loader
        .load(LoadOptions::new("plugins/audit").auto_install(true), &ctx)
        .await;
    assert!(result.success, "install failed: {:?}", result.error);
    assert_eq!(result.plugin_name, "audit");
    assert_eq!(result.version, "1.0.0");

    let meta = loader.metadata("audit").await.expect("metadata exists");
    assert_eq!(meta.status, PluginStatus::Installed);

    // The install callback created the audit table.
    assert!(store.statements.lock().unwrap()[0].starts_with("CREATE TABLE"));

    // A content creation flows through the audit hook and comes back
    // stamped.
    let payload = json!({
        "title": "Launch post",
        "metadata": {}
    });
    let out = loader
        .dispatcher()
        .execute("content:create", payload, &ctx)
        .await
        .expect("pipeline succeeds");
    assert_eq!(out["title"], "Launch post");
    assert_eq!(out["metadata"]["audit"]["type"], "audit");
    assert!(store
        .statements
        .lock()
        .unwrap()
        .iter()
        .any(|s| s.starts_with("INSERT INTO audit_log")));

    // Uninstall with data removal: hooks are gone, the table is dropped,
    // metadata is retained.
    let result = loader.uninstall("audit", &ctx, true).await;
    assert!(result.success);
    assert!(loader.get_plugin("audit").await.is_none());
    assert_eq!(
        loader.metadata("audit").await.expect("retained").status,
        PluginStatus::Uninstalled
    );
    assert!(store
        .statements
        .lock()
        .unwrap()
        .iter()
        .any(|s| s.starts_with("DROP TABLE")));

    // With the hook unregistered, payloads pass through untouched.
    let payload = json!({"title": "Second post", "metadata": {}});
    let out = loader
        .dispatcher()
        .execute("content:create", payload.clone(), &ctx)
        .await
        .expect("empty pipeline succeeds");
    assert_eq!(out, payload);
}

#[tokio::test]
async fn test_two_plugins_share_the_hook_pipeline() {
    let source = Arc::new(BundledSource::new());
    source.register_definition("plugins/audit", audit_plugin());
    source.register_definition(
        "plugins/seo",
        PluginBuilder::new("seo", "0.2.0", "Fills in SEO defaults")
            .hook("content:create", 1, Arc::new(|mut payload, _ctx| -> HookFuture {
                Box::pin(async move {
                    if payload["metadata"]["slug"].is_null() {
                        let title = payload["title"].as_str().unwrap_or_default();
                        payload["metadata"]["slug"] =
                            json!(title.to_lowercase().replace(' ', "-"));
                    }
                    Ok(payload)
                })
            }))
            .build()
            .expect("seo plugin definition is valid"),
    );

    let loader = PluginLoader::new(source);
    let store = Arc::new(RecordingStore::default());
    let ctx = host(&loader, store);

    for path in ["plugins/audit", "plugins/seo"] {
        let result = loader
            .load(LoadOptions::new(path).auto_install(true), &ctx)
            .await;
        assert!(result.success, "install of {path} failed: {:?}", result.error);
    }

    // seo (priority 1) runs before audit (priority 5); both see the
    // accumulated payload.
    let out = loader
        .dispatcher()
        .execute("content:create", json!({"title": "Hello World", "metadata": {}}), &ctx)
        .await
        .expect("pipeline succeeds");
    assert_eq!(out["metadata"]["slug"], "hello-world");
    assert_eq!(out["metadata"]["audit"]["type"], "audit");

    // Uninstalling one plugin leaves the other's hooks in place.
    assert!(loader.uninstall("seo", &ctx, false).await.success);
    let out = loader
        .dispatcher()
        .execute("content:create", json!({"title": "No Slug", "metadata": {}}), &ctx)
        .await
        .expect("pipeline succeeds");
    assert!(out["metadata"]["slug"].is_null());
    assert_eq!(out["metadata"]["audit"]["type"], "audit");
}
