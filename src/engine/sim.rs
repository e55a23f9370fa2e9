//! Simulated adapters
//!
//! Category-level adapter implementations producing canned artifacts, so the
//! full loop can run end to end without network access or real tool
//! integrations. The binary registers one simulated adapter per catalog tool;
//! real adapters slot into the same registry without touching anything else.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::catalog::ToolCatalog;
use crate::domain::descriptor::ToolCategory;
use crate::domain::run::{Artifact, StepFailure};
use crate::engine::adapter::{AdapterRegistry, CancelFlag, ToolAdapter};

/// Canned sample value for a requested field
fn sample_value(field: &str) -> Value {
    match field {
        "title" => json!("Sample Product Title"),
        "price" => json!("$49.99"),
        "description" => json!("This is a sample product description."),
        "image" => json!("https://example.com/images/sample-product.jpg"),
        "rating" => json!("4.5 (123 reviews)"),
        other => json!(format!("Sample {} data", other)),
    }
}

/// Fetcher/renderer stand-in returning a fixed document
struct SimFetch {
    rendered: bool,
}

#[async_trait]
impl ToolAdapter for SimFetch {
    async fn invoke(
        &self,
        _input: Option<Artifact>,
        config: &BTreeMap<String, Value>,
        _cancel: CancelFlag,
    ) -> Result<Artifact, StepFailure> {
        let target = config
            .get("targets")
            .and_then(|t| t.as_array())
            .and_then(|t| t.first())
            .and_then(|t| t.as_str())
            .unwrap_or("about:blank");
        let body = format!("<html><body data-source=\"{}\"></body></html>", target);
        if self.rendered {
            Ok(Artifact::RenderedDocument(body))
        } else {
            Ok(Artifact::RawDocument(body))
        }
    }
}

/// Anti-bot stand-in: emits an access-granted document for the fetcher
struct SimAntiBlock;

#[async_trait]
impl ToolAdapter for SimAntiBlock {
    async fn invoke(
        &self,
        _input: Option<Artifact>,
        _config: &BTreeMap<String, Value>,
        _cancel: CancelFlag,
    ) -> Result<Artifact, StepFailure> {
        Ok(Artifact::RawDocument(
            "<html><!-- access granted --></html>".to_string(),
        ))
    }
}

/// Parser stand-in: one record with a sample value per configured selector
struct SimParse;

#[async_trait]
impl ToolAdapter for SimParse {
    async fn invoke(
        &self,
        input: Option<Artifact>,
        config: &BTreeMap<String, Value>,
        _cancel: CancelFlag,
    ) -> Result<Artifact, StepFailure> {
        if input.is_none() {
            return Err(StepFailure::adapter(
                "parse-error",
                "no document to parse",
            ));
        }
        let mut record = serde_json::Map::new();
        if let Some(Value::Object(selectors)) = config.get("selectors") {
            for field in selectors.keys() {
                record.insert(field.clone(), sample_value(field));
            }
        }
        Ok(Artifact::Records(vec![Value::Object(record)]))
    }
}

/// Post-processor stand-in: records pass through unchanged
struct SimPostProcess;

#[async_trait]
impl ToolAdapter for SimPostProcess {
    async fn invoke(
        &self,
        input: Option<Artifact>,
        _config: &BTreeMap<String, Value>,
        _cancel: CancelFlag,
    ) -> Result<Artifact, StepFailure> {
        match input {
            Some(records @ Artifact::Records(_)) => Ok(records),
            _ => Err(StepFailure::adapter(
                "extraction-failed",
                "nothing to post-process",
            )),
        }
    }
}

/// Registry with one simulated adapter per catalog tool
pub fn simulated_registry(catalog: &ToolCatalog) -> AdapterRegistry {
    let mut registry = AdapterRegistry::new();
    for tool in catalog.all() {
        let adapter: Arc<dyn ToolAdapter> = match tool.category {
            ToolCategory::Fetcher => Arc::new(SimFetch { rendered: false }),
            ToolCategory::Renderer => Arc::new(SimFetch { rendered: true }),
            ToolCategory::AntiBlock => Arc::new(SimAntiBlock),
            ToolCategory::Parser => Arc::new(SimParse),
            ToolCategory::PostProcessor => Arc::new(SimPostProcess),
        };
        registry.register(&tool.name, adapter);
    }
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::descriptor::ToolDescriptor;
    use crate::engine::adapter::CancelHandle;

    fn catalog() -> ToolCatalog {
        let mut catalog = ToolCatalog::new();
        catalog.add(ToolDescriptor::new("requests", ToolCategory::Fetcher));
        catalog.add(ToolDescriptor::new("playwright", ToolCategory::Renderer));
        catalog.add(ToolDescriptor::new("soup", ToolCategory::Parser));
        catalog
    }

    #[test]
    fn test_registry_covers_catalog() {
        let registry = simulated_registry(&catalog());
        assert!(registry.contains("requests"));
        assert!(registry.contains("playwright"));
        assert!(registry.contains("soup"));
        assert!(!registry.contains("unknown"));
    }

    #[tokio::test]
    async fn test_parse_produces_record_per_selector() {
        let registry = simulated_registry(&catalog());
        let adapter = registry.get("soup").unwrap();
        let (_handle, flag) = CancelHandle::new();

        let mut config = BTreeMap::new();
        config.insert(
            "selectors".to_string(),
            json!({"price": ".price", "title": "h1"}),
        );
        let artifact = adapter
            .invoke(
                Some(Artifact::RawDocument("<html/>".into())),
                &config,
                flag,
            )
            .await
            .unwrap();

        match artifact {
            Artifact::Records(records) => {
                assert_eq!(records.len(), 1);
                assert_eq!(records[0]["price"], json!("$49.99"));
                assert_eq!(records[0]["title"], json!("Sample Product Title"));
            }
            other => panic!("expected records, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_parse_without_document_fails() {
        let registry = simulated_registry(&catalog());
        let adapter = registry.get("soup").unwrap();
        let (_handle, flag) = CancelHandle::new();

        let err = adapter
            .invoke(None, &BTreeMap::new(), flag)
            .await
            .unwrap_err();
        assert_eq!(err.code, "parse-error");
    }

    #[tokio::test]
    async fn test_renderer_yields_rendered_document() {
        let registry = simulated_registry(&catalog());
        let adapter = registry.get("playwright").unwrap();
        let (_handle, flag) = CancelHandle::new();

        let mut config = BTreeMap::new();
        config.insert("targets".to_string(), json!(["https://example.com/p"]));
        let artifact = adapter.invoke(None, &config, flag).await.unwrap();
        match artifact {
            Artifact::RenderedDocument(body) => assert!(body.contains("example.com/p")),
            other => panic!("expected rendered document, got {:?}", other),
        }
    }
}
