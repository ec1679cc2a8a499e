//! Single-slot model cache.
//!
//! At most one model variant is resident at a time.  Asking for a different
//! variant evicts the resident one before loading the new one, so two large
//! models never share GPU memory.  The slot itself is not synchronised; the
//! owner keeps it behind the same lock that guards generation.

use std::sync::Arc;

use crate::llm::corrector::CorrectionError;
use crate::llm::runtime::{ModelLoader, TextGenerator};

/// Holds the single resident model variant.
pub struct ModelSlot {
    loader: Arc<dyn ModelLoader>,
    resident: Option<(String, Box<dyn TextGenerator>)>,
}

impl ModelSlot {
    pub fn new(loader: Arc<dyn ModelLoader>) -> Self {
        Self {
            loader,
            resident: None,
        }
    }

    /// Identifier of the resident variant, if any.
    pub fn current(&self) -> Option<&str> {
        self.resident.as_ref().map(|(id, _)| id.as_str())
    }

    /// Make `identifier` resident and return its generator.
    ///
    /// A hit returns the cached generator without touching the loader.  On
    /// a miss the previous variant is evicted first; if the new load fails
    /// the slot is left empty.
    pub async fn ensure_loaded(
        &mut self,
        identifier: &str,
    ) -> Result<&dyn TextGenerator, CorrectionError> {
        let hit = matches!(&self.resident, Some((id, _)) if id == identifier);

        if !hit {
            if let Some((old, generator)) = self.resident.take() {
                drop(generator);
                log::info!("local-lm: evicting '{old}'");
                self.loader.unload(&old).await;
            }

            log::info!("local-lm: loading '{identifier}'");
            let generator = self.loader.load(identifier).await?;
            self.resident = Some((identifier.to_string(), generator));
            log::info!("local-lm: '{identifier}' loaded");
        }

        match &self.resident {
            Some((_, generator)) => Ok(generator.as_ref()),
            None => Err(CorrectionError::ModelLoad {
                model: identifier.to_string(),
                reason: "model slot empty after load".into(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::runtime::GenerationParams;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Named(String);

    #[async_trait]
    impl TextGenerator for Named {
        async fn generate(
            &self,
            _prompt: &str,
            _params: &GenerationParams,
        ) -> Result<String, CorrectionError> {
            Ok(self.0.clone())
        }
    }

    /// Records every load/unload call.
    #[derive(Default)]
    struct RecordingLoader {
        events: Mutex<Vec<String>>,
        fail_on: Option<String>,
    }

    #[async_trait]
    impl ModelLoader for RecordingLoader {
        async fn load(&self, identifier: &str) -> Result<Box<dyn TextGenerator>, CorrectionError> {
            self.events.lock().unwrap().push(format!("load {identifier}"));
            if self.fail_on.as_deref() == Some(identifier) {
                return Err(CorrectionError::ModelLoad {
                    model: identifier.into(),
                    reason: "boom".into(),
                });
            }
            Ok(Box::new(Named(identifier.to_string())))
        }

        async fn unload(&self, identifier: &str) {
            self.events.lock().unwrap().push(format!("unload {identifier}"));
        }
    }

    async fn generate_with(slot: &mut ModelSlot, id: &str) -> String {
        let generator = slot.ensure_loaded(id).await.expect("load");
        generator
            .generate("p", &GenerationParams::default())
            .await
            .expect("generate")
    }

    #[tokio::test]
    async fn same_variant_loads_once() {
        let loader = Arc::new(RecordingLoader::default());
        let mut slot = ModelSlot::new(loader.clone());

        assert_eq!(generate_with(&mut slot, "a").await, "a");
        assert_eq!(generate_with(&mut slot, "a").await, "a");

        assert_eq!(*loader.events.lock().unwrap(), vec!["load a"]);
        assert_eq!(slot.current(), Some("a"));
    }

    #[tokio::test]
    async fn switching_evicts_before_loading() {
        let loader = Arc::new(RecordingLoader::default());
        let mut slot = ModelSlot::new(loader.clone());

        generate_with(&mut slot, "a").await;
        assert_eq!(generate_with(&mut slot, "b").await, "b");

        assert_eq!(
            *loader.events.lock().unwrap(),
            vec!["load a", "unload a", "load b"]
        );
        assert_eq!(slot.current(), Some("b"));
    }

    #[tokio::test]
    async fn failed_load_leaves_slot_empty() {
        let loader = Arc::new(RecordingLoader {
            fail_on: Some("b".into()),
            ..RecordingLoader::default()
        });
        let mut slot = ModelSlot::new(loader.clone());

        generate_with(&mut slot, "a").await;
        assert!(slot.ensure_loaded("b").await.is_err());
        assert_eq!(slot.current(), None);
    }
}
