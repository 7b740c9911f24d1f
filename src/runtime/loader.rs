use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::info;

use crate::error::AppError;
use crate::pipeline::preprocessing::TensorSpec;
use crate::runtime::{InferenceModule, TractModule};

type LoadFn = dyn Fn(&Path) -> Result<Arc<dyn InferenceModule>, AppError> + Send + Sync;

/// Loads a module the first time it is needed and hands out the same handle
/// afterwards.
pub struct ModuleLoader {
    path: PathBuf,
    load_fn: Arc<LoadFn>,
    module: OnceCell<Arc<dyn InferenceModule>>,
}

impl ModuleLoader {
    pub fn new<F>(path: impl Into<PathBuf>, load_fn: F) -> Self
    where
        F: Fn(&Path) -> Result<Arc<dyn InferenceModule>, AppError> + Send + Sync + 'static,
    {
        Self {
            path: path.into(),
            load_fn: Arc::new(load_fn),
            module: OnceCell::new(),
        }
    }

    /// Loader backed by [`TractModule`].
    pub fn tract(path: impl Into<PathBuf>, spec: TensorSpec) -> Self {
        Self::new(path, move |path| {
            let module = TractModule::load(path, &spec)?;
            Ok(Arc::new(module) as Arc<dyn InferenceModule>)
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_loaded(&self) -> bool {
        self.module.initialized()
    }

    /// Returns the module, loading it on a blocking worker on first use.
    pub async fn get(&self) -> Result<Arc<dyn InferenceModule>, AppError> {
        let module = self
            .module
            .get_or_try_init(|| async {
                let path = self.path.clone();
                let load_fn = Arc::clone(&self.load_fn);
                info!("Loading module from {}", path.display());
                tokio::task::spawn_blocking(move || load_fn(&path))
                    .await
                    .map_err(|e| AppError::ModuleLoad {
                        path: self.path.clone(),
                        reason: format!("loader task failed: {e}"),
                    })?
            })
            .await?;
        Ok(Arc::clone(module))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::fake::FakeModule;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn loads_once_and_reuses_handle() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&loads);
        let loader = ModuleLoader::new("model.onnx", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(FakeModule::constant("out", vec![1], vec![0.0])) as Arc<dyn InferenceModule>)
        });

        assert!(!loader.is_loaded());
        let first = loader.get().await.unwrap();
        let second = loader.get().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(loader.is_loaded());
    }

    #[tokio::test]
    async fn load_failure_is_reported() {
        let loader = ModuleLoader::new("broken.onnx", |path| {
            Err(AppError::ModuleLoad {
                path: path.to_path_buf(),
                reason: "corrupt".to_string(),
            })
        });
        let err = loader.get().await.err().unwrap();
        assert!(matches!(err, AppError::ModuleLoad { .. }));
        assert!(!loader.is_loaded());
    }
}
