use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::debug;

// ==============================================================================
// PREVIEW REGISTRY
// ==============================================================================

/// Registry of live local preview references.
///
/// A [`PreviewHandle`] stands in for an object URL: it stays valid while the
/// handle is alive and is revoked when the handle drops, so replacing a
/// submission's preview cannot leak the previous reference.
#[derive(Clone, Default)]
pub struct PreviewRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

#[derive(Default)]
struct RegistryInner {
    next_id: u64,
    live: HashMap<u64, PathBuf>,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `path` and return the revocable handle for it.
    pub fn create(&self, path: &Path) -> PreviewHandle {
        let mut inner = self.inner.lock().expect("preview registry poisoned");
        inner.next_id += 1;
        let id = inner.next_id;
        inner.live.insert(id, path.to_path_buf());

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video".to_string());

        PreviewHandle {
            id,
            url: format!("preview://{}/{}", id, name),
            registry: Arc::clone(&self.inner),
        }
    }

    pub fn live_count(&self) -> usize {
        self.inner.lock().expect("preview registry poisoned").live.len()
    }
}

/// Scoped preview reference; dropping it revokes the registration.
pub struct PreviewHandle {
    id: u64,
    url: String,
    registry: Arc<Mutex<RegistryInner>>,
}

impl PreviewHandle {
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.registry.lock() {
            inner.live.remove(&self.id);
        }
        debug!(preview_id = self.id, "Revoked preview reference");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_get_distinct_urls() {
        let registry = PreviewRegistry::new();
        let a = registry.create(Path::new("clip.mp4"));
        let b = registry.create(Path::new("clip.mp4"));
        assert_ne!(a.url(), b.url());
        assert!(a.url().ends_with("/clip.mp4"));
    }

    #[test]
    fn dropping_a_handle_revokes_it() {
        let registry = PreviewRegistry::new();
        let first = registry.create(Path::new("a.mp4"));
        let second = registry.create(Path::new("b.mp4"));
        assert_eq!(registry.live_count(), 2);
        drop(first);
        assert_eq!(registry.live_count(), 1);
        drop(second);
        assert_eq!(registry.live_count(), 0);
    }
}
