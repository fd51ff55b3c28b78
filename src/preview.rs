use bytes::Bytes;
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

/// Temporary display references for locally held uploads, in the spirit of
/// `blob:` object URLs. Every reference handed out stays alive (and keeps its
/// bytes alive) until it is revoked or the registry is dropped.
#[derive(Debug, Default)]
pub struct PreviewRegistry {
    live: HashMap<String, Bytes>,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, bytes: Bytes) -> String {
        let url = format!("blob:modelshot/{}", Uuid::new_v4());
        debug!("🔖 Registered preview {} ({} bytes)", url, bytes.len());
        self.live.insert(url.clone(), bytes);
        url
    }

    /// Returns true if the reference was live.
    pub fn revoke(&mut self, url: &str) -> bool {
        let removed = self.live.remove(url).is_some();
        if removed {
            debug!("🧹 Revoked preview {}", url);
        }
        removed
    }

    pub fn resolve(&self, url: &str) -> Option<&Bytes> {
        self.live.get(url)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}

impl Drop for PreviewRegistry {
    fn drop(&mut self) {
        for (url, _) in self.live.drain() {
            debug!("🧹 Revoked preview {} on teardown", url);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn register_then_revoke() {
        let mut registry = PreviewRegistry::new();
        let url = registry.register(Bytes::from_static(b"abc"));

        assert!(url.starts_with("blob:modelshot/"));
        assert_eq!(registry.resolve(&url).map(|b| b.len()), Some(3));
        assert!(registry.revoke(&url));
        assert!(!registry.revoke(&url));
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn references_are_unique() {
        let mut registry = PreviewRegistry::new();
        let a = registry.register(Bytes::from_static(b"a"));
        let b = registry.register(Bytes::from_static(b"a"));
        assert_ne!(a, b);
        assert_eq!(registry.live_count(), 2);
    }

    #[test]
    fn drop_releases_every_live_reference() {
        let bytes = Bytes::from(vec![1u8, 2, 3]);
        let mut registry = PreviewRegistry::new();
        registry.register(bytes.clone());
        registry.register(bytes.clone());
        assert!(!bytes.is_unique());

        drop(registry);
        assert!(bytes.is_unique());
    }
}
