use crate::error::Result;
use crate::traits::PackageManager;
use crate::types::{CurrentMirror, MirrorSet};
use tracing::debug;

/// 查询包管理器当前使用的 registry, 并映射回镜像名
pub struct ActiveRegistryProbe<'a> {
    manager: &'a dyn PackageManager,
}

impl<'a> ActiveRegistryProbe<'a> {
    pub fn new(manager: &'a dyn PackageManager) -> Self {
        Self { manager }
    }

    pub async fn current_registry_url(&self) -> Result<String> {
        let url = self.manager.get_registry().await?;
        Ok(url.trim().to_string())
    }

    pub async fn current_mirror_name(&self, set: &MirrorSet) -> Result<CurrentMirror> {
        let url = self.current_registry_url().await?;
        Ok(resolve(set, &url))
    }

    pub async fn set_active_registry(&self, url: &str) -> Result<()> {
        debug!(manager = self.manager.name(), url, "switching registry");
        self.manager.set_registry(url).await
    }
}

/// First mirror in set order whose registry equals `url` after trimming.
pub fn resolve(set: &MirrorSet, url: &str) -> CurrentMirror {
    match set.find_by_registry(url) {
        Some(m) => CurrentMirror::Resolved(m.name.clone()),
        None => CurrentMirror::Unresolved(url.trim().to_string()),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::MirrorError;
    use crate::types::Mirror;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// 内存中的假包管理器, 记录 set 调用; registry 为 None 时模拟未安装
    pub struct FakeManager {
        pub registry: Mutex<Option<String>>,
        pub sets: Mutex<Vec<String>>,
    }

    impl FakeManager {
        pub fn new(registry: &str) -> Self {
            Self {
                registry: Mutex::new(Some(registry.to_string())),
                sets: Mutex::new(Vec::new()),
            }
        }

        pub fn failing() -> Self {
            Self {
                registry: Mutex::new(None),
                sets: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl PackageManager for FakeManager {
        fn name(&self) -> &str {
            "fake"
        }

        async fn get_registry(&self) -> Result<String> {
            self.registry
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| MirrorError::ExternalTool {
                    program: "fake".to_string(),
                    reason: "not installed".to_string(),
                })
        }

        async fn set_registry(&self, url: &str) -> Result<()> {
            let mut registry = self.registry.lock().unwrap();
            if registry.is_none() {
                return Err(MirrorError::ExternalTool {
                    program: "fake".to_string(),
                    reason: "not installed".to_string(),
                });
            }
            *registry = Some(url.to_string());
            self.sets.lock().unwrap().push(url.to_string());
            Ok(())
        }
    }

    fn set_with_npm(registry: &str) -> MirrorSet {
        let mut set = MirrorSet::new();
        set.push(Mirror {
            name: "npm".to_string(),
            home: "https://www.npmjs.org".to_string(),
            registry: registry.to_string(),
            ping: "https://registry.npmjs.org".to_string(),
        });
        set.push(Mirror::from_url("taobao", "https://registry.npmmirror.com/"));
        set
    }

    #[tokio::test]
    async fn test_current_resolves_by_trimmed_url() -> Result<()> {
        let manager = FakeManager::new("  https://registry.npmjs.org\n");
        let probe = ActiveRegistryProbe::new(&manager);
        let set = set_with_npm("https://registry.npmjs.org");

        assert_eq!(probe.current_registry_url().await?, "https://registry.npmjs.org");
        assert_eq!(
            probe.current_mirror_name(&set).await?,
            CurrentMirror::Resolved("npm".to_string())
        );
        Ok(())
    }

    #[test]
    fn test_no_normalization_beyond_trim() {
        let set = set_with_npm("https://registry.npmjs.org/");
        assert_eq!(
            resolve(&set, "https://registry.npmjs.org"),
            CurrentMirror::Unresolved("https://registry.npmjs.org".to_string())
        );
        assert_eq!(
            resolve(&set, "HTTPS://registry.npmmirror.com/"),
            CurrentMirror::Unresolved("HTTPS://registry.npmmirror.com/".to_string())
        );
    }

    #[test]
    fn test_first_match_wins() {
        let mut set = set_with_npm("https://registry.npmmirror.com/");
        set.push(Mirror::from_url("later", "https://registry.npmmirror.com/"));
        assert_eq!(
            resolve(&set, "https://registry.npmmirror.com/"),
            CurrentMirror::Resolved("npm".to_string())
        );
    }

    #[tokio::test]
    async fn test_probe_propagates_external_errors() {
        let manager = FakeManager::failing();
        let probe = ActiveRegistryProbe::new(&manager);
        assert!(probe.current_registry_url().await.is_err());
    }
}
