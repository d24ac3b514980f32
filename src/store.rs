use crate::config;
use crate::error::Result;
use crate::traits::Store;
use crate::types::MirrorSet;
use async_trait::async_trait;
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// 镜像表的 JSON 文件存储
///
/// No locking is done around load/save: two invocations racing on the same
/// file can lose one of the updates.
pub struct JsonStore {
    path: PathBuf,
}

impl JsonStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

/// 序列化为 4 空格缩进的 JSON
pub fn to_pretty_json(set: &MirrorSet) -> Result<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    set.serialize(&mut ser)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

// 文件名格式: registries.json -> registries.json.tmp
fn temp_path(path: &Path) -> PathBuf {
    let file_name = path.file_name().unwrap_or_default().to_string_lossy();
    path.with_file_name(format!("{}.tmp", file_name))
}

#[async_trait]
impl Store for JsonStore {
    async fn load(&self) -> Result<MirrorSet> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = ?self.path, "registries file not found, using built-in mirrors");
                return Ok(config::default_mirrors());
            }
            Err(e) => return Err(e.into()),
        };
        let set: MirrorSet = serde_json::from_str(&content)?;
        debug!(path = ?self.path, count = set.len(), "loaded registries");
        Ok(set)
    }

    async fn save(&self, set: &MirrorSet) -> Result<()> {
        // 1. Ensure directory exists
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        // 2. Write to a sibling file, then rename over the target
        let content = to_pretty_json(set)?;
        let tmp = temp_path(&self.path);
        if let Err(e) = fs::write(&tmp, content).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        fs::rename(&tmp, &self.path).await?;

        info!(path = ?self.path, count = set.len(), "saved registries");
        Ok(())
    }

    fn path(&self) -> PathBuf {
        self.path.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MirrorError;
    use crate::types::Mirror;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_missing_file_uses_defaults() -> Result<()> {
        let dir = tempdir()?;
        let store = JsonStore::new(dir.path().join("registries.json"));

        let set = store.load().await?;
        assert_eq!(set, config::default_mirrors());
        assert!(!store.path().exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_add_save_load_roundtrip() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join("registries.json");
        let store = JsonStore::new(path.clone());

        let mut set = store.load().await?;
        set.add("foo", " https://foo.example/ ")?;
        store.save(&set).await?;

        let loaded = store.load().await?;
        assert_eq!(loaded.len(), 7);
        assert_eq!(
            loaded.get("foo"),
            Some(&Mirror {
                name: "foo".to_string(),
                home: "https://foo.example/".to_string(),
                registry: "https://foo.example/".to_string(),
                ping: "https://foo.example".to_string(),
            })
        );
        assert!(!temp_path(&path).exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_saved_file_is_indented_with_four_spaces() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("registries.json");
        let store = JsonStore::new(path.clone());

        store.save(&config::default_mirrors()).await?;
        let content = fs::read_to_string(&path).await?;
        assert!(content.starts_with("{\n    \"npm\": {\n        \"home\""));
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_file_is_parse_error() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("registries.json");
        fs::write(&path, "{ not json").await?;

        let err = JsonStore::new(path).load().await.unwrap_err();
        assert!(matches!(err, MirrorError::Parse(_)));
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_save_keeps_previous_file() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("registries.json");
        let store = JsonStore::new(path.clone());

        let mut set = config::default_mirrors();
        store.save(&set).await?;
        let before = fs::read(&path).await?;

        // 临时文件位置被目录占用, 写入必然失败
        fs::create_dir(temp_path(&path)).await?;
        set.add("foo", "https://foo.example/")?;
        let err = store.save(&set).await.unwrap_err();

        assert!(matches!(err, MirrorError::Io(_)));
        assert_eq!(fs::read(&path).await?, before);
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_inaccessible_dir_is_io_error() -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir()?;
        let locked = dir.path().join("locked");
        fs::create_dir(&locked).await?;
        let store = JsonStore::new(locked.join("registries.json"));
        store.save(&config::default_mirrors()).await?;
        fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).await?;

        let res = store.load().await;
        fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).await?;

        // root 不受权限位限制, 此时能正常读到文件
        match res {
            Err(err) => assert!(matches!(err, MirrorError::Io(_))),
            Ok(set) => assert_eq!(set, config::default_mirrors()),
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_unreadable_path_is_io_error() -> Result<()> {
        let dir = tempdir()?;
        // 目录无法当作文件读取
        let err = JsonStore::new(dir.path().to_path_buf()).load().await.unwrap_err();
        assert!(matches!(err, MirrorError::Io(_)));
        Ok(())
    }
}
