use crate::error::{MirrorError, Result};
use crate::probe::ActiveRegistryProbe;
use crate::traits::{PackageManager, Store};
use crate::types::{CurrentMirror, Mirror, MirrorSet, PingResult};
use crate::utils;
use reqwest::Client;
use tracing::{info, warn};

/// `ls` 的一行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRow {
    pub is_active: bool,
    pub name: String,
    pub registry: String,
}

/// Renders rows as `* name------ url`, padding marker+name with `-` to the
/// longest name plus three.
pub fn render_rows(rows: &[ListRow]) -> Vec<String> {
    let width = rows
        .iter()
        .map(|r| r.name.chars().count())
        .max()
        .unwrap_or(0)
        + 3;

    rows.iter()
        .map(|r| {
            let marker = if r.is_active { "* " } else { "  " };
            let prefix: String = format!("{}{}", marker, r.name).chars().take(width).collect();
            let fill = "-".repeat(width - prefix.chars().count());
            format!("{}{} {}", prefix, fill, r.registry)
        })
        .collect()
}

/// 镜像管理的所有操作, 与输入输出方式无关
///
/// Every mutating operation validates its inputs against the loaded set
/// before anything is written, then persists the whole set once.
pub struct MirrorCommands<'a> {
    store: &'a dyn Store,
    probe: ActiveRegistryProbe<'a>,
}

impl<'a> MirrorCommands<'a> {
    pub fn new(store: &'a dyn Store, manager: &'a dyn PackageManager) -> Self {
        Self {
            store,
            probe: ActiveRegistryProbe::new(manager),
        }
    }

    pub async fn load(&self) -> Result<MirrorSet> {
        self.store.load().await
    }

    /// 可删除/重命名/编辑的候选; 没有自定义源时直接报错
    pub fn custom_candidates(&self, set: &MirrorSet, action: &'static str) -> Result<Vec<String>> {
        let names = set.custom_names();
        if names.is_empty() {
            return Err(MirrorError::NoCustomMirrors(action));
        }
        Ok(names)
    }

    pub async fn list(&self, set: &MirrorSet) -> Vec<ListRow> {
        // 查询失败时仍然列出, 只是不标记当前源
        let current = match self.probe.current_mirror_name(set).await {
            Ok(c) => Some(c),
            Err(e) => {
                warn!(error = %e, "could not determine active registry");
                None
            }
        };

        set.iter()
            .map(|m| ListRow {
                is_active: matches!(&current, Some(CurrentMirror::Resolved(n)) if *n == m.name),
                name: m.name.clone(),
                registry: m.registry.clone(),
            })
            .collect()
    }

    pub async fn current(&self, set: &MirrorSet) -> Result<CurrentMirror> {
        self.probe.current_mirror_name(set).await
    }

    pub async fn use_mirror(&self, set: &MirrorSet, name: &str) -> Result<Mirror> {
        let mirror = set
            .get(name)
            .ok_or_else(|| MirrorError::UnknownMirror(name.to_string()))?;
        self.probe.set_active_registry(&mirror.registry).await?;
        info!(mirror = name, registry = %mirror.registry, "registry switched");
        Ok(mirror.clone())
    }

    pub async fn add(&self, set: &mut MirrorSet, name: &str, url: &str) -> Result<Mirror> {
        let mirror = set.add(name, url)?.clone();
        self.store.save(set).await?;
        Ok(mirror)
    }

    pub async fn delete(&self, set: &mut MirrorSet, name: &str) -> Result<Mirror> {
        // 先做本地检查, 内置源不必再去查询 npm
        set.validate_custom(name, "delete")?;
        let active = self.probe.current_registry_url().await?;
        let removed = set.delete(name, &active)?;
        self.store.save(set).await?;
        Ok(removed)
    }

    pub async fn rename(&self, set: &mut MirrorSet, old_name: &str, new_name: &str) -> Result<Mirror> {
        let mirror = set.rename(old_name, new_name)?.clone();
        self.store.save(set).await?;
        Ok(mirror)
    }

    pub async fn edit(&self, set: &mut MirrorSet, name: &str, new_url: &str) -> Result<Mirror> {
        let mirror = set.edit(name, new_url)?.clone();
        self.store.save(set).await?;
        Ok(mirror)
    }

    pub async fn ping(&self, client: &Client, set: &MirrorSet, name: &str) -> Result<u64> {
        let mirror = set
            .get(name)
            .ok_or_else(|| MirrorError::UnknownMirror(name.to_string()))?;
        utils::ping_mirror(client, mirror).await
    }

    pub async fn ping_all(&self, client: &Client, set: &MirrorSet) -> Vec<PingResult> {
        utils::benchmark_mirrors(client, set.iter().cloned().collect()).await
    }
}
