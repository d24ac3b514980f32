use crate::error::{MirrorError, Result};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// 内置镜像源，不可删除、重命名或编辑
pub const BUILTIN_NAMES: &[&str] = &["npm", "yarn", "tencent", "cnpm", "taobao", "npmMirror"];

pub fn is_protected(name: &str) -> bool {
    BUILTIN_NAMES.contains(&name)
}

/// 删除 URL 末尾的一个 `/` (只删一个)
pub fn strip_trailing_slash(url: &str) -> &str {
    url.strip_suffix('/').unwrap_or(url)
}

/// 镜像源定义
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mirror {
    pub name: String,     // 例如: "taobao"
    pub home: String,     // 镜像主页, 仅用于展示
    pub registry: String, // 例如: "https://registry.npmmirror.com/"
    pub ping: String,     // 测速地址, registry 去掉末尾的 '/'
}

impl Mirror {
    /// 按用户输入的地址构造, home/registry 取去空白后的地址
    pub fn from_url(name: &str, url: &str) -> Self {
        let url = url.trim();
        Self {
            name: name.to_string(),
            home: url.to_string(),
            registry: url.to_string(),
            ping: strip_trailing_slash(url).to_string(),
        }
    }
}

pub fn validate_url(input: &str) -> Result<()> {
    if input.trim().is_empty() {
        return Err(MirrorError::EmptyField("url"));
    }
    Ok(())
}

/// 当前 npm 使用的源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CurrentMirror {
    /// 匹配到了已知镜像
    Resolved(String),
    /// 未知地址, 保存原始 URL
    Unresolved(String),
}

impl fmt::Display for CurrentMirror {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CurrentMirror::Resolved(name) => f.write_str(name),
            CurrentMirror::Unresolved(url) => f.write_str(url),
        }
    }
}

/// 测速结果
#[derive(Debug)]
pub struct PingResult {
    pub mirror: Mirror,
    pub latency: Result<u64>, // 延迟 (毫秒)
}

/// 有序的镜像表, 保持文件中的顺序
///
/// Mutations validate every input before touching the list, so a failed
/// call leaves the set exactly as it was.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MirrorSet {
    mirrors: Vec<Mirror>,
}

impl MirrorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.mirrors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Mirror> {
        self.mirrors.iter()
    }

    pub fn names(&self) -> Vec<String> {
        self.mirrors.iter().map(|m| m.name.clone()).collect()
    }

    /// 可以删除/重命名/编辑的自定义源
    pub fn custom_names(&self) -> Vec<String> {
        self.mirrors
            .iter()
            .filter(|m| !is_protected(&m.name))
            .map(|m| m.name.clone())
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&Mirror> {
        self.mirrors.iter().find(|m| m.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// 按 registry 地址查找 (去空白后精确比较)
    pub fn find_by_registry(&self, url: &str) -> Option<&Mirror> {
        let url = url.trim();
        self.mirrors.iter().find(|m| m.registry.trim() == url)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.mirrors.iter().position(|m| m.name == name)
    }

    /// 检查新名称: 非空且不重复
    pub fn validate_new_name(&self, input: &str) -> Result<()> {
        let name = input.trim();
        if name.is_empty() {
            return Err(MirrorError::EmptyField("name"));
        }
        if self.contains(name) {
            return Err(MirrorError::DuplicateName(name.to_string()));
        }
        Ok(())
    }

    /// 检查可修改的自定义源: 存在自定义源, 且不是内置源
    pub fn validate_custom(&self, name: &str, action: &'static str) -> Result<()> {
        if self.custom_names().is_empty() {
            return Err(MirrorError::NoCustomMirrors(action));
        }
        if is_protected(name) {
            return Err(MirrorError::ProtectedName(name.to_string()));
        }
        if !self.contains(name) {
            return Err(MirrorError::UnknownMirror(name.to_string()));
        }
        Ok(())
    }

    /// Inserts without validation; used when building the set from disk or defaults.
    pub(crate) fn push(&mut self, mirror: Mirror) {
        match self.position(&mirror.name) {
            Some(idx) => self.mirrors[idx] = mirror,
            None => self.mirrors.push(mirror),
        }
    }

    pub fn add(&mut self, name: &str, url: &str) -> Result<&Mirror> {
        self.validate_new_name(name)?;
        validate_url(url)?;

        self.mirrors.push(Mirror::from_url(name.trim(), url));
        Ok(&self.mirrors[self.mirrors.len() - 1])
    }

    /// 删除自定义源; `active_url` 为 npm 当前使用的地址
    pub fn delete(&mut self, name: &str, active_url: &str) -> Result<Mirror> {
        self.validate_custom(name, "delete")?;
        let idx = self
            .position(name)
            .ok_or_else(|| MirrorError::UnknownMirror(name.to_string()))?;

        let registry = &self.mirrors[idx].registry;
        if registry.trim() == active_url.trim() {
            return Err(MirrorError::ActiveRegistryInUse {
                name: name.to_string(),
                registry: registry.clone(),
            });
        }

        Ok(self.mirrors.remove(idx))
    }

    /// 重命名: 保留所有字段和位置, 只改名字
    pub fn rename(&mut self, old_name: &str, new_name: &str) -> Result<&Mirror> {
        self.validate_custom(old_name, "rename")?;
        self.validate_new_name(new_name)?;
        let idx = self
            .position(old_name)
            .ok_or_else(|| MirrorError::UnknownMirror(old_name.to_string()))?;

        self.mirrors[idx].name = new_name.trim().to_string();
        Ok(&self.mirrors[idx])
    }

    pub fn edit(&mut self, name: &str, new_url: &str) -> Result<&Mirror> {
        self.validate_custom(name, "edit")?;
        validate_url(new_url)?;
        let idx = self
            .position(name)
            .ok_or_else(|| MirrorError::UnknownMirror(name.to_string()))?;

        self.mirrors[idx] = Mirror::from_url(name, new_url);
        Ok(&self.mirrors[idx])
    }
}

// --- 文件格式: { name: { home, registry, ping } } ---

#[derive(Serialize)]
struct EntryRef<'a> {
    home: &'a str,
    registry: &'a str,
    ping: &'a str,
}

#[derive(Deserialize)]
struct Entry {
    home: String,
    registry: String,
    ping: String,
}

impl Serialize for MirrorSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.mirrors.len()))?;
        for m in &self.mirrors {
            let entry = EntryRef {
                home: &m.home,
                registry: &m.registry,
                ping: &m.ping,
            };
            map.serialize_entry(&m.name, &entry)?;
        }
        map.end()
    }
}

struct MirrorSetVisitor;

impl<'de> Visitor<'de> for MirrorSetVisitor {
    type Value = MirrorSet;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of mirror name to {home, registry, ping}")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<MirrorSet, A::Error> {
        let mut set = MirrorSet::new();
        while let Some((name, entry)) = access.next_entry::<String, Entry>()? {
            if name.trim().is_empty() {
                return Err(serde::de::Error::custom("mirror name must not be empty"));
            }
            set.push(Mirror {
                name,
                home: entry.home,
                registry: entry.registry,
                ping: entry.ping,
            });
        }
        Ok(set)
    }
}

impl<'de> Deserialize<'de> for MirrorSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(MirrorSetVisitor)
    }
}
