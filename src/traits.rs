use crate::error::Result;
use crate::types::MirrorSet;
use async_trait::async_trait;
use std::path::PathBuf;

/// PackageManager: 读写包管理器 registry 配置的接口
#[async_trait]
pub trait PackageManager: Sync + Send {
    /// 工具名称 (如 "npm", "pnpm")
    fn name(&self) -> &str;

    /// 获取当前正在使用的 registry (已去除首尾空白)
    async fn get_registry(&self) -> Result<String>;

    /// 写入新的 registry 到包管理器的全局配置
    async fn set_registry(&self, url: &str) -> Result<()>;
}

/// Store: 镜像表的持久化
#[async_trait]
pub trait Store: Sync + Send {
    /// 读取镜像表; 文件不存在时返回内置默认表
    async fn load(&self) -> Result<MirrorSet>;

    /// 写回完整的镜像表
    async fn save(&self, set: &MirrorSet) -> Result<()>;

    /// 存储文件路径 (用于日志显示)
    fn path(&self) -> PathBuf;
}
