pub mod npm;

use crate::error::{MirrorError, Result};
use crate::traits::PackageManager;

pub const SUPPORTED_TOOLS: &[&str] = &["npm", "pnpm", "yarn"];

pub fn get_manager(name: &str) -> Result<Box<dyn PackageManager>> {
    let name = name.to_lowercase();
    if SUPPORTED_TOOLS.contains(&name.as_str()) {
        // 三者的 `config get/set registry` 语法一致
        Ok(Box::new(npm::NpmManager::new(&name)))
    } else {
        Err(MirrorError::UnknownTool(format!(
            "Unsupported tool: '{}'. Available: {}",
            name,
            SUPPORTED_TOOLS.join(", ")
        )))
    }
}
