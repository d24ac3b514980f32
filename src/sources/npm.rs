use crate::error::{MirrorError, Result};
use crate::traits::PackageManager;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{debug, warn};

/// 通过 `<program> config get/set registry` 管理 registry
pub struct NpmManager {
    name: String,
    program: PathBuf,
}

impl NpmManager {
    pub fn new(program: &str) -> Self {
        Self {
            name: program.to_string(),
            program: PathBuf::from(program),
        }
    }

    #[cfg(test)]
    pub fn with_program(program: PathBuf) -> Self {
        Self {
            name: "npm".to_string(),
            program,
        }
    }

    async fn run_config(&self, args: &[&str]) -> Result<String> {
        debug!(program = ?self.program, ?args, "running package manager");

        // Windows 上 npm 是 npm.cmd, 需要经由 cmd 调用
        let output = if cfg!(target_os = "windows") {
            Command::new("cmd")
                .arg("/C")
                .arg(&self.program)
                .arg("config")
                .args(args)
                .output()
                .await
        } else {
            Command::new(&self.program)
                .arg("config")
                .args(args)
                .output()
                .await
        };

        let output = output.map_err(|e| {
            warn!(program = ?self.program, error = %e, "failed to spawn package manager");
            MirrorError::ExternalTool {
                program: self.name.clone(),
                reason: e.to_string(),
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(program = ?self.program, status = %output.status, %stderr, "package manager exited with error");
            return Err(MirrorError::ExternalTool {
                program: self.name.clone(),
                reason: if stderr.is_empty() {
                    output.status.to_string()
                } else {
                    stderr
                },
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl PackageManager for NpmManager {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_registry(&self) -> Result<String> {
        self.run_config(&["get", "registry"]).await
    }

    async fn set_registry(&self, url: &str) -> Result<()> {
        self.run_config(&["set", "registry", url]).await?;
        Ok(())
    }
}
