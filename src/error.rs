use thiserror::Error;

#[derive(Error, Debug)]
pub enum MirrorError {
    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid registries file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Mirror '{0}' already exists")]
    DuplicateName(String),

    #[error("Mirror {0} must not be empty")]
    EmptyField(&'static str),

    #[error("Mirror '{0}' is built-in and cannot be modified")]
    ProtectedName(String),

    #[error("No custom mirrors to {0}")]
    NoCustomMirrors(&'static str),

    #[error("Mirror '{name}' is still in use ({registry})")]
    ActiveRegistryInUse { name: String, registry: String },

    #[error("Mirror '{0}' not found. Use 'ls' to see available list.")]
    UnknownMirror(String),

    #[error("Unknown package manager: {0}")]
    UnknownTool(String),

    #[error("'{program}' failed: {reason}")]
    ExternalTool { program: String, reason: String },

    #[error("Input aborted")]
    Aborted,

    #[error("Ping {url} failed: {reason}")]
    PingFailed { url: String, reason: String },
}

impl MirrorError {
    /// 是否属于 "内置源不可修改" 一类的错误
    pub fn is_protected(&self) -> bool {
        matches!(
            self,
            MirrorError::ProtectedName(_) | MirrorError::NoCustomMirrors(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, MirrorError>;
