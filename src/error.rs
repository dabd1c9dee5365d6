use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("No home directory")]
    NoHomeDir,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown task type: {0}")]
    UnknownTaskType(String),

    #[error("No eligible worker for role: {0}")]
    NoEligibleWorker(crate::worker::Role),

    #[error("Cyclic dependency among subtasks: {stuck:?}")]
    CyclicDependency {
        /// Subtasks that could never reach in-degree zero.
        stuck: Vec<String>,
    },

    #[error("Executor failure on subtask {subtask}: {message}")]
    ExecutorFailure { subtask: String, message: String },

    #[error("Task deadline exceeded after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Task was cancelled")]
    Cancelled,

    #[error("Task not found: {0}")]
    TaskNotFound(crate::core::task::TaskId),

    #[error("Worker not found: {0}")]
    WorkerNotFound(crate::worker::WorkerId),

    #[error("Task join error: {0}")]
    TaskJoin(String),
}

pub type Result<T> = std::result::Result<T, Error>;
