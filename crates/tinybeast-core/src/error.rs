use tinybeast_types::DictId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Orchestrator is not running")]
    ChannelClosed,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("Unknown dictionary: {0}")]
    UnknownDictionary(DictId),

    #[error("Dictionary {0} has an operation in progress")]
    Busy(DictId),

    #[error("Dictionary {0} is not installed")]
    NotInstalled(DictId),

    #[error("Dictionary {0} is not downloading")]
    NotDownloading(DictId),

    #[error("Dictionary {0} is being installed and cannot be cancelled")]
    NotCancelable(DictId),

    #[error("Backend error for {dict}: {message}")]
    Backend { dict: DictId, message: String },
}
