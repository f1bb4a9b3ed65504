pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("missing configuration: {0}")]
    Missing(&'static str),
    #[error("http error: {0}")]
    Http(#[source] anyhow::Error),
    #[error("export error: {0}")]
    Export(#[source] anyhow::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AppError {
    pub fn http(err: impl Into<anyhow::Error>) -> Self {
        Self::Http(err.into())
    }

    pub fn export(err: impl Into<anyhow::Error>) -> Self {
        Self::Export(err.into())
    }
}
