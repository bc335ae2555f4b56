use thiserror::Error;

use std::path::PathBuf;

#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("failed to read {}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("template error in {name}")]
    Template {
        name: String,
        #[source]
        source: tera::Error,
    },
    #[error("email not found or loaded: {0}")]
    EmailNotFound(String),
    #[error("email not found for given or default locale: {0}")]
    LocaleNotFound(String),
    #[error("transport error: {0}")]
    Transport(#[source] anyhow::Error),
    #[error("template load task failed")]
    Join(#[from] tokio::task::JoinError),
}

impl Error {
    pub(crate) fn load(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Load {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn template(name: impl Into<String>, source: tera::Error) -> Self {
        Error::Template {
            name: name.into(),
            source,
        }
    }
}
