use camino::Utf8PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum CatalogError {
    #[error("invalid entry id: {0}")]
    InvalidEntryId(String),

    #[error("catalog request failed: {0}")]
    #[diagnostic(help("check the api_base setting and your network connection"))]
    Http(String),

    #[error("catalog returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("failed to decode catalog response: {0}")]
    Decode(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(Utf8PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid config value: {0}")]
    InvalidConfig(String),

    #[error("no catalog entries match {0:?}")]
    NoMatches(String),
}
