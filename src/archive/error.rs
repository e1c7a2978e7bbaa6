use thiserror::Error;

/// Failures talking to a research data archive.
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("DATAVERSE_SERVER is not set; point it at the archive, e.g. https://demo.dataverse.org")]
    MissingServer,

    #[error("could not build HTTP client: {0}")]
    Init(String),

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("archive returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("archive API error: {0}")]
    Api(String),

    #[error("no file named '{label}' in dataset {doi}")]
    FileNotFound { label: String, doi: String },

    #[error("could not decode archive response: {0}")]
    Decode(String),

    #[error("file is not tabular: {0}")]
    Tabular(String),
}
