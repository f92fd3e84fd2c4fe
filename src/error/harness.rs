use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("Suite already registered: {name}")]
    DuplicateSuite { name: String },
    #[error("Unknown suite: {name}")]
    UnknownSuite { name: String },
    #[error("Failed to read selection: {source}")]
    ReadSelection {
        #[source]
        source: std::io::Error,
    },
}
