use thiserror::Error;

#[derive(Error, Debug)]
pub enum SleeplessError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Source list error at line {line}: {message}")]
    SourceList { line: usize, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
