use thiserror::Error;

#[derive(Error, Debug)]
pub enum TonewheelError {
    #[error("Invalid Configuration: {0}")]
    Config(String),

    #[error("Sink Initialization Error: {0}")]
    SinkInit(String),

    #[error("Sink Error: {0}")]
    Sink(String),
}

pub type Result<T> = std::result::Result<T, TonewheelError>;
