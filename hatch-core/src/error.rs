use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid runtime identity '{0}': expected <workspace>:<environment>:<owner>")]
    InvalidIdentity(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}
