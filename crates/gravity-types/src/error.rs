use thiserror::Error;

#[derive(Error, Debug)]
pub enum GravityError {
    #[error("Input error: {0}")]
    Input(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Linear algebra error: {0}")]
    LinAlg(String),

    #[error("Numerical failure at iteration {iteration}: {message}")]
    Numerical { iteration: usize, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type GravityResult<T> = Result<T, GravityError>;
