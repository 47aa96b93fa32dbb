use thiserror::Error;

#[derive(Error, Debug)]
pub enum TypesError {
    #[error("Invalid wallet address: {0}")]
    InvalidAddress(String),
}

pub type Result<T> = std::result::Result<T, TypesError>;
