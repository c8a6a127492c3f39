use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid tenant id {id:?}: {reason}")]
    InvalidTenantId { id: String, reason: &'static str },
}

pub type Result<T> = std::result::Result<T, Error>;
