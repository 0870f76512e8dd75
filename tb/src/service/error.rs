//! Service error types

use thiserror::Error;

use crate::loader::LoadError;
use crate::repo::RepoError;

/// Errors surfaced to API callers
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("Repository error: {0}")]
    Repository(#[from] RepoError),

    #[error("Load error: {0}")]
    Load(#[from] LoadError),
}

/// Response from service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Error code reported alongside an HTTP-style status
pub fn code_for_status(status: u16) -> &'static str {
    match status {
        400 => "BAD_REQUEST",
        401 => "UNAUTHORIZED",
        403 => "FORBIDDEN",
        404 => "NOT_FOUND",
        500 => "INTERNAL_SERVER_ERROR",
        _ => "UNKNOWN_ERROR",
    }
}

impl ServiceError {
    pub fn not_found(what: impl Into<String>) -> Self {
        ServiceError::NotFound(what.into())
    }

    pub fn bad_request(why: impl Into<String>) -> Self {
        ServiceError::BadRequest(why.into())
    }

    pub fn unauthorized(why: impl Into<String>) -> Self {
        ServiceError::Unauthorized(why.into())
    }

    /// HTTP-style status for this error
    pub fn status(&self) -> u16 {
        match self {
            ServiceError::NotFound(_) => 404,
            ServiceError::BadRequest(_) => 400,
            ServiceError::Unauthorized(_) => 401,
            ServiceError::Repository(e) if e.is_not_found() => 404,
            ServiceError::Repository(_) => 500,
            ServiceError::Load(_) => 500,
        }
    }

    /// Error code for this error
    pub fn code(&self) -> &'static str {
        code_for_status(self.status())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_and_code() {
        let err = ServiceError::not_found("Task not found");
        assert_eq!(err.status(), 404);
        assert_eq!(err.code(), "NOT_FOUND");
        assert_eq!(err.to_string(), "Task not found");

        let err = ServiceError::bad_request("Invalid due date format");
        assert_eq!(err.status(), 400);
        assert_eq!(err.code(), "BAD_REQUEST");

        let err = ServiceError::from(RepoError::Storage("disk full".to_string()));
        assert_eq!(err.status(), 500);
        assert_eq!(err.code(), "INTERNAL_SERVER_ERROR");

        let err = ServiceError::from(RepoError::NotFound {
            kind: "task",
            id: "t-1".to_string(),
        });
        assert_eq!(err.status(), 404);

        let err = ServiceError::unauthorized("no acting user");
        assert_eq!(err.status(), 401);
        assert_eq!(err.code(), "UNAUTHORIZED");

        let err = ServiceError::from(LoadError::Cancelled);
        assert_eq!(err.status(), 500);
    }

    #[test]
    fn test_code_for_unknown_status() {
        assert_eq!(code_for_status(401), "UNAUTHORIZED");
        assert_eq!(code_for_status(403), "FORBIDDEN");
        assert_eq!(code_for_status(418), "UNKNOWN_ERROR");
    }
}
