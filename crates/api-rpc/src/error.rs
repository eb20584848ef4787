//! RPC Error Types
//!
//! Maps application errors to JSON-RPC error codes.

use jsonrpsee::types::ErrorObjectOwned;
use kvqueue_core::error::AppError;

/// RPC Error Codes
pub mod code {
    pub const INVALID_ARGUMENT: i32 = 4000;
    pub const NOT_FOUND: i32 = 4001;
    pub const ALREADY_EXISTS: i32 = 4002;
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const STORAGE_ERROR: i32 = 5001;
}

/// Convert AppError to JSON-RPC ErrorObject
pub fn to_rpc_error(err: AppError) -> ErrorObjectOwned {
    match err {
        AppError::InvalidArgument(msg) => {
            ErrorObjectOwned::owned(code::INVALID_ARGUMENT, msg, None::<()>)
        }
        AppError::NotFound(msg) => ErrorObjectOwned::owned(code::NOT_FOUND, msg, None::<()>),
        AppError::AlreadyExists(msg) => {
            ErrorObjectOwned::owned(code::ALREADY_EXISTS, msg, None::<()>)
        }
        AppError::Storage(msg) => ErrorObjectOwned::owned(code::STORAGE_ERROR, msg, None::<()>),
        AppError::Io(e) => ErrorObjectOwned::owned(code::STORAGE_ERROR, e.to_string(), None::<()>),
        AppError::Domain(e) => {
            ErrorObjectOwned::owned(code::INTERNAL_ERROR, e.to_string(), None::<()>)
        }
        AppError::Serialization(e) => {
            ErrorObjectOwned::owned(code::INTERNAL_ERROR, e.to_string(), None::<()>)
        }
        AppError::Config(msg) => ErrorObjectOwned::owned(code::INTERNAL_ERROR, msg, None::<()>),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            to_rpc_error(AppError::queue_not_found("q1")).code(),
            code::NOT_FOUND
        );
        assert_eq!(
            to_rpc_error(AppError::AlreadyExists("q1".into())).code(),
            code::ALREADY_EXISTS
        );
        assert_eq!(
            to_rpc_error(AppError::Storage("disk full".into())).code(),
            code::STORAGE_ERROR
        );

        let err = to_rpc_error(AppError::InvalidArgument("message must not be empty".into()));
        assert_eq!(err.code(), code::INVALID_ARGUMENT);
        assert_eq!(err.message(), "message must not be empty");
    }
}
