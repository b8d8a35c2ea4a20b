//! RPC Error Types
//!
//! Maps application errors to JSON-RPC error codes.

use healthcheck_core::error::AppError;
use jsonrpsee::types::ErrorObjectOwned;

/// RPC Error Codes
pub mod code {
    pub const VALIDATION_ERROR: i32 = 4000;
    pub const NOT_FOUND: i32 = 4001;
    pub const CONFLICT: i32 = 4002;
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const DB_ERROR: i32 = 5001;
}

/// Convert AppError to JSON-RPC ErrorObject
pub fn to_rpc_error(err: AppError) -> ErrorObjectOwned {
    let code = match &err {
        AppError::Validation(_) | AppError::Domain(_) | AppError::Serialization(_) => {
            code::VALIDATION_ERROR
        }
        AppError::NotFound(_) => code::NOT_FOUND,
        AppError::Conflict(_) | AppError::InvalidState(_) | AppError::LockHeld(_) => {
            code::CONFLICT
        }
        AppError::Database(_) => code::DB_ERROR,
        AppError::Backend(_)
        | AppError::MissingHandle(_)
        | AppError::Timeout(_)
        | AppError::Panicked(_)
        | AppError::Internal(_) => code::INTERNAL_ERROR,
    };

    let message = match err {
        AppError::Validation(msg)
        | AppError::NotFound(msg)
        | AppError::Conflict(msg)
        | AppError::Database(msg)
        | AppError::Internal(msg) => msg,
        other => other.to_string(),
    };

    ErrorObjectOwned::owned(code, message, None::<()>)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let cases = [
            (AppError::Validation("bad".into()), code::VALIDATION_ERROR),
            (AppError::NotFound("t1".into()), code::NOT_FOUND),
            (AppError::Conflict("dup".into()), code::CONFLICT),
            (AppError::LockHeld("t1".into()), code::CONFLICT),
            (AppError::Database("locked".into()), code::DB_ERROR),
            (AppError::Timeout(10), code::INTERNAL_ERROR),
        ];

        for (err, expected) in cases {
            assert_eq!(to_rpc_error(err).code(), expected);
        }
    }

    #[test]
    fn test_plain_messages_are_passed_through() {
        let err = to_rpc_error(AppError::NotFound("task t1".into()));
        assert_eq!(err.message(), "task t1");
    }
}
