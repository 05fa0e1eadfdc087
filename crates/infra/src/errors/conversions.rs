//! Conversions from external infrastructure errors into domain errors.

use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;
use timewise_domain::TimewiseError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub TimewiseError);

impl From<InfraError> for TimewiseError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<TimewiseError> for InfraError {
    fn from(value: TimewiseError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoTimewiseError {
    fn into_timewise(self) -> TimewiseError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → TimewiseError */
/* -------------------------------------------------------------------------- */

impl IntoTimewiseError for SqlError {
    fn into_timewise(self) -> TimewiseError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (ErrorCode::DatabaseBusy, _) => {
                        TimewiseError::Database("database is busy".into())
                    }
                    (ErrorCode::DatabaseLocked, _) => {
                        TimewiseError::Database("database is locked".into())
                    }
                    (ErrorCode::ConstraintViolation, 2067) => {
                        TimewiseError::Database("unique constraint violation".into())
                    }
                    (ErrorCode::ConstraintViolation, 787) => {
                        TimewiseError::Database("foreign key constraint violation".into())
                    }
                    _ => TimewiseError::Database(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => TimewiseError::NotFound("no rows returned by query".into()),
            RE::FromSqlConversionFailure(_, _, cause) => {
                TimewiseError::Database(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, _, ty) => {
                TimewiseError::Database(format!("invalid column type: {ty}"))
            }
            RE::Utf8Error(_) => {
                TimewiseError::Database("invalid UTF-8 returned from sqlite".into())
            }
            RE::InvalidParameterName(parameter_name) => {
                TimewiseError::Database(format!("invalid parameter name: {parameter_name}"))
            }
            RE::InvalidPath(path) => TimewiseError::Database(format!(
                "invalid database path: {}",
                path.to_string_lossy()
            )),
            RE::InvalidQuery => TimewiseError::Database("invalid SQL query".into()),
            other => TimewiseError::Database(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_timewise())
    }
}

/* -------------------------------------------------------------------------- */
/* r2d2::Error → TimewiseError */
/* -------------------------------------------------------------------------- */

impl IntoTimewiseError for r2d2::Error {
    fn into_timewise(self) -> TimewiseError {
        TimewiseError::Database(format!("connection pool error: {self}"))
    }
}

impl From<r2d2::Error> for InfraError {
    fn from(value: r2d2::Error) -> Self {
        InfraError(value.into_timewise())
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → TimewiseError */
/* -------------------------------------------------------------------------- */

impl IntoTimewiseError for HttpError {
    fn into_timewise(self) -> TimewiseError {
        if self.is_timeout() {
            return TimewiseError::Network(format!("http request timed out: {self}"));
        }
        if self.is_connect() {
            return TimewiseError::Network(format!("http connection failed: {self}"));
        }
        if self.is_decode() {
            return TimewiseError::Network(format!("http response decoding failed: {self}"));
        }
        TimewiseError::Network(format!("http error: {self}"))
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_timewise())
    }
}

/* -------------------------------------------------------------------------- */
/* serde_json::Error → TimewiseError */
/* -------------------------------------------------------------------------- */

impl IntoTimewiseError for serde_json::Error {
    fn into_timewise(self) -> TimewiseError {
        TimewiseError::Internal(format!("json (de)serialization failed: {self}"))
    }
}

impl From<serde_json::Error> for InfraError {
    fn from(value: serde_json::Error) -> Self {
        InfraError(value.into_timewise())
    }
}
