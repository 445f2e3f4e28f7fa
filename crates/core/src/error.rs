use std::{error::Error as StdError, fmt};

type BoxedError = Box<dyn StdError + Send + Sync + 'static>;

/// Validation failure raised by a builder before any SQL is emitted:
/// bad identifier, missing column reference, out-of-range precision,
/// reserved word, or an incompatible modifier for the current column type.
#[derive(Debug)]
pub enum BuilderValidation {
    ReservedWord { dialect: String, identifier: String },
    IdentifierTooLong { identifier: String, limit: usize, dialect: String },
    IdentifierEmpty,
    DuplicateColumn { table: String, column: String },
    UnknownColumn { table: String, column: String },
    OutOfRange { field: String, value: String, min: String, max: String },
    IncompatibleModifier { modifier: String, column_type: String },
    NoCurrentColumn { modifier: String },
    MissingWhenClause,
    EmptyCaseAnchor,
    Other(String),
}

impl fmt::Display for BuilderValidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReservedWord { dialect, identifier } => write!(
                f,
                "`{identifier}` is a reserved word in the {dialect} dialect"
            ),
            Self::IdentifierTooLong { identifier, limit, dialect } => write!(
                f,
                "identifier `{identifier}` exceeds the {dialect} limit of {limit} characters"
            ),
            Self::IdentifierEmpty => write!(f, "identifier must not be empty"),
            Self::DuplicateColumn { table, column } => {
                write!(f, "column `{column}` already defined on table `{table}`")
            }
            Self::UnknownColumn { table, column } => {
                write!(f, "table `{table}` has no column `{column}`")
            }
            Self::OutOfRange { field, value, min, max } => write!(
                f,
                "{field} value `{value}` is out of range [{min}, {max}]"
            ),
            Self::IncompatibleModifier { modifier, column_type } => write!(
                f,
                "modifier `{modifier}` is not compatible with column type `{column_type}`"
            ),
            Self::NoCurrentColumn { modifier } => {
                write!(f, "modifier `{modifier}` called with no current column")
            }
            Self::MissingWhenClause => write!(f, "CASE expression requires at least one WHEN"),
            Self::EmptyCaseAnchor => write!(f, "simple CASE expression requires an anchor column"),
            Self::Other(message) => write!(f, "{message}"),
        }
    }
}

impl StdError for BuilderValidation {}

/// Transport, authentication, or protocol failure while talking to the server.
#[derive(Debug)]
pub struct ConnectionError {
    pub message: String,
    pub transient: bool,
    pub source: Option<BoxedError>,
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "connection error: {}", self.message)
    }
}

impl StdError for ConnectionError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_deref().map(|e| e as &(dyn StdError + 'static))
    }
}

/// The server rejected a prepared statement or its parameters.
#[derive(Debug)]
pub struct QueryError {
    pub sql: String,
    pub code: Option<i64>,
    pub message: String,
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "query error [{code}] for `{}`: {}", self.sql, self.message),
            None => write!(f, "query error for `{}`: {}", self.sql, self.message),
        }
    }
}

impl StdError for QueryError {}

/// A constraint (unique, FK, check, not-null) was violated.
#[derive(Debug)]
pub struct IntegrityError {
    pub constraint: Option<String>,
    pub message: String,
}

impl fmt::Display for IntegrityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.constraint {
            Some(constraint) => write!(f, "integrity error on `{constraint}`: {}", self.message),
            None => write!(f, "integrity error: {}", self.message),
        }
    }
}

impl StdError for IntegrityError {}

#[derive(Debug)]
pub struct StorageError {
    pub operation: String,
    pub message: String,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "storage error during {}: {}", self.operation, self.message)
    }
}

impl StdError for StorageError {}

#[derive(Debug)]
pub struct CryptoError {
    pub message: String,
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "crypto error: {}", self.message)
    }
}

impl StdError for CryptoError {}

#[derive(Debug)]
pub struct MetadataError {
    pub message: String,
}

impl fmt::Display for MetadataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "backup metadata error: {}", self.message)
    }
}

impl StdError for MetadataError {}

#[derive(Debug)]
pub enum Error {
    BuilderValidation(BuilderValidation),
    Connection(ConnectionError),
    Query(QueryError),
    Integrity(IntegrityError),
    Storage(StorageError),
    Crypto(CryptoError),
    Metadata(MetadataError),
    Cancelled,
}

impl Error {
    /// Whether the retry policy (C3) should treat this error as transient.
    ///
    /// This mirrors the numeric-code and message-substring classification
    /// in spec.md §4.C3: a `ConnectionError` is always retryable, a
    /// `QueryError` is retryable only if its code is in the known
    /// transient set or its message matches a known transient phrase.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        const TRANSIENT_CODES: [i64; 6] = [1040, 1203, 1205, 1213, 2006, 2013];
        const TRANSIENT_PHRASES: [&str; 10] = [
            "server has gone away",
            "lost connection",
            "connection refused",
            "connection timed out",
            "deadlock found",
            "lock wait timeout exceeded",
            "too many connections",
            "server shutdown in progress",
            "connection lost",
            "connection reset by peer",
        ];

        match self {
            Self::Connection(inner) => inner.transient,
            Self::Query(inner) => {
                if inner.code.is_some_and(|code| TRANSIENT_CODES.contains(&code)) {
                    return true;
                }
                let lower = inner.message.to_ascii_lowercase();
                TRANSIENT_PHRASES.iter().any(|phrase| lower.contains(phrase))
            }
            _ => false,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BuilderValidation(e) => write!(f, "builder validation: {e}"),
            Self::Connection(e) => write!(f, "{e}"),
            Self::Query(e) => write!(f, "{e}"),
            Self::Integrity(e) => write!(f, "{e}"),
            Self::Storage(e) => write!(f, "{e}"),
            Self::Crypto(e) => write!(f, "{e}"),
            Self::Metadata(e) => write!(f, "{e}"),
            Self::Cancelled => write!(f, "operation cancelled"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::BuilderValidation(e) => Some(e),
            Self::Connection(e) => Some(e),
            Self::Query(e) => Some(e),
            Self::Integrity(e) => Some(e),
            Self::Storage(e) => Some(e),
            Self::Crypto(e) => Some(e),
            Self::Metadata(e) => Some(e),
            Self::Cancelled => None,
        }
    }
}

impl From<BuilderValidation> for Error {
    fn from(value: BuilderValidation) -> Self {
        Self::BuilderValidation(value)
    }
}

impl From<ConnectionError> for Error {
    fn from(value: ConnectionError) -> Self {
        Self::Connection(value)
    }
}

impl From<QueryError> for Error {
    fn from(value: QueryError) -> Self {
        Self::Query(value)
    }
}

impl From<IntegrityError> for Error {
    fn from(value: IntegrityError) -> Self {
        Self::Integrity(value)
    }
}

impl From<StorageError> for Error {
    fn from(value: StorageError) -> Self {
        Self::Storage(value)
    }
}

impl From<CryptoError> for Error {
    fn from(value: CryptoError) -> Self {
        Self::Crypto(value)
    }
}

impl From<MetadataError> for Error {
    fn from(value: MetadataError) -> Self {
        Self::Metadata(value)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
