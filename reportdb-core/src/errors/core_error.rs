use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Wire-level error taxonomy reported to RPC callers.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    Database,
    General,
    Unauthorized,
    SourceFile,
    #[serde(rename = "IOERROR")]
    IoError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Database => "DATABASE",
            ErrorCode::General => "GENERAL",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::SourceFile => "SOURCE_FILE",
            ErrorCode::IoError => "IOERROR",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CoreErrorKind {
    NotFound,
    Validation,
    LimitExceeded,
    Conflict,
    Forbidden,
    Unauthorized,
    Unavailable,
    Database,
    SourceFile,
    Io,
    Internal,
}

impl CoreErrorKind {
    pub fn code(&self) -> ErrorCode {
        match self {
            CoreErrorKind::NotFound
            | CoreErrorKind::Conflict
            | CoreErrorKind::Unavailable
            | CoreErrorKind::Database => ErrorCode::Database,
            CoreErrorKind::Validation | CoreErrorKind::LimitExceeded | CoreErrorKind::Internal => {
                ErrorCode::General
            }
            CoreErrorKind::Forbidden | CoreErrorKind::Unauthorized => ErrorCode::Unauthorized,
            CoreErrorKind::SourceFile => ErrorCode::SourceFile,
            CoreErrorKind::Io => ErrorCode::IoError,
        }
    }
}

#[derive(Debug)]
pub struct CoreError {
    kind: CoreErrorKind,
    message: String,
    fields: Option<BTreeMap<String, String>>,
    extra_info: Vec<String>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl CoreError {
    pub fn new(kind: CoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            fields: None,
            extra_info: Vec::new(),
            source: None,
        }
    }

    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        let entity = entity.into();
        let id = id.into();
        let message = format!("{} {} was not found in the database.", entity, id);

        let mut fields = BTreeMap::new();
        fields.insert("entity".to_string(), entity);
        fields.insert("id".to_string(), id);

        Self {
            kind: CoreErrorKind::NotFound,
            message,
            fields: Some(fields),
            extra_info: Vec::new(),
            source: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(CoreErrorKind::Validation, message)
    }

    pub fn limit_exceeded(message: impl Into<String>) -> Self {
        Self::new(CoreErrorKind::LimitExceeded, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(CoreErrorKind::Conflict, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(CoreErrorKind::Forbidden, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(CoreErrorKind::Unauthorized, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(CoreErrorKind::Unavailable, message)
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::new(CoreErrorKind::Database, message)
    }

    pub fn source_file(message: impl Into<String>) -> Self {
        Self::new(CoreErrorKind::SourceFile, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(CoreErrorKind::Io, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(CoreErrorKind::Internal, message)
    }

    pub fn with_fields(mut self, fields: BTreeMap<String, String>) -> Self {
        self.fields = Some(fields);
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn with_extra_info(mut self, extra_info: Vec<String>) -> Self {
        self.extra_info = extra_info;
        self
    }

    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> CoreErrorKind {
        self.kind
    }

    pub fn code(&self) -> ErrorCode {
        self.kind.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn fields(&self) -> Option<&BTreeMap<String, String>> {
        self.fields.as_ref()
    }

    pub fn extra_info(&self) -> &[String] {
        &self.extra_info
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.code().as_str(), self.message)
    }
}

impl StdError for CoreError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<anyhow::Error> for CoreError {
    fn from(err: anyhow::Error) -> Self {
        CoreError::internal("Unhandled error").with_source(AnyhowSource(err))
    }
}

impl From<sea_orm::DbErr> for CoreError {
    fn from(err: sea_orm::DbErr) -> Self {
        let (_, message) = crate::common::db_errors::format_db_error("database operation", &err);
        CoreError::database(message).with_source(err)
    }
}

/// Adapter so an `anyhow::Error` can sit in the boxed source slot.
#[derive(Debug)]
struct AnyhowSource(anyhow::Error);

impl fmt::Display for AnyhowSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#}", self.0)
    }
}

impl StdError for AnyhowSource {}
