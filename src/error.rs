//! Error types for ORQL.

use thiserror::Error;

/// The main error type for ORQL operations.
#[derive(Debug, Error)]
pub enum OrqlError {
    /// The source text contains a character sequence that is not a token.
    #[error("Lexical error at position {position}: {message}")]
    Lex { position: usize, message: String },

    /// The token stream does not match the grammar.
    #[error("Syntax error at position {position}: expected {expected}, found {found}")]
    Syntax {
        position: usize,
        expected: String,
        found: String,
    },

    /// The root of a query names an entity the registry does not know.
    #[error("Unknown schema: '{0}'")]
    UnknownSchema(String),

    /// An identifier is neither a column nor an association of the schema in scope.
    #[error("Schema '{schema}' has no column or association '{name}'{}", suggestion_suffix(.suggestion))]
    UnknownIdentifier {
        schema: String,
        name: String,
        suggestion: Option<String>,
    },

    /// The AST cannot be turned into SQL.
    #[error("Compile error: {0}")]
    Compile(String),

    /// An operation needs the id column of a schema that declares none.
    #[error("Schema '{0}' has no primary key")]
    MissingPrimaryKey(String),

    /// The schema registry is inconsistent.
    #[error("Schema error: {0}")]
    Schema(String),

    /// A configured column type has no `DataType` counterpart.
    #[error("Type '{ty}' of column '{schema}.{column}' is not supported")]
    TypeNotSupported {
        schema: String,
        column: String,
        ty: String,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn suggestion_suffix(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(s) => format!(". Did you mean '{}'?", s),
        None => String::new(),
    }
}

impl OrqlError {
    /// Create a lexical error at the given position.
    pub fn lex(position: usize, message: impl Into<String>) -> Self {
        Self::Lex {
            position,
            message: message.into(),
        }
    }

    /// Create a syntax error describing the expected and actual token.
    pub fn syntax(position: usize, expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::Syntax {
            position,
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Create a compile error.
    pub fn compile(message: impl Into<String>) -> Self {
        Self::Compile(message.into())
    }

    /// Create a schema error.
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema(message.into())
    }
}

/// Result type alias for ORQL operations.
pub type OrqlResult<T> = Result<T, OrqlError>;
