use crate::tokenizer::{format_diagnostic, FileLocation};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("io error: {0}")]
    IO(#[from] std::io::Error),
    #[error("{message}")]
    Lex {
        message: String,
        location: FileLocation,
    },
    #[error("{message}")]
    Parse {
        message: String,
        location: FileLocation,
    },
    #[error("{message}")]
    Name {
        message: String,
        location: FileLocation,
    },
    #[error("Expected at least {required} arguments but got {supplied}")]
    Arity {
        required: usize,
        supplied: usize,
        location: FileLocation,
    },
    #[error("{message}")]
    Type {
        message: String,
        location: FileLocation,
    },
    #[error("internal error: {message}")]
    Internal {
        message: String,
        location: FileLocation,
    },
}

impl Error {
    pub fn location(&self) -> Option<FileLocation> {
        match self {
            Error::IO(_) => None,
            Error::Lex { location, .. }
            | Error::Parse { location, .. }
            | Error::Name { location, .. }
            | Error::Arity { location, .. }
            | Error::Type { location, .. }
            | Error::Internal { location, .. } => Some(*location),
        }
    }

    /// Renders the error against the source it was raised for. Errors without
    /// a location render as their bare message.
    pub fn render(&self, source: &str) -> String {
        match self.location() {
            Some(location) => format_diagnostic(&self.to_string(), location, source),
            None => self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

pub fn lex_error<T>(message: &str, location: FileLocation) -> Result<T> {
    Err(Error::Lex {
        message: message.to_string(),
        location,
    })
}

pub fn parser_error<T>(message: &str, location: FileLocation) -> Result<T> {
    Err(Error::Parse {
        message: message.to_string(),
        location,
    })
}

pub fn name_error<T>(message: &str, location: FileLocation) -> Result<T> {
    Err(Error::Name {
        message: message.to_string(),
        location,
    })
}

pub fn arity_error<T>(required: usize, supplied: usize, location: FileLocation) -> Result<T> {
    Err(Error::Arity {
        required,
        supplied,
        location,
    })
}

pub fn type_error<T>(message: &str, location: FileLocation) -> Result<T> {
    Err(Error::Type {
        message: message.to_string(),
        location,
    })
}

pub fn internal_error<T>(message: &str, location: FileLocation) -> Result<T> {
    Err(Error::Internal {
        message: message.to_string(),
        location,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_located_errors_render_diagnostics() {
        let source = "var x = 1\nvar x = 2";
        let location = FileLocation {
            cursor: 14,
            line: 2,
            column: 5,
        };
        let err = name_error::<()>("Redeclaration of 'x'", location).unwrap_err();

        assert_eq!(err.location(), Some(location));
        assert_eq!(
            err.render(source),
            "[ERROR] Redeclaration of 'x':\nvar x = 2\n    ^ On line 2, column 5\n"
        );
    }

    #[test]
    fn test_arity_message() {
        let err = arity_error::<()>(2, 1, FileLocation::default()).unwrap_err();
        assert_eq!(err.to_string(), "Expected at least 2 arguments but got 1");
    }

    #[test]
    fn test_io_errors_have_no_location() {
        let err = Error::from(std::io::Error::new(std::io::ErrorKind::NotFound, "missing"));
        assert!(err.location().is_none());
        assert_eq!(err.render("anything"), "io error: missing");
    }
}
