use thiserror::Error;

macro_rules! resolution_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Resolution {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Resolution {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! validation_error {
    ($msg:expr) => {
        crate::Error::Validation {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Validation {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// The error surface is deliberately small. Injection and body editing distinguish only two
/// recoverable failure families, plus the case of a reference whose target has been dropped.
/// Everything else (precondition violations, editing a body that does not contain the given
/// instruction, recording two different targets for one source definition) is a caller bug
/// and panics via assertions instead of surfacing here.
///
/// # Error Categories
///
/// ## Resolution Errors
/// - [`Error::Resolution`] - A cross-module reference could not be imported into the target
///   module. The `inject` call that produced it made no partial-commit guarantee; the target
///   module should be discarded.
///
/// ## Validation Errors
/// - [`Error::Validation`] - A method body failed normalization, most commonly because its
///   evaluation-stack behavior could not be analyzed.
///
/// ## Liveness Errors
/// - [`Error::DanglingReference`] - A weak definition reference could not be upgraded because
///   the definition (or its owning module) has been dropped.
///
/// # Examples
///
/// ```rust,ignore
/// use cilgraft::{Error, inject::{inject_method, InjectContext, behavior}};
///
/// let mut ctx = InjectContext::new(origin.clone(), target.clone());
/// match inject_method(&method, &target, &mut ctx, &behavior::rename()) {
///     Ok(result) => println!("Injected {} dependencies", result.injected.len()),
///     Err(Error::Resolution { message, file, line }) => {
///         eprintln!("Unresolvable reference: {} ({}:{})", message, file, line);
///     }
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// A cross-module reference could not be resolved to an existing target-module definition
    /// or imported from the origin module.
    ///
    /// The `inject` call that raised this has already mutated the target module; callers must
    /// treat the target as contaminated and discard it. No automatic rollback is performed.
    ///
    /// # Fields
    ///
    /// * `message` - Description of the reference that failed to resolve
    /// * `file` - Source file in which the error was raised
    /// * `line` - Source line in which the error was raised
    #[error("Resolution - {file}:{line}: {message}")]
    Resolution {
        /// The message to be printed for the Resolution error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// A method body failed validation during normalization.
    ///
    /// Raised when shorthand expansion or evaluation-stack analysis cannot produce a
    /// consistent result, e.g. a branch joins two paths with different stack depths. The body
    /// is reported broken instead of being copied silently.
    ///
    /// # Fields
    ///
    /// * `message` - What could not be analyzed
    /// * `file` - Source file in which the error was raised
    /// * `line` - Source line in which the error was raised
    #[error("Validation - {file}:{line}: {message}")]
    Validation {
        /// The message to be printed for the Validation error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// A weak reference to a definition could not be upgraded.
    ///
    /// Definition graphs reference each other through weak pointers to keep recursive types
    /// from leaking. Hitting this error means the referenced definition (or its whole module)
    /// was dropped while something still pointed at it.
    #[error("Referenced definition is no longer alive!")]
    DanglingReference,
}

/// `Result<T, cilgraft::Error>`
///
/// The result type used throughout the crate for all fallible operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_error_macro() {
        let err = resolution_error!("could not import {}", "System.Foo");
        match err {
            Error::Resolution { message, file, .. } => {
                assert_eq!(message, "could not import System.Foo");
                assert!(file.ends_with("error.rs"));
            }
            _ => panic!("Expected Error::Resolution"),
        }
    }

    #[test]
    fn test_validation_error_macro() {
        let err = validation_error!("stack underflow");
        assert!(matches!(err, Error::Validation { .. }));
        let printed = format!("{err}");
        assert!(printed.contains("stack underflow"));
        assert!(printed.starts_with("Validation"));
    }

    #[test]
    fn test_error_display() {
        let printed = format!("{}", Error::DanglingReference);
        assert!(printed.contains("no longer alive"));
    }
}
