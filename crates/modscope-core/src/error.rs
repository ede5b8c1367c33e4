//! Error taxonomy for module resolution
//!
//! Host collaborators (the runtime type system, the manifest parser and the
//! filesystem) report failures as [`HostError`]. Every such failure is
//! classified into exactly one [`ResolveError`] kind at the cache boundary and
//! re-raised with the original failure attached as its source.

use std::io;
use std::sync::Arc;

use thiserror::Error;

/// Raw failure reported by a host collaborator.
#[derive(Error, Debug)]
pub enum HostError {
    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("module found but could not be loaded: {0}")]
    FileLoad(String),

    #[error("bad module image: {0}")]
    BadImageFormat(String),

    #[error("access denied: {0}")]
    Security(String),

    #[error("path too long: {0}")]
    PathTooLong(String),

    #[error("invalid argument: {0}")]
    Argument(String),

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("type could not be loaded: {0}")]
    TypeLoad(String),

    #[error("{failed} of {total} types in {module} could not be loaded")]
    PartialTypeLoad {
        module: String,
        failed: usize,
        total: usize,
    },

    #[error("method access denied: {0}")]
    MethodAccess(String),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("{0}")]
    Other(String),
}

/// Fieldless discriminant of [`ResolveError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    LoadFailure,
    FormatInvalid,
    SecurityDenied,
    PathTooLong,
    InvalidArgument,
    AlreadyLoaded,
    TypeLoadFailure,
    PartialTypeLoadFailure,
    MethodAccessDenied,
    Unexpected,
}

/// Typed failure returned by every public resolution operation.
///
/// The cause is shared so that all callers waiting on one in-flight
/// resolution observe the same error.
#[derive(Error, Debug, Clone)]
pub enum ResolveError {
    #[error("The file was not found.")]
    NotFound(#[source] Arc<HostError>),

    #[error("assembly is found but cannot be loaded due to an error in the file format or a mismatch in the processor architecture.")]
    LoadFailure(#[source] Arc<HostError>),

    #[error("assembly is not a valid assembly or assembly is targeted for a different version of the runtime.")]
    FormatInvalid(#[source] Arc<HostError>),

    #[error("Insufficient permissions to access the assembly.")]
    SecurityDenied(#[source] Arc<HostError>),

    #[error("the specified assembly name exceeds the maximum allowed path length.")]
    PathTooLong(#[source] Arc<HostError>),

    #[error("assembly name contains invalid characters or is an invalid format.")]
    InvalidArgument(#[source] Arc<HostError>),

    #[error("the assembly has already been loaded into the current application and cannot be loaded again.")]
    AlreadyLoaded(#[source] Arc<HostError>),

    #[error("Unable to load the specified type.")]
    TypeLoadFailure(#[source] Arc<HostError>),

    #[error("Unable to load one or more types.")]
    PartialTypeLoadFailure(#[source] Arc<HostError>),

    #[error("An error occurred: MethodAccessException. Please check the accessibility of the method.")]
    MethodAccessDenied(#[source] Arc<HostError>),

    #[error("An unexpected error occurred.")]
    Unexpected(#[source] Arc<HostError>),
}

impl ResolveError {
    /// Map a raw host failure to its taxonomy kind.
    pub fn classify(error: HostError) -> Self {
        let kind = match &error {
            HostError::FileNotFound(_) => ErrorKind::NotFound,
            HostError::FileLoad(_) => ErrorKind::LoadFailure,
            HostError::BadImageFormat(_) => ErrorKind::FormatInvalid,
            HostError::Security(_) => ErrorKind::SecurityDenied,
            HostError::PathTooLong(_) => ErrorKind::PathTooLong,
            HostError::Argument(_) => ErrorKind::InvalidArgument,
            HostError::InvalidOperation(_) => ErrorKind::AlreadyLoaded,
            HostError::TypeLoad(_) => ErrorKind::TypeLoadFailure,
            HostError::PartialTypeLoad { .. } => ErrorKind::PartialTypeLoadFailure,
            HostError::MethodAccess(_) => ErrorKind::MethodAccessDenied,
            HostError::Io(io) => match io.kind() {
                io::ErrorKind::NotFound => ErrorKind::NotFound,
                io::ErrorKind::PermissionDenied => ErrorKind::SecurityDenied,
                io::ErrorKind::InvalidInput => ErrorKind::InvalidArgument,
                io::ErrorKind::InvalidFilename => ErrorKind::PathTooLong,
                _ => ErrorKind::Unexpected,
            },
            HostError::Other(_) => ErrorKind::Unexpected,
        };
        tracing::warn!("host failure classified as {:?}: {}", kind, error);
        Self::with_kind(kind, Arc::new(error))
    }

    /// Build an error of the given kind around a cause.
    pub fn with_kind(kind: ErrorKind, cause: Arc<HostError>) -> Self {
        match kind {
            ErrorKind::NotFound => Self::NotFound(cause),
            ErrorKind::LoadFailure => Self::LoadFailure(cause),
            ErrorKind::FormatInvalid => Self::FormatInvalid(cause),
            ErrorKind::SecurityDenied => Self::SecurityDenied(cause),
            ErrorKind::PathTooLong => Self::PathTooLong(cause),
            ErrorKind::InvalidArgument => Self::InvalidArgument(cause),
            ErrorKind::AlreadyLoaded => Self::AlreadyLoaded(cause),
            ErrorKind::TypeLoadFailure => Self::TypeLoadFailure(cause),
            ErrorKind::PartialTypeLoadFailure => Self::PartialTypeLoadFailure(cause),
            ErrorKind::MethodAccessDenied => Self::MethodAccessDenied(cause),
            ErrorKind::Unexpected => Self::Unexpected(cause),
        }
    }

    pub(crate) fn not_found(detail: impl Into<String>) -> Self {
        Self::NotFound(Arc::new(HostError::FileNotFound(detail.into())))
    }

    pub(crate) fn unexpected(detail: impl Into<String>) -> Self {
        Self::Unexpected(Arc::new(HostError::Other(detail.into())))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::LoadFailure(_) => ErrorKind::LoadFailure,
            Self::FormatInvalid(_) => ErrorKind::FormatInvalid,
            Self::SecurityDenied(_) => ErrorKind::SecurityDenied,
            Self::PathTooLong(_) => ErrorKind::PathTooLong,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::AlreadyLoaded(_) => ErrorKind::AlreadyLoaded,
            Self::TypeLoadFailure(_) => ErrorKind::TypeLoadFailure,
            Self::PartialTypeLoadFailure(_) => ErrorKind::PartialTypeLoadFailure,
            Self::MethodAccessDenied(_) => ErrorKind::MethodAccessDenied,
            Self::Unexpected(_) => ErrorKind::Unexpected,
        }
    }

    /// The original host failure.
    pub fn cause(&self) -> &HostError {
        match self {
            Self::NotFound(cause)
            | Self::LoadFailure(cause)
            | Self::FormatInvalid(cause)
            | Self::SecurityDenied(cause)
            | Self::PathTooLong(cause)
            | Self::InvalidArgument(cause)
            | Self::AlreadyLoaded(cause)
            | Self::TypeLoadFailure(cause)
            | Self::PartialTypeLoadFailure(cause)
            | Self::MethodAccessDenied(cause)
            | Self::Unexpected(cause) => cause,
        }
    }
}

impl From<HostError> for ResolveError {
    fn from(error: HostError) -> Self {
        Self::classify(error)
    }
}

/// Errors raised while loading a [`crate::config::ResolverConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Read(#[from] io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_classification_is_total() {
        let cases = vec![
            (HostError::FileNotFound("a".into()), ErrorKind::NotFound),
            (HostError::FileLoad("a".into()), ErrorKind::LoadFailure),
            (HostError::BadImageFormat("a".into()), ErrorKind::FormatInvalid),
            (HostError::Security("a".into()), ErrorKind::SecurityDenied),
            (HostError::PathTooLong("a".into()), ErrorKind::PathTooLong),
            (HostError::Argument("a".into()), ErrorKind::InvalidArgument),
            (HostError::InvalidOperation("a".into()), ErrorKind::AlreadyLoaded),
            (HostError::TypeLoad("a".into()), ErrorKind::TypeLoadFailure),
            (
                HostError::PartialTypeLoad {
                    module: "A".into(),
                    failed: 1,
                    total: 3,
                },
                ErrorKind::PartialTypeLoadFailure,
            ),
            (HostError::MethodAccess("a".into()), ErrorKind::MethodAccessDenied),
            (HostError::Other("a".into()), ErrorKind::Unexpected),
        ];

        for (host, expected) in cases {
            assert_eq!(ResolveError::classify(host).kind(), expected);
        }
    }

    #[test]
    fn test_io_errors_follow_their_kind() {
        let denied = io::Error::new(io::ErrorKind::PermissionDenied, "no");
        assert_eq!(
            ResolveError::from(HostError::from(denied)).kind(),
            ErrorKind::SecurityDenied
        );

        let missing = io::Error::new(io::ErrorKind::NotFound, "gone");
        assert_eq!(
            ResolveError::from(HostError::from(missing)).kind(),
            ErrorKind::NotFound
        );

        let long = io::Error::new(io::ErrorKind::InvalidFilename, "name too long");
        assert_eq!(
            ResolveError::from(HostError::from(long)).kind(),
            ErrorKind::PathTooLong
        );

        let other = io::Error::new(io::ErrorKind::Interrupted, "eh");
        assert_eq!(
            ResolveError::from(HostError::from(other)).kind(),
            ErrorKind::Unexpected
        );
    }

    #[test]
    fn test_source_is_the_original_failure() {
        let err = ResolveError::classify(HostError::FileLoad("Billing.dll".into()));
        let source = err.source().expect("cause attached");
        assert_eq!(
            source.to_string(),
            "module found but could not be loaded: Billing.dll"
        );
        assert!(matches!(err.cause(), HostError::FileLoad(name) if name == "Billing.dll"));
    }

    #[test]
    fn test_fixed_messages() {
        let not_found = ResolveError::not_found("Missing");
        insta::assert_snapshot!(not_found.to_string(), @"The file was not found.");

        let denied = ResolveError::classify(HostError::Security("x".into()));
        insta::assert_snapshot!(denied.to_string(), @"Insufficient permissions to access the assembly.");

        let unexpected = ResolveError::unexpected("boom");
        insta::assert_snapshot!(unexpected.to_string(), @"An unexpected error occurred.");
    }
}
