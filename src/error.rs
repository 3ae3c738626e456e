use thiserror::Error;

/// The closed set of error kinds the two pipelines can produce.
///
/// Every fallible path in `closest`/`sam` bottoms out in one of these
/// variants before being wrapped in an `anyhow::Error` at the call site,
/// the same way `rust_htslib`/`bio` errors are already threaded through
/// `anyhow::Context` elsewhere in this crate.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("input format error at line {line}: {message}")]
    InputFormat { line: usize, message: String },

    #[error("invalid base {byte:?} at position {pos}")]
    InvalidBase { pos: usize, byte: u8 },

    #[error("length mismatch: {message}")]
    LengthMismatch { message: String },

    #[error("invalid trim range: {message}")]
    InvalidTrimRange { message: String },

    #[error("invalid arguments: {message}")]
    InvalidArgs { message: String },

    #[error("io error: {message}: {source}")]
    Io { message: String, #[source] source: std::io::Error },

    #[error("internal inconsistency: {message}")]
    InternalInconsistency { message: String },
}

impl PipelineError {
    /// Wraps a `std::io::Error` from an actual filesystem operation (as
    /// opposed to an `anyhow::Context`-annotated parse/open failure), so it
    /// downcasts back to `PipelineError::Io` at the `main()` boundary instead
    /// of disappearing into an opaque context chain.
    pub fn io(message: impl Into<String>) -> impl FnOnce(std::io::Error) -> PipelineError {
        move |source| PipelineError::Io { message: message.into(), source }
    }

    /// Exit-code classification per the CLI surface: `InternalInconsistency`
    /// and `Io` are treated as internal errors (exit 2), everything else as
    /// a user/input error (exit 1).
    pub fn is_internal(&self) -> bool {
        matches!(self, PipelineError::InternalInconsistency { .. } | PipelineError::Io { .. })
    }
}
