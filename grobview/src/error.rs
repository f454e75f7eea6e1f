//! Module containing the universal error type
use crate::command::ArgKind;
use thiserror::Error;

/// Universal error type for `grobview`
#[derive(Error, Debug)]
pub enum Error {
    /// IO error; see inner code for details
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    /// The file extension does not name a supported mesh format
    #[error("unsupported mesh format: {0:?}")]
    UnsupportedFormat(String),

    /// A mesh file could not be parsed
    #[error("parse error on line {line}: {msg}")]
    ParseError {
        /// Line number (1-indexed; 0 for binary formats)
        line: usize,
        /// Description of the problem
        msg: String,
    },

    /// Binary file ended before its declared contents
    #[error("unexpected end of file")]
    UnexpectedEof,

    /// A grob refers to a vertex that does not exist
    #[error("corner index {0} is out of range for {1} vertices")]
    BadCorner(usize, usize),

    /// Corner array length is not a multiple of the grob's corner count
    #[error("corner list of length {0} is not a multiple of {1}")]
    BadCornerCount(usize, usize),

    /// The mesh contains grobs that cannot be refined
    #[error("cannot refine {0} grobs")]
    UnsupportedRefinement(&'static str),

    /// No command is registered under this name
    #[error("unknown command {0:?}")]
    UnknownCommand(String),

    /// Wrong number of arguments passed to a command constructor
    #[error("command expects {expected} arguments, got {actual}")]
    BadArgCount {
        /// Number of arguments in the command's schema
        expected: usize,
        /// Number of arguments supplied
        actual: usize,
    },

    /// Argument kind does not match the command's schema
    #[error("argument {index} should be {expected}, got {actual}")]
    BadArgKind {
        /// Position of the offending argument
        index: usize,
        /// Kind in the command's schema
        expected: ArgKind,
        /// Kind that was supplied
        actual: ArgKind,
    },

    /// The target content has no mesh to operate on
    #[error("no mesh is loaded")]
    NoMesh,

    /// Shader failed to compile
    #[error("shader compilation failed: {0}")]
    ShaderCompile(String),

    /// Shader program failed to link
    #[error("shader link failed: {0}")]
    ShaderLink(String),

    /// Could not allocate a GPU object
    #[error("GPU allocation failed: {0}")]
    GpuAlloc(String),
}
