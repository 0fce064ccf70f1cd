use thiserror::Error;

use crate::ast::Segment;

/// Why a segment/index pair cannot form a command.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum SegmentError {
    #[error("unknown segment `{0}`")]
    Unknown(String),
    #[error("cannot pop into the constant segment")]
    PopConstant,
    #[error("pointer index {0} out of range (0..=1)")]
    PointerOutOfRange(u16),
    #[error("temp index {0} out of range (0..=7)")]
    TempOutOfRange(u16),
    #[error("constant {0} does not fit in 15 bits")]
    ConstantOutOfRange(u16),
    #[error("{0} offset {1} does not fit in 15 bits")]
    OffsetOutOfRange(Segment, u16),
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum Error {
    #[error("invalid command `{line}`: {reason}")]
    Parse { line: String, reason: String },

    #[error("bad segment in `{line}`: {source}")]
    Segment {
        line: String,
        #[source]
        source: SegmentError,
    },

    /// A command slipped past construction checks.
    #[error("internal error: segment {segment} index {index} cannot be translated here")]
    InvalidSegment { segment: Segment, index: u16 },

    /// Statics of all units together outgrew RAM[16..=255].
    #[error("static {index} lands at RAM[{address}], past the static area (16..=255)")]
    StaticOverflow { index: u16, address: usize },

    #[error("{unit}:{line_no}: {source}")]
    At {
        unit: String,
        line_no: usize,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub(crate) fn parse(line: &str, reason: impl Into<String>) -> Self {
        Error::Parse {
            line: line.to_string(),
            reason: reason.into(),
        }
    }

    /// The error with any position wrapper removed.
    pub fn root(&self) -> &Error {
        match self {
            Error::At { source, .. } => source.root(),
            other => other,
        }
    }
}
