use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy shared by plan construction, packing and unpacking.
///
/// A failing field aborts the whole operation; on unpack the record may be
/// partially written when the error surfaces.
#[derive(Debug, Error)]
pub enum Error {
    /// A schema, directive or call argument is malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A resolved length is negative or exceeds the configured maximum.
    #[error("invalid length: {0}")]
    InvalidLength(i64),

    /// The source ended in the middle of a field.
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// A host value's category does not fit the field's wire type.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// A bitmap symbol that does not appear in its symbol map.
    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),

    /// Wire bytes that cannot be decoded into the host representation.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Passthrough from the sink or source.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Short reads become [Error::UnexpectedEof]; everything else stays Io.
    pub(crate) fn from_io(err: std::io::Error) -> Error {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::UnexpectedEof
        } else {
            Error::Io(err)
        }
    }
}
