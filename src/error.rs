use thiserror::Error;

/// The error kinds from the on-disk index engine. Every variant is fatal to the
/// operation that raised it; the store performs no rollback (see DESIGN.md).
#[derive(Debug, Error)]
pub enum TripeError {
    #[error("file does not begin with the tripe magic bytes")]
    BadMagic,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("update_numbers called with {actual} numbers but the handle holds room for {expected}")]
    SizeMismatch { expected: u64, actual: u64 },

    #[error("raw text block was not valid utf-8: {0}")]
    BadText(#[from] std::str::Utf8Error),

    #[error("search called with an empty phrase")]
    EmptyPhrase,

    #[error("corrupt index: {0}")]
    Corrupt(String),
}

pub type Result<T> = std::result::Result<T, TripeError>;
