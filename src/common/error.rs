use thiserror::Error;

// Error
//------------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq, Eq, Copy, Clone)]
pub enum QRError {
    #[error("Empty data")]
    EmptyData,
    #[error("Data too long")]
    DataTooLong,
    #[error("Invalid version")]
    InvalidVersion,
    #[error("Invalid error correction level")]
    InvalidECLevel,
    #[error("Invalid character")]
    InvalidChar,
    #[error("Invalid masking pattern")]
    InvalidMaskingPattern,
    #[error("Invalid module size")]
    InvalidModuleSize,
}

pub type QRResult<T> = Result<T, QRError>;
