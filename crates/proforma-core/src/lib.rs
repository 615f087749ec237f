pub mod error;
pub mod proforma;
pub mod time_value;
pub mod types;

#[cfg(feature = "sensitivity")]
pub mod scenarios;

pub use error::ProformaError;
pub use types::*;

/// Standard result type for all pro forma operations
pub type ProformaResult<T> = Result<T, ProformaError>;
