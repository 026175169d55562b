pub mod address;
pub mod error;
pub mod models;
pub mod results;
pub mod validation;

pub use address::{checksum, parse_address, shorten_address};
pub use error::{Error, ErrorCode, Result};
pub use models::*;
pub use results::{percentage, ResultsSummary, Standing};
pub use validation::*;

pub use ethers_core::types::Address;
