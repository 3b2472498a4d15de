//! RateCompare Common Types
//!
//! Value types shared by the provider adapters and the comparison engine:
//! the validated conversion request, the normalized provider offer, and the
//! comparison result with its derived statistics.

pub mod currency;
pub mod offer;
pub mod comparison;
pub mod error;
pub mod time;

pub use currency::*;
pub use offer::*;
pub use comparison::*;
pub use error::*;
pub use time::*;
