pub mod error;
pub mod sph;
pub mod units;
