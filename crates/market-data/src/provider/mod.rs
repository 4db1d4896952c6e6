//! Market data provider abstraction.
//!
//! Concrete vendor adapters live outside this crate. They translate each
//! vendor's wire format into the domain records in [`crate::models`] and
//! implement [`MarketDataProvider`]; everything in this crate treats them
//! polymorphically through that trait and never inspects vendor payloads.

mod traits;

pub use traits::MarketDataProvider;
