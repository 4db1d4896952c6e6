//! Market data models
//!
//! This module contains the domain records returned by providers and the
//! request vocabulary shared by the rest of the crate:
//! - `quote` - Latest quote (Quote)
//! - `historical` - Price history bars and their sampling interval
//! - `fundamentals` - Valuation and financial ratios (Fundamentals)
//! - `profile` - Company profile data (CompanyProfile)
//! - `search` - Search result data (SearchResult)
//! - `operation` - Logical read operations (Operation)

mod fundamentals;
mod historical;
mod operation;
mod profile;
mod quote;
mod search;

use std::borrow::Cow;

pub use fundamentals::Fundamentals;
pub use historical::{HistoricalPrice, Interval};
pub use operation::Operation;
pub use profile::CompanyProfile;
pub use quote::Quote;
pub use search::SearchResult;

/// Provider identifier, usually a static constant such as `"YAHOO"`.
///
/// Keys every per-provider map in the crate; look-ups accept a plain `&str`.
pub type ProviderId = Cow<'static, str>;
