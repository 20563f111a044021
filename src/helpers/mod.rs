//! Helper functions for page rendering

mod date;
mod url;

pub use self::date::*;
pub use self::url::*;
