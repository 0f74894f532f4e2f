//! Sales domain module.
//!
//! Recorded sales, their validation rules, and the calendar windows used when
//! comparing revenue between periods. Pure domain logic (no IO).

pub mod period;
pub mod sale;

pub use period::{start_of_day, PeriodWindows, RevenuePeriod};
pub use sale::{NewSale, Sale};
