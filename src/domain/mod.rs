pub mod billing_period;
pub mod entities;
