pub mod identity;
pub mod payment_provider;
