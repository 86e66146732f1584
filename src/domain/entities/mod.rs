pub mod access_status;
pub mod plan_tier;
pub mod subscription;
