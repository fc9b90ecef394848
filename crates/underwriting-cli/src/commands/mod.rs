pub mod debt;
pub mod underwriting;
pub mod waterfall;
