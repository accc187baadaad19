pub mod code_review;
pub mod customer_support;
pub mod data_analysis;
