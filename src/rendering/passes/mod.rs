pub mod background_pass;
pub mod pass;
pub mod product_pass;
