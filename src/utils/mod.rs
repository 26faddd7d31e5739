pub mod phone;
pub mod signature;
