pub mod records;
pub mod session;
