pub mod dashboard;
pub mod numeric;
pub mod nutrition;
pub mod profile;
