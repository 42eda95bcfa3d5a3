pub mod identity;
pub mod sprint;
