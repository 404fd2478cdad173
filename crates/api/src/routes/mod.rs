pub mod health;
pub mod intake;
