pub mod stream;
pub mod user;
