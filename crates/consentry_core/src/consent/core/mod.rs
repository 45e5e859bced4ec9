pub mod exchange;
pub mod lifecycle;
pub mod notice;
pub mod token;
