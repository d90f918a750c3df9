pub mod dispatch;
pub mod triggers;
