pub mod aladhan;
pub mod provider;
