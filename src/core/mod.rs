pub mod cities;
pub mod qibla;
pub mod schedule;
