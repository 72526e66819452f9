pub mod alerts;
pub mod health;
pub mod silences;
pub mod status;
