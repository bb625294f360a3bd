pub mod database;
pub mod generator;
pub mod storage;
