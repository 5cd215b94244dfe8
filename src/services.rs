pub mod repair_service;
pub mod stock_service;
pub mod wac;
