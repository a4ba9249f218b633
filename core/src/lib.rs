pub mod db;
pub mod fdc_import;
pub mod models;
pub mod search;
pub mod service;
