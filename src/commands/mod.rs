pub mod db;
pub mod fetcher;
pub mod report;
pub mod settings;
pub mod sync;
