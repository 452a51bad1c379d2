pub mod alert;
pub mod config;
pub mod feed;
pub mod health;
pub mod lock;
pub mod notify;
pub mod run;
pub mod store;
pub mod timeparse;
pub mod watchdog;
