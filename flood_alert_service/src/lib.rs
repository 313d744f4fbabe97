pub mod alert;
pub mod config;
pub mod dataset;
pub mod dev_mode;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod regression;
pub mod sensor;
pub mod server;
pub mod status;
pub mod store;
pub mod verify;
pub mod zones;
