// Resona Infra-Remote - clients for the persister and log sink services

pub mod log_client;
pub mod persister;

pub use log_client::RemoteLogClient;
pub use persister::HttpPersister;
