pub mod gateway;
pub mod snapshot;
pub mod tags;

pub use gateway::FileGateway;
