//! Configuration: database declarations, hub settings and connection resolution

pub mod bootstrap;
pub mod database;
pub mod resolver;
pub mod settings;
pub mod sources;

pub use database::*;
pub use resolver::*;
pub use settings::*;
pub use sources::*;
