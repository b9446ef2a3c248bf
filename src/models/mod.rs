pub mod connection;
pub mod query;
pub mod query_history;
pub mod settings;

pub use connection::*;
pub use query::*;
pub use query_history::*;
pub use settings::*;
