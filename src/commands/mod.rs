pub mod connection;
pub mod export;
pub mod metadata;
pub mod query;
pub mod query_history;
pub mod settings;
pub mod sql_file;

pub use connection::*;
pub use export::*;
pub use metadata::*;
pub use query::*;
pub use query_history::*;
pub use settings::*;
pub use sql_file::*;
