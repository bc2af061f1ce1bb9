pub mod filter;
pub mod manager;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod store;

pub use filter::{FilterData, SortOrder};
pub use manager::{DatabaseError, DatabaseManager};
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use repository::{Record, Repository, Stored, TeamScoped, WriteBatch};
pub use store::{RawRecord, Store, Table, WriteOp};
