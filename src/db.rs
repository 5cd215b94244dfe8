pub mod memory_repo;
pub mod pg_repo;
pub mod warehouse_repo;

pub use memory_repo::MemoryWarehouseRepository;
pub use pg_repo::PgWarehouseRepository;
pub use warehouse_repo::{CommitOutcome, WarehouseRepository};
