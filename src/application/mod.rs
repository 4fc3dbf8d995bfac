// Application layer: use cases over the repository.
// Every operation that writes more than one row runs inside a single
// storage::UnitOfWork and returns an AppError when it is rolled back.

mod categories;
pub mod error;
mod migration;
mod reporting;
mod service;
mod transfer;

pub use error::*;
pub use migration::MigrationResult;
pub use reporting::*;
pub use service::*;
pub use transfer::*;
