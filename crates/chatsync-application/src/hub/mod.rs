//! Hub application services.

mod repository;

pub use repository::HubRepository;
