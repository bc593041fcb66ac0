//! Data models for gearhire entities.
//!
//! - `User`, `Role`, `Registration`: identity records from the auth endpoints
//! - `Category`, `Subcategory`, `Equipment`: the rental catalog hierarchy
//! - `*Input`: request bodies for admin catalog writes

pub mod catalog;
pub mod user;

pub use catalog::{Category, CategoryInput, Equipment, EquipmentInput, Subcategory, SubcategoryInput};
pub use user::{Registration, Role, User};
