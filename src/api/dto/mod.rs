//! Data Transfer Objects for REST request/response serialization.
//!
//! User ids are plain JSON numbers; amounts are integer credit counts and
//! prices are integer minor currency units.

pub mod account_dto;
pub mod common_dto;
pub mod generation_dto;
pub mod ledger_dto;
pub mod purchase_dto;

pub use account_dto::*;
pub use common_dto::*;
pub use generation_dto::*;
pub use ledger_dto::*;
pub use purchase_dto::*;
