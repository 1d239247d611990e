//! Voucher posting: numbering, validation, storage and verification

pub mod builder;
pub mod sequence;
pub mod store;
pub mod validate;
pub mod verify;

pub use builder::*;
pub use sequence::*;
pub use store::*;
pub use validate::*;
pub use verify::*;
