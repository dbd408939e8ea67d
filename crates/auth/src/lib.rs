//! `globalsourcing-auth` — role-tagged user references.
//!
//! Authentication and user administration live outside this workspace. The
//! workflows only need to know *who* an actor is and *which role* they hold,
//! so that the lookup boundary can refuse e.g. assigning a purchase order to
//! someone who is not a buyer.

pub mod roles;
pub mod user;

pub use roles::Role;
pub use user::User;
