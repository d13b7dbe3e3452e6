//! Authorization for administrative commands.
//!
//! # Purpose
//! Groups the role allow-list used to gate pace creation, removal, and pings.
pub mod access;
