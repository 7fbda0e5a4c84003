//! Handlers HTTP agrupados por área.

pub mod account;
pub mod commission;
pub mod crm;
pub mod gate;
pub mod health;
pub mod referral;
