//! Types shared between the back-office REST client and the console shell.

pub mod domain;
pub mod error;
pub mod protocol;
pub mod validation;
