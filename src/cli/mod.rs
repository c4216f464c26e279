pub mod accounts;
pub mod extract;
pub mod setup;
pub mod sync;
pub mod ui;
