pub mod nalo_provider;

pub use nalo_provider::NaloProvider;
