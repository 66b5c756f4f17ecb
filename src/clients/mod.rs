//! Typed wrappers around [`ManagementClient`](crate::framework::ManagementClient).

pub mod ejb3_client;
pub mod management_operations;

pub use ejb3_client::*;
pub use management_operations::*;
