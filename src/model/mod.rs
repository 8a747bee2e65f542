pub mod cloud_error;
pub mod cluster;
pub mod common;
pub mod external_auth;
pub mod node_pool;
pub mod operation;
pub mod request_context;
pub mod resource;
pub mod resource_id;

pub use cloud_error::*;
pub use cluster::*;
pub use common::*;
pub use external_auth::*;
pub use node_pool::*;
pub use operation::*;
pub use request_context::*;
pub use resource::*;
pub use resource_id::*;
