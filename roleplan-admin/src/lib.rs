pub mod adapter;
pub mod allocations;
pub mod catalog;
pub mod error;
pub mod server;
pub mod session;
mod staging;

pub use allocations::{BackendPaths, RoleAllocations, SaveAllocationsRequest, SaveSummary};
pub use catalog::{RoleCatalog, RoleMapping};
pub use error::AdminError;
pub use server::{
    AdminConfig, AdminState, AllocationsResponse, ErrorResponse, ROLE_ALLOCATIONS_PATH,
    SaveResponse, build_admin_app,
};
pub use session::{AccessGuard, HeaderSessionResolver, Session, SessionResolver};
