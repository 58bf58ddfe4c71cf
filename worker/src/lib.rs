pub mod handlers;
pub mod state;

pub use handlers::{build_mapper_router, build_reducer_router};
pub use state::AppState;

use axum::Router;
use common::WorkerRole;

/// Router según el rol del proceso.
pub fn build_router(state: AppState) -> Router {
    match state.role {
        WorkerRole::Mapper => build_mapper_router(state),
        WorkerRole::Reducer => build_reducer_router(state),
    }
}
