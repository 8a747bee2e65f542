use axum::{
    routing::{get, post},
    Router,
};

use crate::api::{handlers, AppState};
use crate::store::traits::Store;

const CLUSTERS: &str = "/subscriptions/:subscription_id/resourceGroups/:resource_group_name/providers/Microsoft.RedHatOpenShift/hcpOpenShiftClusters";

pub fn create_router<S: Store>() -> Router<AppState<S>> {
    let cluster = format!("{CLUSTERS}/:cluster_name");
    let node_pools = format!("{cluster}/nodePools");
    let external_auths = format!("{cluster}/externalAuths");

    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Clusters
        .route(CLUSTERS, get(handlers::list_clusters::<S>))
        .route(
            &cluster,
            get(handlers::get_resource::<S>)
                .put(handlers::put_resource::<S>)
                .patch(handlers::patch_resource::<S>)
                .delete(handlers::delete_resource::<S>),
        )
        // Node pools
        .route(&node_pools, get(handlers::list_node_pools::<S>))
        .route(
            &format!("{node_pools}/:node_pool_name"),
            get(handlers::get_resource::<S>)
                .put(handlers::put_resource::<S>)
                .patch(handlers::patch_resource::<S>)
                .delete(handlers::delete_resource::<S>),
        )
        // External auths
        .route(&external_auths, get(handlers::list_external_auths::<S>))
        .route(
            &format!("{external_auths}/:external_auth_name"),
            get(handlers::get_resource::<S>)
                .put(handlers::put_resource::<S>)
                .patch(handlers::patch_resource::<S>)
                .delete(handlers::delete_resource::<S>),
        )
        // Operation status
        .route(
            "/subscriptions/:subscription_id/providers/Microsoft.RedHatOpenShift/locations/:location/hcpOperationStatuses/:operation_id",
            get(handlers::get_operation_status::<S>),
        )
        // Admin diagnostics
        .route(
            "/admin/subscriptions/:subscription_id/operations",
            get(handlers::list_operations::<S>),
        )
        .route(
            "/admin/subscriptions/:subscription_id/operations/prune",
            post(handlers::prune_operations::<S>),
        )
}
