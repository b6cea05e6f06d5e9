//! The route table, and the application state shared across handlers.

use {
    crate::{
        forest::Forest,
        handlers,
        msg::{LevelPath, NodePath, SegmentPath, TreePath},
    },
    gotham::{
        hyper::Method,
        middleware::state::StateMiddleware,
        pipeline::{single_middleware, single_pipeline},
        prelude::*,
        router::{build_router, Router},
    },
    std::{
        path::PathBuf,
        sync::{Arc, Mutex},
    },
};

/// Shared application state: the store behind its single exclusive lock,
/// plus the configured default snapshot target.
#[derive(Clone, StateData)]
pub struct AppState {
    pub forest: Arc<Mutex<Forest>>,
    pub data_file: PathBuf,
}

impl AppState {
    pub fn new(forest: Forest, data_file: impl Into<PathBuf>) -> Self {
        Self {
            forest: Arc::new(Mutex::new(forest)),
            data_file: data_file.into(),
        }
    }
}

pub fn router(app_state: AppState) -> Router {
    let middleware = StateMiddleware::new(app_state);
    let pipeline = single_middleware(middleware);
    let (chain, pipelines) = single_pipeline(pipeline);

    build_router(chain, pipelines, |route| {
        route.get("/").to(handlers::banner);

        route.post("/tree").to_async(handlers::tree_create);
        route.delete("/tree").to_async(handlers::tree_remove);
        // full dump, for debugging
        route.get("/tree").to(handlers::everything_get);
        route.get("/trees").to(handlers::trees_list);

        route
            .get("/tree/:tree_id")
            .with_path_extractor::<TreePath>()
            .to(handlers::tree_get);
        route
            .get("/tree/:tree_id/segments")
            .with_path_extractor::<TreePath>()
            .to(handlers::segments_list);

        route
            .post("/tree/:tree_id/segment")
            .with_path_extractor::<TreePath>()
            .to_async(handlers::segment_create);
        route
            .delete("/tree/:tree_id/segment/:segment_id")
            .with_path_extractor::<SegmentPath>()
            .to(handlers::segment_remove);
        route
            .get("/tree/:tree_id/segment/:segment_id")
            .with_path_extractor::<SegmentPath>()
            .to(handlers::segment_get);
        route
            .get("/tree/:tree_id/segment/:segment_id/root")
            .with_path_extractor::<SegmentPath>()
            .to(handlers::segment_root);

        route
            .get("/tree/:tree_id/segment/:segment_id/level/:parent_node_id")
            .with_path_extractor::<LevelPath>()
            .to(handlers::level_get);
        route
            .get("/tree/:tree_id/segment/:segment_id/breadcrumbs/:node_id")
            .with_path_extractor::<NodePath>()
            .to(handlers::breadcrumbs_get);

        route
            .post("/tree/:tree_id/segment/:segment_id/directory")
            .with_path_extractor::<SegmentPath>()
            .to_async(handlers::directory_create);
        route
            .delete("/tree/:tree_id/segment/:segment_id/directory/:node_id")
            .with_path_extractor::<NodePath>()
            .to(handlers::directory_remove);

        route
            .post("/tree/:tree_id/segment/:segment_id/node")
            .with_path_extractor::<SegmentPath>()
            .to_async(handlers::node_create);
        route
            .delete("/tree/:tree_id/segment/:segment_id/node/:node_id")
            .with_path_extractor::<NodePath>()
            .to(handlers::node_remove);

        // Operations the store does not implement yet answer with an
        // explanatory 400 rather than vanishing from the route table.
        route
            .request(
                vec![Method::POST, Method::PUT],
                "/tree/:tree_id/segment/:segment_id/duplicate",
            )
            .to(handlers::not_implemented);
        route
            .request(
                vec![Method::POST, Method::PUT],
                "/tree/:tree_id/segment/:segment_id/directory/:node_id/duplicate",
            )
            .to(handlers::not_implemented);
        route
            .request(
                vec![Method::POST, Method::PUT],
                "/tree/:tree_id/segment/:segment_id/directory/:node_id/move",
            )
            .to(handlers::not_implemented);
        route
            .request(
                vec![Method::POST, Method::PUT],
                "/tree/:tree_id/segment/:segment_id/node/:node_id/move",
            )
            .to(handlers::not_implemented);
        route
            .post("/tree/:tree_id/segment/:segment_id/level/:parent_node_id")
            .to(handlers::not_implemented);

        route.post("/clear").to(handlers::clear_all);
        route.post("/persist").to_async(handlers::persist);
    })
}
