//! The API adapter: parses requests, validates their bodies, calls one store
//! operation, and maps the outcome to the response envelope. All policy about
//! HTTP statuses lives here; the store itself only reports typed outcomes.

use {
    crate::{
        error::Error,
        forest::Forest,
        msg::{
            DirectoryCreateRequest, Envelope, LevelPath, NodeCreateRequest, NodePath,
            PersistRequest, SegmentCreateRequest, SegmentPath, TreePath, TreeRequest,
        },
        router::AppState,
        snapshot,
        types::{NodeKind, SegmentId, TreeId},
    },
    gotham::{
        handler::HandlerResult,
        helpers::http::response::create_response,
        hyper::{body, Body, Response, StatusCode},
        state::{FromState, State},
    },
    serde::{de::DeserializeOwned, Serialize},
    serde_json::Value,
    std::{fmt::Display, path::PathBuf},
};

// ------------------------------ plumbing ---------------------------------

fn json_response(state: &State, status: StatusCode, envelope: &Envelope) -> Response<Body> {
    let body = serde_json::to_vec(envelope).expect("envelopes always serialize");
    create_response(state, status, mime::APPLICATION_JSON, body)
}

fn success<T: Serialize>(state: &State, payload: T) -> Response<Body> {
    json_response(state, StatusCode::OK, &Envelope::success(payload))
}

fn failure(state: &State, status: StatusCode, message: impl Display) -> Response<Body> {
    json_response(
        state,
        status,
        &Envelope::error(status.as_u16(), message.to_string()),
    )
}

/// Map a store outcome to its HTTP status: missing entities are 404,
/// identifier collisions and non-container parents are 409, requests the
/// store is built to refuse are 400, and invariant violations are 500.
fn store_failure(state: &State, err: Error) -> Response<Body> {
    let status = match err {
        Error::TreeNotFound { .. }
        | Error::SegmentNotFound { .. }
        | Error::NodeNotFound { .. } => StatusCode::NOT_FOUND,
        Error::TreeExists { .. }
        | Error::SegmentExists { .. }
        | Error::NodeExists { .. }
        | Error::NotAContainer { .. } => StatusCode::CONFLICT,
        Error::ExplicitRoot | Error::RootRemoval => StatusCode::BAD_REQUEST,
        Error::RootMissing { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    failure(state, status, err)
}

fn respond<T: Serialize>(state: &State, result: Result<T, Error>) -> Response<Body> {
    match result {
        Ok(payload) => success(state, payload),
        Err(err) => store_failure(state, err),
    }
}

/// Run `f` with the store locked. The lock is held for the whole operation,
/// so handlers never observe each other mid-mutation.
fn with_forest<T>(state: &State, f: impl FnOnce(&mut Forest) -> T) -> T {
    let app = AppState::borrow_from(state);
    let mut forest = app.forest.lock().expect("forest mutex poisoned");
    f(&mut forest)
}

/// Read and parse a JSON request body. The `Err` side carries a ready-made
/// 400 response.
async fn parse_body<T: DeserializeOwned>(state: &mut State) -> Result<T, Response<Body>> {
    let bytes = match body::to_bytes(Body::take_from(state)).await {
        Ok(bytes) => bytes,
        Err(err) => {
            return Err(failure(
                state,
                StatusCode::BAD_REQUEST,
                format!("unable to read request body: {err}"),
            ))
        }
    };
    if bytes.is_empty() {
        return Err(failure(state, StatusCode::BAD_REQUEST, "JSON body not sent"));
    }
    serde_json::from_slice(&bytes).map_err(|err| {
        failure(
            state,
            StatusCode::BAD_REQUEST,
            format!("malformed JSON body: {err}"),
        )
    })
}

fn check_position(state: &State, position: Option<i64>) -> Option<Response<Body>> {
    match position {
        Some(position) if position < 1 => Some(failure(
            state,
            StatusCode::BAD_REQUEST,
            "position can't be less than 1",
        )),
        _ => None,
    }
}

// ------------------------------- banner ----------------------------------

pub fn banner(state: State) -> (State, Response<Body>) {
    let response = failure(&state, StatusCode::NOT_FOUND, "Resource not found.");
    (state, response)
}

pub fn not_implemented(state: State) -> (State, Response<Body>) {
    let response = failure(&state, StatusCode::BAD_REQUEST, "not implemented");
    (state, response)
}

// -------------------------------- trees ----------------------------------

pub async fn tree_create(mut state: State) -> HandlerResult {
    let response = match parse_body::<TreeRequest>(&mut state).await {
        Ok(req) => with_forest(&state, |forest| {
            respond(&state, forest.add_tree(req.tree_id).map(|()| true))
        }),
        Err(response) => response,
    };
    Ok((state, response))
}

pub async fn tree_remove(mut state: State) -> HandlerResult {
    let response = match parse_body::<TreeRequest>(&mut state).await {
        Ok(req) => with_forest(&state, |forest| {
            respond(&state, forest.remove_tree(req.tree_id).map(|()| true))
        }),
        Err(response) => response,
    };
    Ok((state, response))
}

pub fn trees_list(state: State) -> (State, Response<Body>) {
    let response = with_forest(&state, |forest| success(&state, forest.trees()));
    (state, response)
}

// ------------------------------- segments --------------------------------

pub fn segments_list(mut state: State) -> (State, Response<Body>) {
    let TreePath { tree_id } = TreePath::take_from(&mut state);
    let response = with_forest(&state, |forest| respond(&state, forest.segments(tree_id)));
    (state, response)
}

pub async fn segment_create(mut state: State) -> HandlerResult {
    let TreePath { tree_id } = TreePath::take_from(&mut state);
    let response = match parse_body::<SegmentCreateRequest>(&mut state).await {
        Ok(req) => with_forest(&state, |forest| {
            respond(
                &state,
                forest
                    .add_segment(tree_id, req.segment_id, req.root_node_id)
                    .map(|()| true),
            )
        }),
        Err(response) => response,
    };
    Ok((state, response))
}

pub fn segment_remove(mut state: State) -> (State, Response<Body>) {
    let SegmentPath { tree_id, segment_id } = SegmentPath::take_from(&mut state);
    let response = with_forest(&state, |forest| {
        respond(&state, forest.remove_segment(tree_id, segment_id).map(|()| true))
    });
    (state, response)
}

pub fn segment_root(mut state: State) -> (State, Response<Body>) {
    let SegmentPath { tree_id, segment_id } = SegmentPath::take_from(&mut state);
    let response = with_forest(&state, |forest| {
        respond(&state, forest.segment_root(tree_id, segment_id))
    });
    (state, response)
}

// ------------------------------- retrieval -------------------------------

pub fn level_get(mut state: State) -> (State, Response<Body>) {
    let LevelPath {
        tree_id,
        segment_id,
        parent_node_id,
    } = LevelPath::take_from(&mut state);
    let response = with_forest(&state, |forest| {
        respond(&state, forest.level(tree_id, segment_id, parent_node_id))
    });
    (state, response)
}

pub fn breadcrumbs_get(mut state: State) -> (State, Response<Body>) {
    let NodePath {
        tree_id,
        segment_id,
        node_id,
    } = NodePath::take_from(&mut state);
    let response = with_forest(&state, |forest| {
        respond(&state, forest.breadcrumbs(tree_id, segment_id, node_id))
    });
    (state, response)
}

pub fn everything_get(state: State) -> (State, Response<Body>) {
    let response = with_forest(&state, |forest| respond(&state, forest.everything()));
    (state, response)
}

pub fn tree_get(mut state: State) -> (State, Response<Body>) {
    let TreePath { tree_id } = TreePath::take_from(&mut state);
    let response = with_forest(&state, |forest| respond(&state, forest.tree_dump(tree_id)));
    (state, response)
}

pub fn segment_get(mut state: State) -> (State, Response<Body>) {
    let SegmentPath { tree_id, segment_id } = SegmentPath::take_from(&mut state);
    let response = with_forest(&state, |forest| {
        respond(&state, forest.segment_dump(tree_id, segment_id))
    });
    (state, response)
}

// ------------------------------ directories ------------------------------

pub async fn directory_create(mut state: State) -> HandlerResult {
    let SegmentPath { tree_id, segment_id } = SegmentPath::take_from(&mut state);
    let response = match parse_body::<DirectoryCreateRequest>(&mut state).await {
        Ok(req) => match check_position(&state, req.position) {
            Some(response) => response,
            None => with_forest(&state, |forest| {
                respond(
                    &state,
                    forest
                        .add_directory(tree_id, segment_id, req.parent_node_id, req.node_id, req.position)
                        .map(|()| true),
                )
            }),
        },
        Err(response) => response,
    };
    Ok((state, response))
}

pub fn directory_remove(mut state: State) -> (State, Response<Body>) {
    let NodePath {
        tree_id,
        segment_id,
        node_id,
    } = NodePath::take_from(&mut state);
    let response = with_forest(&state, |forest| {
        respond(
            &state,
            forest.remove_directory(tree_id, segment_id, node_id).map(|()| true),
        )
    });
    (state, response)
}

// --------------------------------- nodes ---------------------------------

pub async fn node_create(mut state: State) -> HandlerResult {
    let SegmentPath { tree_id, segment_id } = SegmentPath::take_from(&mut state);
    let response = match parse_body::<NodeCreateRequest>(&mut state).await {
        Ok(req) => leaf_response(&state, tree_id, segment_id, req),
        Err(response) => response,
    };
    Ok((state, response))
}

fn leaf_response(
    state: &State,
    tree_id: TreeId,
    segment_id: SegmentId,
    req: NodeCreateRequest,
) -> Response<Body> {
    if let Some(response) = check_position(state, req.position) {
        return response;
    }
    let kind = NodeKind::from(req.kind);
    if kind.is_container() {
        return failure(
            state,
            StatusCode::BAD_REQUEST,
            "node type can't be root or dir, use the other endpoints to create those",
        );
    }
    let payload = match req.payload {
        Value::Null => None,
        value => Some(value),
    };
    with_forest(state, |forest| {
        respond(
            state,
            forest
                .add_node(
                    tree_id,
                    segment_id,
                    req.parent_node_id,
                    req.node_id,
                    req.position,
                    Vec::new(),
                    kind,
                    payload,
                )
                .map(|()| true),
        )
    })
}

pub fn node_remove(mut state: State) -> (State, Response<Body>) {
    let NodePath {
        tree_id,
        segment_id,
        node_id,
    } = NodePath::take_from(&mut state);
    let response = with_forest(&state, |forest| {
        respond(&state, forest.remove_node(tree_id, segment_id, node_id).map(|()| true))
    });
    (state, response)
}

// ------------------------- generic and persistence ------------------------

pub fn clear_all(state: State) -> (State, Response<Body>) {
    let response = with_forest(&state, |forest| {
        forest.clear();
        success(&state, true)
    });
    (state, response)
}

pub async fn persist(mut state: State) -> HandlerResult {
    // The body is optional here: no body, or an empty one, means "write to
    // the configured data file".
    let bytes = match body::to_bytes(Body::take_from(&mut state)).await {
        Ok(bytes) => bytes,
        Err(err) => {
            let response = failure(
                &state,
                StatusCode::BAD_REQUEST,
                format!("unable to read request body: {err}"),
            );
            return Ok((state, response));
        }
    };
    let filename = if bytes.is_empty() {
        None
    } else {
        match serde_json::from_slice::<PersistRequest>(&bytes) {
            Ok(req) => req.filename,
            Err(err) => {
                let response = failure(
                    &state,
                    StatusCode::BAD_REQUEST,
                    format!("malformed JSON body: {err}"),
                );
                return Ok((state, response));
            }
        }
    };

    let target: PathBuf = match filename {
        Some(name) => PathBuf::from(name),
        None => AppState::borrow_from(&state).data_file.clone(),
    };

    let response = match with_forest(&state, |forest| snapshot::save(forest, &target)) {
        Ok(()) => {
            log::debug!("persisted forest to {}", target.display());
            success(&state, true)
        }
        Err(err) => {
            log::error!("persisting forest to {} failed: {err}", target.display());
            failure(&state, StatusCode::INTERNAL_SERVER_ERROR, err)
        }
    };
    Ok((state, response))
}
