use std::convert::Infallible;

use serde::Serialize;
use uuid::Uuid;
use warp::http::StatusCode;
use warp::{reject, Filter, Rejection, Reply};

use protocol::{CreateRoomRequest, JoinRoomRequest, User};
use room::{ErrorKind, RoomStore};

#[derive(Debug)]
struct ApiError(ErrorKind);

impl reject::Reject for ApiError {}

#[derive(Serialize)]
struct ErrorMessage {
    code: u16,
    message: String,
}

pub fn api(store: RoomStore) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    let with_store = warp::any().map(move || store.clone());

    let ping = warp::path!("api" / "ping")
        .and(warp::get())
        .map(|| warp::reply::json(&"pong"));

    let create_room = warp::path!("api" / "rooms")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_store.clone())
        .and_then(create_room_handle);

    let join_room = warp::path!("api" / "rooms" / "join")
        .and(warp::put())
        .and(warp::body::json())
        .and(with_store.clone())
        .and_then(join_room_handle);

    let room_state = warp::path!("api" / "rooms" / String)
        .and(warp::get())
        .and(with_store)
        .and_then(room_state_handle);

    let cors = warp::cors()
        .allow_any_origin()
        .allow_methods(vec!["GET", "POST", "PUT"])
        .allow_header("content-type");

    ping.or(create_room)
        .or(join_room)
        .or(room_state)
        .with(cors)
        .recover(handle_rejection)
        .with(warp::trace::request())
}

fn new_user(username: String, avatar: protocol::Avatar) -> Result<User, Rejection> {
    let username = username.trim().to_string();
    if username.is_empty() {
        return Err(reject::custom(ApiError(ErrorKind::Decode("username is empty".into()))));
    }
    Ok(User { user_id: Uuid::new_v4(), username, avatar })
}

async fn create_room_handle(req: CreateRoomRequest, store: RoomStore) -> Result<impl Reply, Rejection> {
    let host = new_user(req.username, req.avatar)?;
    let view = store
        .create_room(host, req.capacity)
        .await
        .map_err(|err| reject::custom(ApiError(err)))?;
    Ok(warp::reply::with_status(warp::reply::json(&view), StatusCode::CREATED))
}

async fn join_room_handle(req: JoinRoomRequest, store: RoomStore) -> Result<impl Reply, Rejection> {
    let user = new_user(req.username, req.avatar)?;
    let view = store
        .join_room(&req.room_id, user)
        .await
        .map_err(|err| reject::custom(ApiError(err)))?;
    Ok(warp::reply::json(&view))
}

async fn room_state_handle(room_id: String, store: RoomStore) -> Result<impl Reply, Rejection> {
    match store.get_room(&room_id).await {
        Some(room) => Ok(warp::reply::json(&room.view())),
        None => Err(reject::custom(ApiError(ErrorKind::NotFound))),
    }
}

fn status_of(kind: &ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::RoomFull | ErrorKind::AlreadyExists => StatusCode::CONFLICT,
        ErrorKind::WrongPhase => StatusCode::FORBIDDEN,
        ErrorKind::Decode(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (code, message) = if let Some(ApiError(kind)) = err.find::<ApiError>() {
        (status_of(kind), kind.to_string())
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, "not found".to_string())
    } else if let Some(body_err) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, body_err.to_string())
    } else if let Some(cors_err) = err.find::<warp::cors::CorsForbidden>() {
        (StatusCode::FORBIDDEN, cors_err.to_string())
    } else if err.find::<reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "method not allowed".to_string())
    } else {
        tracing::warn!(?err, "unhandled rejection");
        (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
    };
    let body = warp::reply::json(&ErrorMessage { code: code.as_u16(), message });
    Ok(warp::reply::with_status(body, code))
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::RoomView;
    use serde_json::json;

    async fn create<F>(api: &F, capacity: usize) -> RoomView
    where
        F: Filter + 'static,
        F::Extract: Reply + Send,
    {
        let resp = warp::test::request()
            .method("POST")
            .path("/api/rooms")
            .json(&json!({"username": "host", "capacity": capacity}))
            .reply(api)
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        serde_json::from_slice(resp.body()).unwrap()
    }

    #[tokio::test]
    async fn ping() {
        let api = api(RoomStore::new());
        let resp = warp::test::request().path("/api/ping").reply(&api).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.body().as_ref(), b"\"pong\"");
    }

    #[tokio::test]
    async fn create_join_and_inspect() {
        let api = api(RoomStore::new());
        let created = create(&api, 2).await;
        assert!(created.user_id.is_some());
        assert_eq!(created.host_id, created.user_id.unwrap());

        let resp = warp::test::request()
            .method("PUT")
            .path("/api/rooms/join")
            .json(&json!({"roomId": created.room_id, "username": "guest", "avatar": {"type": 2, "color": "#00ff00"}}))
            .reply(&api)
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let joined: RoomView = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(joined.members.len(), 2);
        assert_eq!(joined.members[1].avatar.kind, 2);

        let resp = warp::test::request()
            .path(&format!("/api/rooms/{}", created.room_id))
            .reply(&api)
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let view: RoomView = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(view.members.len(), 2);
        assert_eq!(view.user_id, None);

        let resp = warp::test::request()
            .method("PUT")
            .path("/api/rooms/join")
            .json(&json!({"roomId": created.room_id, "username": "third"}))
            .reply(&api)
            .await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn unknown_room_is_404() {
        let api = api(RoomStore::new());
        let resp = warp::test::request().path("/api/rooms/nothere").reply(&api).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = warp::test::request()
            .method("PUT")
            .path("/api/rooms/join")
            .json(&json!({"roomId": "nothere", "username": "guest"}))
            .reply(&api)
            .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn bad_input_is_400() {
        let api = api(RoomStore::new());
        let resp = warp::test::request()
            .method("POST")
            .path("/api/rooms")
            .json(&json!({"username": "  ", "capacity": 4}))
            .reply(&api)
            .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = warp::test::request()
            .method("POST")
            .path("/api/rooms")
            .json(&json!({"username": "host", "capacity": 1}))
            .reply(&api)
            .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = warp::test::request()
            .method("POST")
            .path("/api/rooms")
            .body("{not json")
            .reply(&api)
            .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
