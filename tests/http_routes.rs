use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    response::Response,
};
use ballpark_live::{
    auth::{StaticRoster, UserSeed},
    config::AppConfig,
    dao::{
        game_directory::StaticGameDirectory,
        models::{GameRecord, GameStatus},
        session_store::InMemorySessionStore,
    },
    routes,
    state::{AppState, Backends},
};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

struct Api {
    app: Router,
    account: Uuid,
    game: Uuid,
}

fn api() -> Api {
    let account = Uuid::new_v4();
    let game = Uuid::new_v4();
    let roster = Arc::new(StaticRoster::new([UserSeed {
        id: Uuid::new_v4(),
        display_name: "Robin".into(),
        token: "robin-token".into(),
        account_id: account,
        manage_games: true,
        team_admin_of: Vec::new(),
    }]));
    let games = Arc::new(StaticGameDirectory::new([GameRecord {
        id: game,
        account_id: account,
        home_team_id: Uuid::new_v4(),
        visitor_team_id: Uuid::new_v4(),
        home_team_name: "Herons".into(),
        visitor_team_name: "Otters".into(),
        status: GameStatus::Scheduled,
        home_score: None,
        visitor_score: None,
    }]));
    let state = AppState::new(
        AppConfig::default(),
        Backends {
            sessions: Arc::new(InMemorySessionStore::new()),
            games,
            identities: roster.clone(),
            permissions: roster,
        },
    );

    Api {
        app: routes::router(state),
        account,
        game,
    }
}

impl Api {
    fn live(&self, suffix: &str) -> String {
        format!("/accounts/{}/games/{}/live{suffix}", self.account, self.game)
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.app.clone().oneshot(request).await.unwrap()
    }

    async fn post(&self, suffix: &str, token: Option<&str>, body: Value) -> Response {
        let mut request = Request::post(self.live(suffix)).header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(request.body(Body::from(body.to_string())).unwrap())
            .await
    }
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn scorer_routes_require_a_valid_bearer_token() {
    let api = api();

    let response = api.post("/start", None, json!({})).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert!(body["message"].as_str().unwrap().contains("missing bearer token"));

    let response = api.post("/start", Some("stolen"), json!({})).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = api.post("/start", Some("robin-token"), json!({})).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ACTIVE");
    assert_eq!(body["startedBy"], "Robin");
}

#[tokio::test]
async fn invalid_score_bodies_are_bad_requests() {
    let api = api();
    let response = api.post("/start", Some("robin-token"), json!({})).await;
    assert_eq!(response.status(), StatusCode::OK);

    for body in [
        json!({"inningNumber": 0, "isHomeTeam": true, "runs": 1}),
        json!({"inningNumber": 100, "isHomeTeam": true, "runs": 1}),
        json!({"inningNumber": 1, "isHomeTeam": true, "runs": 100000}),
    ] {
        let response = api.post("/scores", Some("robin-token"), body).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    let response = api
        .post(
            "/scores",
            Some("robin-token"),
            json!({"inningNumber": 1, "isHomeTeam": false, "runs": 4}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["runs"], 4);
}

#[tokio::test]
async fn subscribe_without_ticket_is_unauthorized() {
    let api = api();

    let response = api
        .send(Request::get(api.live("/subscribe")).body(Body::empty()).unwrap())
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = api
        .send(
            Request::get(api.live("/subscribe?ticket=bogus"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn ticketed_subscribe_opens_an_event_stream() {
    let api = api();

    let response = api.post("/ticket", Some("robin-token"), json!({})).await;
    assert_eq!(response.status(), StatusCode::OK);
    let ticket = json_body(response).await["ticket"]
        .as_str()
        .unwrap()
        .to_owned();

    let response = api
        .send(
            Request::get(api.live(&format!("/subscribe?ticket={ticket}")))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );
}

#[tokio::test]
async fn idle_game_has_no_live_state() {
    let api = api();

    let response = api
        .send(Request::get(api.live("")).body(Body::empty()).unwrap())
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = api
        .send(Request::get(api.live("/status")).body(Body::empty()).unwrap())
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["hasActiveSession"], false);
}
