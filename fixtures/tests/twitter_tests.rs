use serde_json::Value;

async fn spawn_fixture() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fixture listener");
    let addr = listener.local_addr().expect("fixture addr");
    tokio::spawn(async move {
        axum::serve(listener, fixtures::twitter::twitter_router())
            .await
            .expect("fixture server");
    });
    format!("http://{addr}")
}

fn oauth_header(token: &str) -> String {
    format!("OAuth oauth_consumer_key=\"ck\", oauth_token=\"{token}\"")
}

#[tokio::test]
async fn request_token_is_form_encoded_and_confirmed() {
    let base = spawn_fixture().await;
    let client = reqwest::Client::new();

    let body = client
        .post(format!("{base}/oauth/request_token"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    assert!(body.contains("oauth_token=fixture-request-token"));
    assert!(body.contains("oauth_callback_confirmed=true"));
}

#[tokio::test]
async fn access_token_requires_the_request_token() {
    let base = spawn_fixture().await;
    let client = reqwest::Client::new();

    let unauthenticated = client
        .post(format!("{base}/oauth/access_token"))
        .send()
        .await
        .unwrap();
    assert_eq!(unauthenticated.status(), reqwest::StatusCode::UNAUTHORIZED);

    let authenticated = client
        .post(format!("{base}/oauth/access_token"))
        .header("Authorization", oauth_header(fixtures::twitter::REQUEST_TOKEN_KEY))
        .send()
        .await
        .unwrap();
    assert_eq!(authenticated.status(), reqwest::StatusCode::OK);
    let body = authenticated.text().await.unwrap();
    assert!(body.contains("oauth_token=fixture-access-token"));
    assert!(body.contains("screen_name=fixture_user"));
}

#[tokio::test]
async fn expired_tokens_get_401s() {
    let base = spawn_fixture().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{base}/1.1/account/verify_credentials.json"))
        .header("Authorization", oauth_header(fixtures::twitter::EXPIRED_TOKEN))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn home_timeline_respects_include_rts_and_counts_fetches() {
    let base = spawn_fixture().await;
    let client = reqwest::Client::new();
    let auth = oauth_header("anything");

    let with_rts: Value = client
        .get(format!("{base}/1.1/statuses/home_timeline.json?count=50&include_rts=true"))
        .header("Authorization", &auth)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(with_rts.as_array().unwrap().len(), 2);

    let without_rts: Value = client
        .get(format!("{base}/1.1/statuses/home_timeline.json?count=50&include_rts=false"))
        .header("Authorization", &auth)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(without_rts.as_array().unwrap().len(), 1);

    let counter: Value = client
        .get(format!("{base}/_fixture/timeline_requests"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(counter["count"], 2);
}
