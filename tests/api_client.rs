use std::io::Read;
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use gameboard::api::{ApiError, Client, ClientConfig, Page, TokenProvider};
use tiny_http::{Response, Server};

struct StaticToken(Option<String>);

impl TokenProvider for StaticToken {
    fn token(&self) -> Option<String> {
        self.0.clone()
    }
}

#[derive(Debug)]
struct Recorded {
    method: String,
    url: String,
    authorization: Option<String>,
    body: String,
}

/// Answers each incoming request with the next canned response.
fn serve(responses: Vec<(u16, &'static str)>) -> (String, Receiver<Recorded>) {
    let server = Server::http("127.0.0.1:0").expect("bind fake backend");
    let addr = server
        .server_addr()
        .to_ip()
        .expect("fake backend listens on tcp");
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for (status, body) in responses {
            let Ok(Some(mut req)) = server.recv_timeout(Duration::from_secs(10)) else {
                return;
            };
            let mut received = String::new();
            let _ = req.as_reader().read_to_string(&mut received);
            let authorization = req
                .headers()
                .iter()
                .find(|header| header.field.equiv("Authorization"))
                .map(|header| header.value.to_string());
            let _ = tx.send(Recorded {
                method: req.method().to_string(),
                url: req.url().to_string(),
                authorization,
                body: received,
            });
            let _ = req.respond(Response::from_string(body).with_status_code(status));
        }
    });
    (format!("http://{addr}/"), rx)
}

fn client(base_url: String, token: Option<&str>) -> Client {
    Client::new(
        Arc::new(StaticToken(token.map(str::to_string))),
        ClientConfig {
            base_url,
            user_agent: "gameboard-tests".into(),
            timeout: Some(Duration::from_secs(5)),
            http_client: None,
        },
    )
    .expect("client")
}

const POSTS: &str = r#"[{
    "_id": "p1",
    "title": "{\"dt\":\"Raid tonight\",\"tg\":\"party\",\"dd\":\"9pm\"}",
    "channel": "c1",
    "author": { "_id": "u1", "fullName": "Eon" },
    "likes": [{ "_id": "l1", "user": "u2", "post": "p1" }],
    "comments": [],
    "createdAt": "2022-06-13T12:00:00.000Z",
    "updatedAt": "2022-06-13T12:30:00.000Z"
}]"#;

#[test]
fn channel_posts_send_offset_and_limit() {
    let (base, rx) = serve(vec![(200, POSTS)]);
    let posts = client(base, None)
        .channel_posts("c1", Some(Page { offset: 7, limit: 7 }))
        .unwrap();

    let seen = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(seen.method, "GET");
    assert_eq!(seen.url, "/posts/channel/c1?offset=7&limit=7");
    assert!(seen.authorization.is_none());

    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].decoded_title().headline(), "Raid tonight");
    assert_eq!(posts[0].channel.id(), "c1");
    assert_eq!(posts[0].likes[0].user, "u2");
}

#[test]
fn authorized_calls_carry_the_bearer_token() {
    let (base, rx) = serve(vec![(200, r#"{ "_id": "l9", "user": "u1", "post": "p1" }"#)]);
    let like = client(base, Some("tok-123")).create_like("p1").unwrap();
    assert_eq!(like.id, "l9");

    let seen = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(seen.method, "POST");
    assert_eq!(seen.url, "/likes/create");
    assert_eq!(seen.authorization.as_deref(), Some("Bearer tok-123"));
    assert!(seen.body.contains(r#""postId":"p1""#));
}

#[test]
fn missing_token_fails_before_any_request() {
    let (base, rx) = serve(vec![(200, "{}")]);
    let err = client(base, None).create_comment("p1", "hello").unwrap_err();
    assert!(matches!(err, ApiError::MissingToken));
    assert!(rx.recv_timeout(Duration::from_millis(300)).is_err());
}

#[test]
fn rejected_request_keeps_the_status() {
    let (base, _rx) = serve(vec![(400, "duplicate email")]);
    let err = client(base, None)
        .signup("eon@example.com", "Eon", "secret")
        .unwrap_err();
    match err {
        ApiError::Status { status, body } => {
            assert_eq!(status.as_u16(), 400);
            assert_eq!(body, "duplicate email");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn expired_token_maps_to_unauthorized() {
    let (base, _rx) = serve(vec![(401, "jwt expired")]);
    let err = client(base, Some("old")).auth_user().unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized));
    assert_eq!(err.status().map(|s| s.as_u16()), Some(401));
}

#[test]
fn success_without_an_id_is_a_decode_error() {
    let (base, _rx) = serve(vec![(200, r#"{ "user": "u1", "post": "p1" }"#)]);
    let err = client(base, Some("tok")).create_like("p1").unwrap_err();
    assert!(matches!(err, ApiError::Decode { .. }), "got {err:?}");
}

#[test]
fn delete_comment_sends_the_id_in_the_body() {
    let (base, rx) = serve(vec![(
        200,
        r#"{ "_id": "c1", "comment": "bye", "author": "u1", "post": "p1" }"#,
    )]);
    let removed = client(base, Some("tok")).delete_comment("c1").unwrap();
    assert_eq!(removed.id, "c1");

    let seen = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(seen.method, "DELETE");
    assert_eq!(seen.url, "/comments/delete");
    assert!(seen.body.contains(r#""id":"c1""#));
}

#[test]
fn update_post_puts_the_multipart_form() {
    let (base, rx) = serve(vec![(200, POSTS.trim_start_matches('[').trim_end_matches(']'))]);
    let updated = client(base, Some("tok"))
        .update_post("p1", "c1", r#"{"dt":"Raid moved","tg":"party","dd":"10pm"}"#)
        .unwrap();
    assert_eq!(updated.id, "p1");

    let seen = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(seen.method, "PUT");
    assert_eq!(seen.url, "/posts/update");
    assert_eq!(seen.authorization.as_deref(), Some("Bearer tok"));
    assert!(seen.body.contains(r#"name="postId""#));
    assert!(seen.body.contains(r#"name="channelId""#));
    assert!(seen.body.contains("Raid moved"));
}
