//! Shared harness for the HTTP integration tests: a temporary SQLite file,
//! an in-memory mailer and a fake LLM behind the real router.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use diesel::prelude::*;
use famiglia_server::auth::hash_register_key;
use famiglia_server::config::{Config, RegisterKey};
use famiglia_server::db::create_pool;
use famiglia_server::labels::seed_from_file;
use famiglia_server::llm::{FakeProvider, LlmProvider};
use famiglia_server::mail::{Email, MemoryMailer};
use famiglia_server::models::Role;
use famiglia_server::schema::users;
use famiglia_server::{app, AppState};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::{Arc, OnceLock};
use tempfile::TempDir;
use tower::ServiceExt;

pub const REGISTER_KEY: &str = "la-famiglia";
pub const PASSWORD: &str = "password123";
const BOUNDARY: &str = "famiglia-test-boundary";

fn register_key() -> &'static (String, String) {
    static KEY: OnceLock<(String, String)> = OnceLock::new();
    KEY.get_or_init(|| hash_register_key(REGISTER_KEY).expect("hash register key"))
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub mailer: Arc<MemoryMailer>,
    pub llm: Arc<FakeProvider>,
    _dir: TempDir,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn error(&self) -> &str {
        self.body["error"].as_str().unwrap_or_default()
    }
}

/// A file part for [`TestApp::multipart`].
pub struct FilePart<'a> {
    pub name: &'a str,
    pub filename: &'a str,
    pub content_type: &'a str,
    pub data: &'a [u8],
}

impl TestApp {
    pub fn spawn() -> Self {
        Self::spawn_with(|_| {}, true)
    }

    /// Same app with extraction unconfigured.
    pub fn spawn_without_llm() -> Self {
        Self::spawn_with(|_| {}, false)
    }

    pub fn spawn_with(tweak: impl FnOnce(&mut Config), with_llm: bool) -> Self {
        std::env::set_var("INSECURE_PASSWORD_HASHING", "1");

        let dir = tempfile::tempdir().expect("tempdir");
        let (salt, hash) = register_key().clone();
        let mut config = Config {
            database_url: dir.path().join("site.db").display().to_string(),
            image_uploads_path: dir.path().join("recipe-images"),
            register_key: Some(RegisterKey { salt, hash }),
            ..Config::default()
        };
        tweak(&mut config);

        let pool = create_pool(&config.database_url).expect("pool");
        {
            let mut conn = pool.get().expect("conn");
            seed_from_file(&mut conn, None).expect("seed labels");
        }

        let mailer = Arc::new(MemoryMailer::new());
        let llm = Arc::new(FakeProvider::new());
        let provider = with_llm.then(|| llm.clone() as Arc<dyn LlmProvider>);

        let state = AppState::new(pool, config, mailer.clone(), provider);
        Self {
            router: app(state.clone()),
            state,
            mailer,
            llm,
            _dir: dir,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("read body")
            .to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn json(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        self.json_with_headers(method, uri, token, body, &[]).await
    }

    pub async fn json_with_headers(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");
        self.send(request).await
    }

    pub async fn get(&self, uri: &str, token: &str) -> TestResponse {
        self.json(Method::GET, uri, Some(token), None).await
    }

    /// Sends a multipart body made of text fields and file parts.
    pub async fn multipart(
        &self,
        method: Method,
        uri: &str,
        token: &str,
        fields: &[(&str, &str)],
        files: &[FilePart<'_>],
    ) -> TestResponse {
        let mut body: Vec<u8> = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                    BOUNDARY, name, value
                )
                .as_bytes(),
            );
        }
        for file in files {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                    BOUNDARY, file.name, file.filename, file.content_type
                )
                .as_bytes(),
            );
            body.extend_from_slice(file.data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .expect("request");
        self.send(request).await
    }

    pub async fn register(&self, name: &str, email: &str) -> TestResponse {
        self.json(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "name": name,
                "email": email,
                "password": PASSWORD,
                "register_key": REGISTER_KEY,
            })),
        )
        .await
    }

    /// Registers, verifies the email and returns the access token.
    pub async fn signup(&self, name: &str, email: &str) -> String {
        let registered = self.register(name, email).await;
        assert_eq!(registered.status, StatusCode::CREATED, "{:?}", registered.body);

        let token = self.last_token_for(email);
        let verified = self
            .json(
                Method::POST,
                "/api/auth/verify-email",
                None,
                Some(json!({ "token": token })),
            )
            .await;
        assert_eq!(verified.status, StatusCode::OK, "{:?}", verified.body);
        verified.body["access_token"]
            .as_str()
            .expect("access token")
            .to_string()
    }

    pub async fn login(&self, email: &str, password: &str, mobile: bool) -> TestResponse {
        let headers: &[(&str, &str)] = if mobile {
            &[("x-is-mobile", "true")]
        } else {
            &[]
        };
        self.json_with_headers(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": email, "password": password })),
            headers,
        )
        .await
    }

    /// Token from the link of the last email sent to `email`.
    pub fn last_token_for(&self, email: &str) -> String {
        let mail = self.mailer.last_to(email).expect("an email was sent");
        token_from(&mail)
    }

    pub fn set_role(&self, email: &str, role: Role) {
        let mut conn = self.state.pool.get().expect("conn");
        diesel::update(users::table.filter(users::email.eq(email)))
            .set(users::role.eq(role.as_str()))
            .execute(&mut conn)
            .expect("set role");
    }

    pub fn user_id(&self, email: &str) -> i32 {
        let mut conn = self.state.pool.get().expect("conn");
        users::table
            .filter(users::email.eq(email))
            .select(users::id)
            .first(&mut conn)
            .expect("user exists")
    }
}

pub fn token_from(email: &Email) -> String {
    let start = email.html.find("token=").expect("link with token") + "token=".len();
    email.html[start..]
        .chars()
        .take_while(|c| c.is_ascii_hexdigit())
        .collect()
}

pub fn recipe_json(title: &str, labels: &[&str]) -> String {
    json!({
        "title": title,
        "cooking": 25,
        "preparation": 15,
        "servings": 4,
        "ingredients": [
            { "quantity": 200, "description": "g de farine" },
            { "quantity": 2, "description": "œufs" }
        ],
        "steps": [
            { "content": "Mélanger la farine et les œufs" },
            { "content": "Cuire 25 minutes" }
        ],
        "labels": labels,
    })
    .to_string()
}

/// Creates a recipe and returns its id.
pub async fn create_recipe(app: &TestApp, token: &str, title: &str, labels: &[&str]) -> i32 {
    let form = recipe_json(title, labels);
    let res = app
        .multipart(Method::POST, "/api/recipes", token, &[("recipe", form.as_str())], &[])
        .await;
    assert_eq!(res.status, StatusCode::CREATED, "{:?}", res.body);
    res.body["id"].as_i64().expect("id") as i32
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([180, 90, 30]));
    let mut buf = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, image::ImageFormat::Png)
        .expect("encode png");
    buf.into_inner()
}
