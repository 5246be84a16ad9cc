//! One-time setup against the checkout service: a throwaway identity, its
//! credential, and a single deliberately scarce product.
//!
//! Every step is fail-fast. A retry here could mask or alter the very race
//! the storm exists to provoke, so a setup failure aborts the run with the
//! raw response attached instead.

use rand::Rng;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::SetupError;

const PASSWORD: &str = "TestPass123!";
const ACCOUNT_NAME: &str = "Race Test User";
const PRODUCT_CATEGORY: &str = "Electronics";
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Everything the storm needs to hit the target. Created once by
/// [`provision`], immutable afterwards, cloned read-only into every virtual
/// client.
#[derive(Debug, Clone)]
pub struct RaceContext {
    pub base_url: String,
    pub token: String,
    pub product_id: String,
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    email: &'a str,
    password: &'a str,
    name: &'a str,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    access_token: Option<String>,
    user: Option<UserRef>,
}

#[derive(Deserialize)]
struct UserRef {
    id: Option<String>,
}

#[derive(Serialize, Debug)]
pub(crate) struct ProductSeed {
    name: String,
    category: &'static str,
    pub(crate) stock: u32,
    pub(crate) price: u64,
    pub(crate) discount: u32,
    created_by: String,
}

#[derive(Deserialize)]
struct ProductResponse {
    id: Option<String>,
}

/// Register a throwaway account, authenticate it, and create one product
/// with a randomized tiny stock. The small stock paired with a large client
/// population is the mechanism that forces the oversell race; ample stock
/// would never exercise the boundary.
pub async fn provision(
    client: &Client,
    base_url: &str,
    rng: &mut impl Rng,
    epoch_ms: u128,
) -> Result<RaceContext, SetupError> {
    let tag = unique_tag(epoch_ms, rng);
    let email = format!("race_{tag}@test.local");

    // Best-effort: a registration hiccup only matters if the login below
    // cannot authenticate the identity.
    let registered = client
        .post(format!("{base_url}/api/v1/auth/register"))
        .json(&RegisterRequest {
            email: &email,
            password: PASSWORD,
            name: ACCOUNT_NAME,
        })
        .send()
        .await;
    if let Err(e) = registered {
        tracing::debug!("Registration did not complete: {e}");
    }

    let login = client
        .post(format!("{base_url}/api/v1/auth/login"))
        .json(&LoginRequest {
            email: &email,
            password: PASSWORD,
        })
        .send()
        .await?;
    let status = login.status().as_u16();
    let body = login.text().await?;
    if status != 200 {
        return Err(SetupError::Login { status, body });
    }
    let (token, user_id) = credentials_from(&body)?;

    let seed = seed_product(rng, &tag, &user_id);
    tracing::info!(stock = seed.stock, "Creating contested product...");
    let created = client
        .post(format!("{base_url}/api/v1/products/"))
        .bearer_auth(&token)
        .json(&seed)
        .send()
        .await?;
    let status = created.status().as_u16();
    let body = created.text().await?;
    if status != 201 {
        return Err(SetupError::ProductCreation { status, body });
    }
    let product_id = product_id_from(&body)?;

    Ok(RaceContext {
        base_url: base_url.to_string(),
        token,
        product_id,
    })
}

/// Globally unique identity tag: the timestamp in base36 plus a random
/// suffix, so re-runs against a shared backend never collide.
pub(crate) fn unique_tag(epoch_ms: u128, rng: &mut impl Rng) -> String {
    let mut tag = base36(epoch_ms);
    for _ in 0..6 {
        tag.push(BASE36[rng.gen_range(0..BASE36.len())] as char);
    }
    tag
}

fn base36(mut value: u128) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut out = String::new();
    while value > 0 {
        out.push(BASE36[(value % 36) as usize] as char);
        value /= 36;
    }
    out.chars().rev().collect()
}

/// Randomized product payload. Stock stays tiny on purpose; price and
/// discount are randomized only to exercise realistic payloads.
pub(crate) fn seed_product(rng: &mut impl Rng, tag: &str, created_by: &str) -> ProductSeed {
    ProductSeed {
        name: format!("Flash Product Race {tag}"),
        category: PRODUCT_CATEGORY,
        stock: rng.gen_range(1..=10),
        price: rng.gen_range(100_000..9_100_000),
        discount: rng.gen_range(90..100),
        created_by: created_by.to_string(),
    }
}

fn credentials_from(body: &str) -> Result<(String, String), SetupError> {
    let parsed: LoginResponse = serde_json::from_str(body).map_err(|_| SetupError::Credentials {
        body: body.to_string(),
    })?;
    match (parsed.access_token, parsed.user.and_then(|u| u.id)) {
        (Some(token), Some(id)) if !token.is_empty() && !id.is_empty() => Ok((token, id)),
        _ => Err(SetupError::Credentials {
            body: body.to_string(),
        }),
    }
}

fn product_id_from(body: &str) -> Result<String, SetupError> {
    let parsed: ProductResponse = serde_json::from_str(body).map_err(|_| SetupError::ProductId {
        body: body.to_string(),
    })?;
    match parsed.id {
        Some(id) if !id.is_empty() => Ok(id),
        _ => Err(SetupError::ProductId {
            body: body.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn unique_tag_is_deterministic_for_a_fixed_seed_and_time() {
        let mut a = ChaCha8Rng::seed_from_u64(42);
        let mut b = ChaCha8Rng::seed_from_u64(42);
        let first = unique_tag(1_700_000_000_000, &mut a);
        let second = unique_tag(1_700_000_000_000, &mut b);

        assert_eq!(first, second);
        assert!(first.starts_with(&base36(1_700_000_000_000)));
        // base36 timestamp + six-char suffix
        assert_eq!(first.len(), base36(1_700_000_000_000).len() + 6);
    }

    #[test]
    fn tags_differ_across_rng_states() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let first = unique_tag(1_700_000_000_000, &mut rng);
        let second = unique_tag(1_700_000_000_000, &mut rng);
        assert_ne!(first, second);
    }

    #[test]
    fn base36_round_digits() {
        assert_eq!(base36(0), "0");
        assert_eq!(base36(35), "z");
        assert_eq!(base36(36), "10");
    }

    #[test]
    fn seeded_products_stay_in_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        for _ in 0..500 {
            let seed = seed_product(&mut rng, "abc123", "user-1");
            assert!((1..=10).contains(&seed.stock));
            assert!((100_000..9_100_000).contains(&seed.price));
            assert!((90..100).contains(&seed.discount));
        }
    }

    #[test]
    fn credentials_require_both_token_and_user_id() {
        let ok = r#"{"access_token":"tok","user":{"id":"u-1","email":"a@b.c"}}"#;
        let (token, id) = credentials_from(ok).unwrap();
        assert_eq!(token, "tok");
        assert_eq!(id, "u-1");

        for bad in [
            r#"{"user":{"id":"u-1"}}"#,
            r#"{"access_token":"tok"}"#,
            r#"{"access_token":"","user":{"id":"u-1"}}"#,
            r#"{"access_token":"tok","user":{}}"#,
            "not json",
        ] {
            assert!(matches!(
                credentials_from(bad),
                Err(SetupError::Credentials { .. })
            ));
        }
    }

    #[test]
    fn product_id_must_be_present() {
        assert_eq!(product_id_from(r#"{"id":"p-7"}"#).unwrap(), "p-7");
        assert!(matches!(
            product_id_from(r#"{"name":"x"}"#),
            Err(SetupError::ProductId { .. })
        ));
        assert!(matches!(
            product_id_from(r#"{"id":""}"#),
            Err(SetupError::ProductId { .. })
        ));
    }

    mod against_a_stub_backend {
        use super::*;
        use std::net::SocketAddr;
        use std::sync::Arc;
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::{TcpListener, TcpStream};
        use tokio::sync::Mutex;

        type Router = Arc<dyn Fn(&str) -> (u16, String) + Send + Sync>;

        /// Minimal HTTP/1.1 stub: one canned response per connection, routed
        /// by request path, every request path recorded.
        async fn spawn_stub(router: Router) -> (SocketAddr, Arc<Mutex<Vec<String>>>) {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let seen = Arc::new(Mutex::new(Vec::new()));
            let seen_by_stub = seen.clone();

            tokio::spawn(async move {
                loop {
                    let Ok((mut socket, _)) = listener.accept().await else {
                        break;
                    };
                    let request = read_request(&mut socket).await;
                    let path = request
                        .split_whitespace()
                        .nth(1)
                        .unwrap_or_default()
                        .to_string();
                    seen_by_stub.lock().await.push(path.clone());

                    let (status, body) = router(&path);
                    let reason = match status {
                        200 => "OK",
                        201 => "Created",
                        202 => "Accepted",
                        400 => "Bad Request",
                        _ => "Internal Server Error",
                    };
                    let response = format!(
                        "HTTP/1.1 {status} {reason}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    socket.write_all(response.as_bytes()).await.unwrap();
                    socket.shutdown().await.ok();
                }
            });

            (addr, seen)
        }

        async fn read_request(socket: &mut TcpStream) -> String {
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                if let Some(end) = head_end(&buf) {
                    let head = String::from_utf8_lossy(&buf[..end]);
                    if buf.len() >= end + 4 + content_length(&head) {
                        break;
                    }
                }
            }
            String::from_utf8_lossy(&buf).into_owned()
        }

        fn head_end(buf: &[u8]) -> Option<usize> {
            buf.windows(4).position(|w| w == b"\r\n\r\n")
        }

        fn content_length(head: &str) -> usize {
            head.lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse().ok())?
                })
                .unwrap_or(0)
        }

        #[tokio::test]
        async fn happy_path_yields_a_race_context() {
            let (addr, seen) = spawn_stub(Arc::new(|path: &str| {
                if path.contains("/auth/register") {
                    (201, r#"{"id":"u-1"}"#.to_string())
                } else if path.contains("/auth/login") {
                    (200, r#"{"access_token":"tok","user":{"id":"u-1"}}"#.to_string())
                } else if path.contains("/products/") {
                    (201, r#"{"id":"p-1"}"#.to_string())
                } else {
                    (500, "{}".to_string())
                }
            }))
            .await;
            let base_url = format!("http://{addr}");

            let client = Client::new();
            let mut rng = ChaCha8Rng::seed_from_u64(1);
            let ctx = provision(&client, &base_url, &mut rng, 1_700_000_000_000)
                .await
                .unwrap();

            assert_eq!(ctx.base_url, base_url);
            assert_eq!(ctx.token, "tok");
            assert_eq!(ctx.product_id, "p-1");

            let paths = seen.lock().await.clone();
            assert!(paths.iter().any(|p| p.contains("/auth/register")));
            assert!(paths.iter().any(|p| p.contains("/auth/login")));
            assert!(paths.iter().any(|p| p.contains("/products/")));
        }

        #[tokio::test]
        async fn malformed_login_success_fails_fast() {
            // 200 without an access_token: a malformed success, not a go
            let (addr, seen) = spawn_stub(Arc::new(|path: &str| {
                if path.contains("/auth/login") {
                    (200, r#"{"user":{"id":"u-1"}}"#.to_string())
                } else {
                    (201, "{}".to_string())
                }
            }))
            .await;
            let base_url = format!("http://{addr}");

            let client = Client::new();
            let mut rng = ChaCha8Rng::seed_from_u64(2);
            let err = provision(&client, &base_url, &mut rng, 1_700_000_000_000)
                .await
                .unwrap_err();

            assert!(matches!(err, SetupError::Credentials { .. }));
            // Fail-fast means nothing downstream of login was ever attempted
            let paths = seen.lock().await.clone();
            assert!(!paths.iter().any(|p| p.contains("/products/")));
            assert!(!paths.iter().any(|p| p.contains("/checkouts/")));
        }

        #[tokio::test]
        async fn rejected_login_surfaces_status_and_body() {
            let (addr, _seen) = spawn_stub(Arc::new(|path: &str| {
                if path.contains("/auth/login") {
                    (401, r#"{"message":"Invalid email or password"}"#.to_string())
                } else {
                    (201, "{}".to_string())
                }
            }))
            .await;

            let client = Client::new();
            let mut rng = ChaCha8Rng::seed_from_u64(3);
            let err = provision(&client, &format!("http://{addr}"), &mut rng, 1_700_000_000_000)
                .await
                .unwrap_err();

            match err {
                SetupError::Login { status, body } => {
                    assert_eq!(status, 401);
                    assert!(body.contains("Invalid email or password"));
                }
                other => panic!("expected login error, got {other:?}"),
            }
        }
    }
}
