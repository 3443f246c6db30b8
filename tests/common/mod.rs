//! Local fixture site served by axum on an ephemeral port

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;

/// One canned response
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: StatusCode,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl Reply {
    pub fn html(body: impl Into<String>) -> Self {
        Self::bytes(body.into().into_bytes(), "text/html; charset=utf-8")
    }

    pub fn bytes(body: Vec<u8>, content_type: &str) -> Self {
        Self {
            status: StatusCode::OK,
            content_type: content_type.to_string(),
            body,
        }
    }

    pub fn status(code: u16) -> Self {
        Self {
            status: StatusCode::from_u16(code).unwrap(),
            content_type: "text/plain".to_string(),
            body: Vec::new(),
        }
    }
}

/// A request the site received
#[derive(Debug, Clone)]
pub struct Hit {
    pub target: String,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
}

#[derive(Clone, Default)]
struct Routes {
    replies: Arc<Mutex<HashMap<String, VecDeque<Reply>>>>,
    hits: Arc<Mutex<Vec<Hit>>>,
}

/// Serves queued replies per path and query. The last reply of a queue keeps being
/// served; unknown targets get a 404.
pub struct FixtureSite {
    routes: Routes,
    base_url: String,
}

impl FixtureSite {
    pub async fn start() -> Self {
        let routes = Routes::default();
        let app = Router::new().fallback(serve).with_state(routes.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            routes,
            base_url: format!("http://{addr}"),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, target: &str) -> String {
        format!("{}{}", self.base_url, target)
    }

    /// Queue replies for `target` (path plus query, e.g. `/search?term=evier&page=1`)
    pub fn route(&self, target: &str, replies: impl IntoIterator<Item = Reply>) {
        self.routes
            .replies
            .lock()
            .unwrap()
            .insert(target.to_string(), replies.into_iter().collect());
    }

    pub fn hits(&self) -> Vec<Hit> {
        self.routes.hits.lock().unwrap().clone()
    }

    pub fn hits_for(&self, target: &str) -> usize {
        self.hits().iter().filter(|hit| hit.target == target).count()
    }
}

async fn serve(State(routes): State<Routes>, uri: Uri, headers: HeaderMap) -> Response {
    let target = uri
        .path_and_query()
        .map_or_else(|| uri.path().to_string(), ToString::to_string);
    let header_value = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    };

    routes.hits.lock().unwrap().push(Hit {
        target: target.clone(),
        user_agent: header_value(header::USER_AGENT),
        referer: header_value(header::REFERER),
    });

    let reply = {
        let mut replies = routes.replies.lock().unwrap();
        replies.get_mut(&target).and_then(|queue| {
            if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            }
        })
    };

    match reply {
        Some(reply) => (
            reply.status,
            [(header::CONTENT_TYPE, reply.content_type)],
            reply.body,
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// A result page with `count` product cards numbered from `first_id`
pub fn results_page(first_id: usize, count: usize) -> String {
    let cards: String = (first_id..first_id + count)
        .map(|id| {
            format!(
                r#"<div data-testid="product">
                     <a data-testid="product-link" href="/p/{id}">
                       <img data-testid="product-image" src="/img/{id}.jpg">
                     </a>
                     <p data-testid="product-name">Carreau grès cérame n°{id}</p>
                     <p data-testid="seller-info">GoodHome</p>
                     <span data-testid="product-price">{id},90 €</span>
                     <span>Prix au m²</span>
                   </div>"#
            )
        })
        .collect();
    page("Carrelage | Castorama", &cards)
}

/// A full HTML page with enough visible text to pass the content checks
pub fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html><html lang=\"fr\"><head><meta charset=\"utf-8\"><title>{title}</title></head>\
         <body><header>Livraison gratuite en magasin, retrait en 2h et conseils de nos experts pour tous vos projets</header>\
         {body}<footer>Castorama France, bricolage, jardinage et aménagement de la maison</footer></body></html>"
    )
}
