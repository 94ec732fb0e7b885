//! The HTTP server.
//!
//! The server keeps a single layer attached to a [`ShapeRegistry`]. For each
//! tile requested, the layer is redrawn over the tile’s area and the
//! registered shapes are returned as JSON. Since all requests share the
//! layer, it lives behind a mutex. Redraws of different tiles at the same
//! zoom level profit from each other through the layer’s cache.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use hyper::{Body, Request, Response, StatusCode};
use hyper::service::{make_service_fn, service_fn};
use serde::Serialize;
use tracing::{debug, error, info};
use crate::geometry::Bounds;
use crate::layer::{GeoFeatureLayer, RedrawReport};
use crate::map::Viewport;
use crate::render::ShapeRegistry;
use crate::shape::Shape;
use crate::tile::TileId;

/// The layer type used by the server.
pub type TileLayer = GeoFeatureLayer<ShapeRegistry, Viewport>;


//------------ Server --------------------------------------------------------

#[derive(Clone)]
pub struct Server {
    layer: Arc<Mutex<TileLayer>>,
}

impl Server {
    /// Creates a new server for a layer.
    ///
    /// The layer is attached to a new shape registry.
    pub fn new(mut layer: TileLayer) -> Server {
        let world = Viewport::new(Bounds::new(-180., -85., 180., 85.), 0.);
        layer.attach(ShapeRegistry::new(), world);
        Server { layer: Arc::new(Mutex::new(layer)) }
    }

    pub async fn run(&self, addr: SocketAddr) {
        let make_svc = make_service_fn(move |_conn| {
            let this = self.clone();
            async move {
                Ok::<_, Infallible>(service_fn(move |r| {
                    let this = this.clone();
                    async move { this.process(r).await }
                }))
            }
        });

        let server = hyper::Server::bind(&addr).serve(make_svc);
        info!(%addr, "server listening");

        // Run this server for... forever!
        if let Err(err) = server.await {
            error!("server error: {}", err);
        }
    }

    /// Redraws the layer for a tile and returns the shapes as JSON.
    pub fn render_tile(&self, tile: TileId) -> Result<Vec<u8>, serde_json::Error> {
        let mut layer = self.lock();
        if let Some(map) = layer.map_mut() {
            *map = tile.viewport();
        }
        let report = layer.redraw_thematic_features(None);
        let shapes: Vec<&Shape> = layer.renderer().map(|renderer| {
            renderer.shapes().iter().map(|shape| shape.as_ref()).collect()
        }).unwrap_or_default();
        serde_json::to_vec(&TileResponse {
            tile: tile.to_string(),
            origin: [tile.origin().x, tile.origin().y],
            report,
            shapes,
        })
    }

    /// Returns the layer’s statistics as JSON.
    pub fn stats(&self) -> Result<Vec<u8>, serde_json::Error> {
        let layer = self.lock();
        serde_json::to_vec(&Stats {
            features: layer.features().len(),
            cache_count: layer.cache_count(),
            max_cache_count: layer.max_cache_count().get(),
        })
    }

    fn lock(&self) -> MutexGuard<TileLayer> {
        self.layer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Server {
    async fn process(
        &self, request: Request<Body>
    ) -> Result<Response<Body>, Infallible> {
        let path = request.uri().path().to_string();
        if path == "/stats" {
            let this = self.clone();
            let res = tokio::task::spawn_blocking(move || this.stats()).await;
            return Ok(Self::json_response(res.ok().and_then(Result::ok)))
        }

        let tile = match TileId::from_path(&path) {
            Ok(tile) => tile,
            Err(_) => {
                debug!(%path, "not found");
                return Ok(Self::status_response(StatusCode::NOT_FOUND))
            }
        };
        let this = self.clone();
        let res = tokio::task::spawn_blocking(move || {
            this.render_tile(tile)
        }).await;
        Ok(Self::json_response(res.ok().and_then(Result::ok)))
    }

    fn json_response(body: Option<Vec<u8>>) -> Response<Body> {
        match body {
            Some(body) => {
                Response::builder()
                    .header("Content-Type", "application/json")
                    .body(Body::from(body))
                    .unwrap_or_else(|_| {
                        Self::status_response(StatusCode::INTERNAL_SERVER_ERROR)
                    })
            }
            None => {
                error!("failed to produce response");
                Self::status_response(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    fn status_response(status: StatusCode) -> Response<Body> {
        let mut res = Response::new(Body::from(
            status.canonical_reason().unwrap_or("error")
        ));
        *res.status_mut() = status;
        res
    }
}


//------------ TileResponse and Stats ----------------------------------------

#[derive(Serialize)]
struct TileResponse<'a> {
    tile: String,

    /// The world pixel coordinates of the tile’s north-west corner.
    origin: [f64; 2],

    report: RedrawReport,
    shapes: Vec<&'a Shape>,
}

#[derive(Serialize)]
struct Stats {
    features: usize,
    cache_count: usize,
    max_cache_count: usize,
}


//============ Tests =========================================================
