//! Every route shape pathwise supports, on one server.
//!
//! Run from the repository root with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:8000/
//!   curl http://localhost:8000/product/1/name/mangga
//!   curl http://localhost:8000/product/image/name/mangga.jpg
//!   curl http://localhost:8000/files/hello.txt
//!   curl http://localhost:8000/panic
//!   curl http://localhost:8000/post          # 405, POST only
//!   curl http://localhost:8000/nowhere       # custom 404

use pathwise::middleware::Trace;
use pathwise::{Request, Response, Router, Server, StatusCode};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let app = Router::new()
        .get("/", index)
        .get("/product/:id", product)
        .get("/product/:id/name/:name", product_name)
        .get("/product/image/*images", product_images)
        .get("/panic", explode)
        .post("/post", create_post)
        .serve_files("/files/*filepath", "demos/resources")
        .panic_handler(|fault| {
            Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .text(format!("Panic : {}", fault.message))
        })
        .not_found(not_found)
        .method_not_allowed(wrong_method)
        .wrap(Trace);

    if let Err(e) = Server::bind("localhost:8000").serve(app).await {
        eprintln!("server error: {e}");
        std::process::exit(1);
    }
}

async fn index(_req: Request) -> &'static str {
    "testing http router"
}

// GET /product/:id
async fn product(req: Request) -> String {
    format!("Id produknya adalah {}", req.param("id").unwrap_or("unknown"))
}

// GET /product/:id/name/:name
async fn product_name(req: Request) -> String {
    format!(
        "Produk dengan id : {} dan namanya : {}",
        req.param("id").unwrap_or_default(),
        req.param("name").unwrap_or_default(),
    )
}

// GET /product/image/*images → images includes the leading `/`
async fn product_images(req: Request) -> String {
    format!(
        "Produk memiliki gambar di direktori : {}",
        req.param("images").unwrap_or_default()
    )
}

async fn explode(_req: Request) -> Response {
    panic!("ada error")
}

async fn create_post(_req: Request) -> Response {
    Response::builder()
        .status(StatusCode::CREATED)
        .text("Berhasil memposting postingan")
}

async fn not_found(_req: Request) -> Response {
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .text("Halaman yang anda cari tidak ditemukan")
}

async fn wrong_method(_req: Request) -> Response {
    Response::builder()
        .status(StatusCode::METHOD_NOT_ALLOWED)
        .text("Method salah")
}
