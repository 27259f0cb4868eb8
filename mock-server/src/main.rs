use tokio::net::TcpListener;

/// Serves the in-memory movie API for local demos of the `myflix` CLI.
#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());
    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    println!(
        "movie API listening on http://{addr} ({} sample movies)",
        mock_server::sample_movies().len()
    );
    mock_server::run(listener).await
}
