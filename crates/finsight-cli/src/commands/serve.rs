//! Server command implementation

use anyhow::{Context, Result};
use finsight_core::PipelineConfig;
use finsight_server::ServerConfig;

pub async fn cmd_serve(config: &PipelineConfig, host: &str, port: u16) -> Result<()> {
    let server_config = ServerConfig::from_pipeline(config);

    println!("🚀 Starting Finsight API server...");
    println!("   Listening: http://{}:{}", host, port);
    println!("   Max body: {} bytes", server_config.max_body_bytes);
    if server_config.allowed_origins.is_empty() {
        println!("   CORS: same-origin only");
    } else {
        println!(
            "   CORS origins: {}",
            server_config.allowed_origins.join(", ")
        );
    }
    println!();
    println!("   Press Ctrl+C to stop");

    finsight_server::serve_with_config(host, port, server_config)
        .await
        .context("Server error")?;

    Ok(())
}
