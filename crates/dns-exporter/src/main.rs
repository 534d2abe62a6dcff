//! dns-exporter - Route 53 service-discovery exporter

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    dns_exporter::run().await
}
