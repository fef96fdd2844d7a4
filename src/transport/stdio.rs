use crate::services::RepoMapService;
use crate::tools::RepoMapTools;
use anyhow::Result;
use rmcp::transport::stdio;
use rmcp::ServiceExt;

pub async fn run_stdio_server(service: RepoMapService, credential: Option<String>) -> Result<()> {
    let tools = RepoMapTools::new(service, credential);

    let server = tools.serve(stdio()).await?;

    server.waiting().await?;
    Ok(())
}
