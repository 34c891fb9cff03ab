use anyhow::Result;
use std::path::PathBuf;
use tokio::io::BufReader;

use crate::engine::GitEngine;
use crate::observability::executor_metrics;
use crate::protocol::ProtocolServer;

pub struct ServeCommand {
    engine: GitEngine,
    directory: PathBuf,
}

impl ServeCommand {
    pub fn new(engine: GitEngine, directory: PathBuf) -> Self {
        Self { engine, directory }
    }

    pub async fn execute(self) -> Result<()> {
        let server = ProtocolServer::new(self.engine, self.directory);
        server
            .serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await?;
        executor_metrics().log_stats();
        Ok(())
    }
}
