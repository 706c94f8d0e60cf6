//! Entry point: wire stdin/stdout into [`debapt_method_file::serve`].

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).with_writer(std::io::stderr).init();

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();
    debapt_method_file::serve(stdin, stdout).await
}
