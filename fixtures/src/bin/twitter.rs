use clap::Parser;
use fixtures::{run_server, twitter::twitter_router, FixtureArgs};

/// Fake Twitter API fixture server
#[derive(Parser, Debug)]
#[clap(name = "twitter-fixture")]
struct Cli {
    #[clap(flatten)]
    common: FixtureArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    run_server(args.common, twitter_router()).await
}
