use anyhow::Result;
use clap::Parser;
use mrwc::cmd::reducer::Args;
use mrwc::reducer::Reducer;
use mrwc::telemetry::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let reducer = Reducer::bind(args.config()).await?;
    let path = reducer.run().await?;
    println!("{}", path.display());
    Ok(())
}
