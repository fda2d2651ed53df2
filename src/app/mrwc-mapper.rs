use anyhow::Result;
use clap::Parser;
use mrwc::cmd::mapper::Args;
use mrwc::mapper::Mapper;
use mrwc::telemetry::init_tracing;
use mrwc::utils::expand_inputs;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let files = expand_inputs(&args.files)?;
    let mapper = Mapper::connect(&args.hosts(), args.config()).await?;
    tracing::info!("Partitioning over {:?}", mapper.endpoint_addrs());

    let summary = mapper.run(files).await?;
    if !summary.failed_files.is_empty() {
        tracing::warn!(
            "{} of {} files could not be mapped",
            summary.failed_files.len(),
            summary.files
        );
    }
    Ok(())
}
