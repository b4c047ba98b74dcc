use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = cdr_api::Args::parse();

	cdr_api::run(args).await
}
