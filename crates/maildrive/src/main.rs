mod args;
mod logging;

use clap::Parser;

use args::Args;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);

    let auth = args.auth_config();
    let settings = args.run_settings();

    let mut input = std::io::stdin().lock();
    let mut out = std::io::stdout();
    maildrive::run(&auth, args.subject.clone(), &settings, &mut input, &mut out).await?;
    Ok(())
}
