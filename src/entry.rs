use clap::Parser;
use clap::error::ErrorKind;
use tokio::io::BufReader;

use media_e2e::args::HarnessArgs;
use media_e2e::config::{Settings, load_config};
use media_e2e::error::AppResult;
use media_e2e::harness::{Runner, SuiteContext, SuiteRegistry};
use media_e2e::report::Reporter;

pub(crate) fn run() -> AppResult<()> {
    let args = match HarnessArgs::try_parse() {
        Ok(args) => args,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.print()?;
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    crate::logger::init_logging(args.verbose, args.no_color);

    let config = load_config(args.config.as_deref())?;
    let settings = Settings::from_sources(config, args.overrides()).inspect_err(|err| {
        tracing::error!("{}", err);
    })?;
    tracing::debug!(
        "Loaded settings for {} ({} client token(s))",
        settings.base(),
        settings.client_tokens().len()
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(run_async(settings, !args.no_color))
}

async fn run_async(settings: Settings, color: bool) -> AppResult<()> {
    let reporter = Reporter::console(color);
    let context = SuiteContext::new(settings, reporter)?;
    let registry = SuiteRegistry::with_builtins()?;
    let mut runner = Runner::new(registry, context);

    runner.run(BufReader::new(tokio::io::stdin())).await?;

    let tally = runner.tally();
    tracing::info!("Ran {} suite(s), {} with failures", tally.runs, tally.failed);
    Ok(())
}
