use brainrot_db::cli::CliArgs;
use brainrot_db::core::stats;
use brainrot_db::core::{DatabaseBuilder, OutputTarget};
use brainrot_db::error::{AppError, AppResult};
use brainrot_db::logging::{log, setup_logging, LogLevel};
use brainrot_db::testing;
use clap::{CommandFactory, Parser};
use std::process::ExitCode;
use tokio::runtime::Builder;
use tokio_util::sync::CancellationToken;

async fn run(args: &CliArgs, cancel: CancellationToken) -> AppResult<i32> {
    let config = args.to_config()?;

    if let Some(page_path) = args.get_inspect_page() {
        let name = args.get_inspect_name()?;
        if !page_path.exists() {
            return Err(AppError::Argument(format!(
                "Inspection input not found: {}",
                page_path.display()
            )));
        }
        testing::inspect_page(
            &page_path,
            &name,
            &config.base_url,
            &config.scoring,
            args.get_inspect_output(),
        )
        .await?;
        return Ok(0);
    }

    let file_roster = args.load_roster().await?;
    let target = match args.get_append_target() {
        Some(path) => {
            if !path.is_file() {
                return Err(AppError::Argument(format!(
                    "Append target does not exist: {}",
                    path.display()
                )));
            }
            OutputTarget::Append(path)
        }
        None => OutputTarget::Fresh,
    };

    let builder = DatabaseBuilder::new(config, cancel)?;
    let roster = match file_roster {
        Some(roster) => roster,
        None => builder.discover_roster().await?,
    };

    let report = builder.build(&roster, target).await?;
    stats::print_summary(&report);
    Ok(stats::determine_exit_code(&report))
}

fn main() -> ExitCode {
    let cli_args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => {
            setup_logging(false);
            if !e.use_stderr() {
                let _ = e.print();
                return ExitCode::SUCCESS;
            }
            log(LogLevel::Error, &format!("CLI Argument Error: {}", e));
            let _ = CliArgs::command().print_help();
            return ExitCode::from(2);
        }
    };
    setup_logging(cli_args.is_verbose());

    let runtime = match Builder::new_multi_thread()
        .enable_all()
        .thread_name("brainrot-worker")
        .worker_threads(num_cpus::get())
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            log(
                LogLevel::Error,
                &format!("FATAL: Failed to build Tokio runtime: {}", e),
            );
            return ExitCode::FAILURE;
        }
    };

    let cancel = CancellationToken::new();
    let main_result: AppResult<i32> = runtime.block_on(async {
        let signal_cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log(
                    LogLevel::Warning,
                    "Interrupt received, finishing in-flight work and writing collected records...",
                );
                signal_cancel.cancel();
            }
        });
        run(&cli_args, cancel.clone()).await
    });

    match main_result {
        Ok(exit_code) => ExitCode::from(exit_code as u8),
        Err(AppError::Argument(msg)) => {
            log(LogLevel::Error, &msg);
            ExitCode::from(2)
        }
        Err(e) => {
            if cli_args.is_verbose() {
                log(LogLevel::Error, &format!("FATAL ERROR: {:?}", e));
            } else {
                log(LogLevel::Error, &format!("FATAL ERROR: {}", e));
            }
            ExitCode::FAILURE
        }
    }
}
