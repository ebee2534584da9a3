use crate::args::InstallArgs;
use crate::shared::cancel::CancelToken;
use crate::shared::chart::Chart;
use crate::shared::helm::HelmCli;
use crate::shared::interrupt::SignalInterruptSource;
use crate::shared::prompt::wait_for_input;
use crate::shared::runner::run_cancellable;
use anyhow::Result;

// Public install command entrypoint.
// Interactive flow: confirm, install with Ctrl-C wired to cancellation of the
// in-flight install, report any failure on stdout, confirm exit. Install
// failures never change the exit code.
pub fn run_install(args: InstallArgs) -> Result<()> {
    ensure_namespace(&args.namespace);

    wait_for_input("Press enter to start installation. Press ctrl+c to cancel installation once begun");

    let result = run_cancellable(
        |token| install_chart(token, &args),
        &CancelToken::new(),
        &SignalInterruptSource,
    );

    if let Err(err) = result {
        println!("error during installation: {err:#}");
    }

    wait_for_input("Press enter to exit");
    Ok(())
}

// Misconfiguration aborts immediately, before any prompt or cleanup.
fn ensure_namespace(namespace: &str) {
    if namespace.is_empty() {
        panic!("no namespace provided");
    }
}

// Load the bundle and hand it to the package manager with the fixed install
// policy: create the namespace if absent, wait for readiness, bounded timeout.
fn install_chart(token: &CancelToken, args: &InstallArgs) -> Result<()> {
    let chart = Chart::load(&args.chart_dir)?;

    let client = HelmCli {
        program: args.helm_path.clone(),
        namespace: args.namespace.clone(),
        release_name: args.release_name.clone(),
        create_namespace: true,
        wait_for_ready: true,
        timeout_mins: args.timeout_mins,
        storage_driver: args.storage_driver.clone(),
    };

    client.install(token, &chart)
}
