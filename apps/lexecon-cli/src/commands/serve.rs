// serve.rs — Start the HTTP daemon.
//
// Same entry point as the lexecon-daemon binary, so `lexecon serve` works
// without knowing the second binary's name.

use std::path::Path;

use tracing_subscriber::EnvFilter;

pub fn execute(project_root: &Path) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("lexecon_daemon=info".parse()?)
                .add_directive("lexecon_ledger=info".parse()?)
                .add_directive("lexecon_policy=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(lexecon_daemon::serve(project_root))
}
