use std::sync::Arc;

use app::{AppBuilder, Application};
use clap::Parser;
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use navigation::{DeepLinkDispatcher, FileStore, KeyValueStore, PendingActionStore, RouterRegistry};
use shell::cli::{Cli, Cmd};
use shell::config::{data_dir_override, ShellConfig};
use shell::routes::DeepLink;
use shell::session::{Connectivity, Session};
use shell::errors::{self, CrashContext};
use shell::Runner;
use tokio::io::BufReader;
use tokio::task::LocalSet;
use tracing::info;

struct NavShell;

impl Application for NavShell {
    const APP_ID: &'static str = "navshell";
}

fn main() -> Result<()> {
    let args = Cli::parse();

    let mut builder = AppBuilder::<NavShell>::new(env!("CARGO_PKG_VERSION"));
    if let Some(base) = data_dir_override() {
        builder = builder.with_base_path(base);
    }
    let cfg = ShellConfig::load(builder.path_context()).wrap_err("failed to load configuration")?;
    let interactive = matches!(args.cmd, Cmd::Run { .. });
    let ctx = builder
        .with_console(cfg.log_to_console || !interactive)
        .build()
        .map_err(|err| eyre!(err))?;
    errors::init(&CrashContext::new(NavShell::APP_ID, ctx.version(), ctx.log_file()))?;
    info!(version = ctx.version(), app = ctx.app_id(), "starting");

    let store_file = ctx.path_context().store_file();
    let storage: Arc<dyn KeyValueStore> = Arc::new(
        FileStore::open(&store_file).wrap_err_with(|| format!("failed to open {}", store_file.display()))?,
    );
    let pending = PendingActionStore::new(storage, cfg.navigation.pending_key.clone());

    match args.cmd {
        Cmd::Run {
            signed_in,
            unknown_session,
        } => {
            let dispatcher =
                DeepLinkDispatcher::new(RouterRegistry::new(), pending, cfg.navigation.settle_delay());
            let session = Session::new();
            if !unknown_session {
                if signed_in || cfg.start_signed_in {
                    session.sign_in();
                } else {
                    session.sign_out();
                }
            }
            let runner = Runner::new(dispatcher, session, Connectivity::new());

            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            let local = LocalSet::new();
            local.block_on(&runtime, async move {
                let stdin = BufReader::new(tokio::io::stdin());
                runner.run(stdin, tokio::io::stdout()).await.map(|_| ())
            })?;
        }
        Cmd::Deliver { link } => {
            let link: DeepLink = link.parse()?;
            let action = match &link {
                DeepLink::Unauthorized(destination) => pending.set(destination),
                DeepLink::Authorized(destination) => pending.set(destination),
            };
            action?;
            println!("stored {link}");
        }
        Cmd::Pending => match pending.peek()? {
            Some(action) => println!("{}/{}", action.domain, action.route),
            None => println!("none"),
        },
        Cmd::Clear => {
            pending.clear()?;
            println!("cleared");
        }
    }
    Ok(())
}
