//! The UI loop: one task on a `LocalSet` that owns the shell and multiplexes
//! session changes, connectivity, deep links and typed commands.

use color_eyre::Result;
use navigation::{
    inbox, DeepLinkDispatcher, DeepLinkInbox, DeepLinkSender, NavigationError, ScheduledRoute,
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

use crate::command::{Command, HELP};
use crate::routes::{Authorized, DeepLink, Unauthorized};
use crate::session::{Connectivity, Session};
use crate::shell::AppShell;

/// `Send` handle for raising deep links from outside the UI loop.
#[derive(Debug, Clone)]
pub struct LinkSender {
    unauthorized: DeepLinkSender<Unauthorized>,
    authorized: DeepLinkSender<Authorized>,
}

impl LinkSender {
    pub fn send(&self, link: DeepLink) -> Result<(), NavigationError> {
        match link {
            DeepLink::Unauthorized(destination) => self.unauthorized.deliver(destination),
            DeepLink::Authorized(destination) => self.authorized.deliver(destination),
        }
    }
}

pub struct Runner {
    shell: AppShell,
    session: Session,
    connectivity: Connectivity,
    links: LinkSender,
    unauthorized: DeepLinkInbox<Unauthorized>,
    authorized: DeepLinkInbox<Authorized>,
}

enum Flow {
    Continue,
    Quit,
}

async fn note_replay<W: AsyncWrite + Unpin>(out: &mut W, replay: Option<ScheduledRoute>) -> Result<()> {
    if replay.is_some() {
        out.write_all(b"replaying pending deep link\n").await?;
    }
    Ok(())
}

impl Runner {
    pub fn new(dispatcher: DeepLinkDispatcher, session: Session, connectivity: Connectivity) -> Self {
        let (unauthorized_tx, unauthorized) = inbox::<Unauthorized>();
        let (authorized_tx, authorized) = inbox::<Authorized>();
        Self {
            shell: AppShell::new(dispatcher),
            session,
            connectivity,
            links: LinkSender {
                unauthorized: unauthorized_tx,
                authorized: authorized_tx,
            },
            unauthorized,
            authorized,
        }
    }

    pub fn links(&self) -> LinkSender {
        self.links.clone()
    }

    pub fn shell(&self) -> &AppShell {
        &self.shell
    }

    /// Drive the loop until `quit` or end of input. Must run inside a
    /// `LocalSet` because replays spawn local timers.
    pub async fn run<R, W>(mut self, input: R, mut out: W) -> Result<AppShell>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();
        let mut session_rx = self.session.subscribe();
        let mut online_rx = self.connectivity.subscribe();

        let replay = self.shell.apply_session(self.session.current());
        self.shell.set_online(self.connectivity.is_online());
        note_replay(&mut out, replay).await?;
        out.write_all(self.shell.to_string().as_bytes()).await?;
        out.flush().await?;

        loop {
            tokio::select! {
                biased;
                Ok(()) = session_rx.changed() => {
                    let signed_in = *session_rx.borrow_and_update();
                    let replay = self.shell.apply_session(signed_in);
                    note_replay(&mut out, replay).await?;
                }
                Ok(()) = online_rx.changed() => {
                    let online = *online_rx.borrow_and_update();
                    self.shell.set_online(online);
                }
                Some(event) = self.unauthorized.recv() => {
                    DeepLinkInbox::handle(self.shell.dispatcher(), event);
                }
                Some(event) = self.authorized.recv() => {
                    DeepLinkInbox::handle(self.shell.dispatcher(), event);
                }
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        debug!("input closed");
                        break;
                    };
                    if line.trim().is_empty() {
                        continue;
                    }
                    if let Flow::Quit = self.execute(&line, &mut out).await? {
                        break;
                    }
                }
            }
            out.flush().await?;
        }

        info!("interactive loop finished");
        Ok(self.shell)
    }

    async fn execute<W: AsyncWrite + Unpin>(&mut self, line: &str, out: &mut W) -> Result<Flow> {
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(err) => {
                out.write_all(format!("error: {err}\n").as_bytes()).await?;
                return Ok(Flow::Continue);
            }
        };
        debug!(?command, "command");

        let reply = match command {
            Command::Go(route) => self.shell.navigate(&route).map(|()| self.shell.to_string()),
            Command::Link(link) => {
                self.links.send(link.clone())?;
                Ok(format!("queued {link}\n"))
            }
            Command::Back => self.shell.back().map(|outcome| format!("{outcome}\n")),
            Command::Root => self.shell.pop_to_root().map(|()| self.shell.to_string()),
            Command::Foreground => {
                note_replay(out, self.shell.foreground()).await?;
                Ok(String::new())
            }
            Command::SignIn => {
                self.session.sign_in();
                Ok(String::new())
            }
            Command::SignOut => {
                self.session.sign_out();
                Ok(String::new())
            }
            Command::Online => {
                self.connectivity.set_online(true);
                Ok(String::new())
            }
            Command::Offline => {
                self.connectivity.set_online(false);
                Ok(String::new())
            }
            Command::Pending => Ok(match self.shell.dispatcher().pending().peek()? {
                Some(action) => format!("pending: {}/{}\n", action.domain, action.route),
                None => "pending: none\n".to_string(),
            }),
            Command::Show => Ok(self.shell.to_string()),
            Command::Wait(duration) => {
                tokio::time::sleep(duration).await;
                Ok(String::new())
            }
            Command::Help => Ok(format!("{HELP}\n")),
            Command::Quit => return Ok(Flow::Quit),
        };

        let text = reply.unwrap_or_else(|err| format!("error: {err}\n"));
        out.write_all(text.as_bytes()).await?;
        Ok(Flow::Continue)
    }
}
