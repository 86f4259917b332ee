//! Demo command - scripted loopback session between two in-process peers.
//!
//! Hosts and joins one session inside a single process using the in-memory
//! transport and two software signer devices, then walks the full protocol:
//! identification both ways, a short message exchange with typing signals,
//! and a clean shutdown. Every session event is printed as it happens.

use anyhow::{Context, Result};
use sigchat_core::account::Account;
use sigchat_core::channel::memory::MemoryHub;
use sigchat_core::signer::DeviceRegistry;
use sigchat_core::{
    identify_host, identify_joiner, Author, ChatSession, Command, Config, IdentityClaim, Network,
    SessionEvent, SessionId, SignerCapability, SoftSigner, VerificationStatus,
};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::info;

/// How long any single scripted step may take.
const STEP_TIMEOUT: Duration = Duration::from_secs(10);

/// One running side of the demo session.
struct DemoPeer {
    commands: mpsc::Sender<Command>,
    session: JoinHandle<()>,
    printer: JoinHandle<()>,
}

pub async fn execute(config: Config, network: Option<String>) -> Result<()> {
    let network = network
        .map(|tag| Network::from_tag(&tag))
        .unwrap_or(config.network);

    let hub = MemoryHub::new();

    // The host discovers its device the way a connector surfaces hardware:
    // through the attach event stream.
    let host_signer = SoftSigner::new("demo host key");
    let mut device_watch = host_signer.subscribe();
    host_signer.attach();

    let mut registry = DeviceRegistry::new();
    let attached = device_watch
        .recv()
        .await
        .context("no signing device appeared")?;
    registry.apply(&attached);
    let host_device = registry
        .default_device()
        .cloned()
        .context("no signing device available")?;
    println!("Using device {} ({})", host_device.label, host_device.id);

    let joiner_signer = SoftSigner::new("demo joiner key");
    joiner_signer.attach();

    let host_claim = identify_host(&host_signer, network, Some(host_device)).await?;
    let account_info = host_signer.account_info(network).await?;
    let account = Account::resolve(&account_info.path)?;
    println!(
        "Hosting a {} session as {} ({})",
        network, host_claim.address, account
    );
    println!(
        "Join link: {}",
        host_claim.session_id.join_url(&config.manifest.app_url)
    );

    let joiner_claim = identify_joiner(
        &joiner_signer,
        &host_claim.session_id,
        Some(joiner_signer.device()),
    )
    .await?;

    let (monitor_tx, mut monitor) = mpsc::channel(256);

    let host = launch(
        "host",
        &hub,
        &config,
        host_signer,
        host_claim.clone(),
        host_claim.session_id.clone(),
        monitor_tx.clone(),
    )?;
    let joiner = launch(
        "joiner",
        &hub,
        &config,
        joiner_signer,
        joiner_claim,
        host_claim.session_id.clone(),
        monitor_tx,
    )?;

    // Both sides must see a valid peer signature before chatting.
    let mut host_valid = false;
    let mut joiner_valid = false;
    wait_until(&mut monitor, |label, event| {
        if *event == SessionEvent::VerificationChanged(VerificationStatus::Valid) {
            match label {
                "host" => host_valid = true,
                _ => joiner_valid = true,
            }
        }
        host_valid && joiner_valid
    })
    .await?;

    host.commands
        .send(Command::SendText("hello from the host".to_string()))
        .await?;
    wait_until(&mut monitor, |label, event| {
        label == "joiner"
            && matches!(event, SessionEvent::MessageAppended(m) if m.author == Author::Remote)
    })
    .await?;

    joiner
        .commands
        .send(Command::InputChanged("h".to_string()))
        .await?;
    wait_until(&mut monitor, |label, event| {
        label == "host" && *event == SessionEvent::RemoteTypingChanged(true)
    })
    .await?;

    joiner
        .commands
        .send(Command::SendText("hey, loud and clear".to_string()))
        .await?;
    wait_until(&mut monitor, |label, event| {
        label == "host"
            && matches!(event, SessionEvent::MessageAppended(m) if m.author == Author::Remote)
    })
    .await?;

    for peer in [&host, &joiner] {
        peer.commands.send(Command::Close).await?;
    }
    for peer in [host, joiner] {
        peer.session.await?;
        peer.printer.await?;
    }

    println!("Demo complete.");
    Ok(())
}

/// Open a channel endpoint for one side and spawn its session and printer.
fn launch(
    label: &'static str,
    hub: &MemoryHub,
    config: &Config,
    signer: SoftSigner,
    claim: IdentityClaim,
    target: SessionId,
    monitor: mpsc::Sender<(&'static str, SessionEvent)>,
) -> Result<DemoPeer> {
    let mut channel = hub.open(&claim.session_id, &config.broker)?;
    let (events_tx, mut events_rx) = mpsc::channel(256);
    let (commands_tx, commands_rx) = mpsc::channel(16);
    let device_events = signer.subscribe();

    let session = tokio::spawn(async move {
        match ChatSession::start(claim, target, signer, &mut channel, events_tx).await {
            Ok((session, conn)) => session.run(conn, commands_rx, device_events).await,
            Err(err) => info!(%err, "session failed to start"),
        }
    });

    let printer = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            println!("[{label}] {}", describe(&event));
            let _ = monitor.send((label, event)).await;
        }
    });

    Ok(DemoPeer {
        commands: commands_tx,
        session,
        printer,
    })
}

async fn wait_until(
    monitor: &mut mpsc::Receiver<(&'static str, SessionEvent)>,
    mut done: impl FnMut(&str, &SessionEvent) -> bool,
) -> Result<()> {
    loop {
        let (label, event) = timeout(STEP_TIMEOUT, monitor.recv())
            .await
            .context("timed out waiting for session progress")?
            .context("all sessions ended")?;
        if done(label, &event) {
            return Ok(());
        }
    }
}

fn describe(event: &SessionEvent) -> String {
    match event {
        SessionEvent::ConnectionChanged(status) => format!("connection {status}"),
        SessionEvent::MessageAppended(message) => match message.author {
            Author::Local => format!("me: {}", message.text),
            Author::Remote => format!("peer: {}", message.text),
        },
        SessionEvent::RemoteTypingChanged(true) => "peer is typing".to_string(),
        SessionEvent::RemoteTypingChanged(false) => "peer stopped typing".to_string(),
        SessionEvent::VerificationChanged(status) => format!("peer signature {status}"),
        SessionEvent::Error { kind, message } => format!("error [{kind}]: {message}"),
        SessionEvent::BannerCleared => "error banner cleared".to_string(),
        SessionEvent::SignerBlocked(true) => "blocked: signing device absent".to_string(),
        SessionEvent::SignerBlocked(false) => "signing device restored".to_string(),
    }
}
