//! hfp-phonebook - Phonebook Access demo driver
//!
//! Plays the Hands-Free side of a phonebook exchange against an in-memory
//! phone. Commands are taken from the command line (or a default script),
//! run through a session, and every response is printed the way it would
//! travel over RFCOMM.

use clap::{Parser, ValueEnum};
use hfp_phonebook::access::{
    AccessGate, AccessPermission, AccessReply, ConsentRequest, PeerAddress, PermissionTable,
};
use hfp_phonebook::commands::AtPhonebook;
use hfp_phonebook::config::{PhonebookConfig, DEFAULT_PAIRING_AUTHORITY, DEFAULT_UNKNOWN_NUMBER};
use hfp_phonebook::protocol::{AtCommand, AtCommandType};
use hfp_phonebook::session::{spawn_session, SessionHandle, SessionResponse, SessionStats};
use hfp_phonebook::storage::{CallType, MemoryStore, PhoneType, Presentation};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Stored phonebook permission of the demo device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Permission {
    Allowed,
    Rejected,
    Unknown,
}

impl From<Permission> for AccessPermission {
    fn from(p: Permission) -> Self {
        match p {
            Permission::Allowed => AccessPermission::Allowed,
            Permission::Rejected => AccessPermission::Rejected,
            Permission::Unknown => AccessPermission::Unknown,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "hfp-phonebook", version, about = "Hands-Free phonebook access demo")]
struct Args {
    /// Address of the simulated Hands-Free unit
    #[arg(long, default_value = "00:11:22:33:44:55")]
    peer: PeerAddress,

    /// Character set selected before reading
    #[arg(long, default_value = "UTF-8")]
    charset: String,

    /// Phonebook selected before reading (ME, SM, DC, RC, MC)
    #[arg(long, default_value = "ME")]
    phonebook: String,

    /// Index range passed to AT+CPBR
    #[arg(long, default_value = "1,10")]
    range: String,

    /// Stored permission of the peer
    #[arg(long, value_enum, default_value_t = Permission::Unknown)]
    permission: Permission,

    /// Reject the consent prompt instead of granting it
    #[arg(long)]
    deny: bool,

    /// Remember the consent answer
    #[arg(long)]
    remember: bool,

    /// Name shown for restricted or unknown numbers
    #[arg(long, default_value = DEFAULT_UNKNOWN_NUMBER)]
    placeholder: String,

    /// Component receiving consent requests
    #[arg(long, default_value = DEFAULT_PAIRING_AUTHORITY)]
    pairing_authority: String,

    /// Raw AT commands to run instead of the default script, e.g. "AT+CPBS?"
    commands: Vec<String>,
}

impl Args {
    fn script(&self) -> Vec<String> {
        if !self.commands.is_empty() {
            return self.commands.clone();
        }
        vec![
            "AT+CSCS=?".to_string(),
            format!("AT+CSCS=\"{}\"", self.charset),
            format!("AT+CPBS=\"{}\"", self.phonebook),
            "AT+CPBS?".to_string(),
            "AT+CPBR=?".to_string(),
            format!("AT+CPBR={}", self.range),
        ]
    }
}

/// Splits `AT+CMD...` into the command name and its subtype.
fn tokenize(line: &str) -> AtCommand {
    let body = line.trim();
    let body = body
        .strip_prefix("AT+")
        .or_else(|| body.strip_prefix("at+"))
        .unwrap_or(body);
    let name_end = body.find(['=', '?']).unwrap_or(body.len());
    let name = body[..name_end].to_ascii_uppercase();
    let rest = &body[name_end..];

    let at_type = if rest == "=?" {
        AtCommandType::Test
    } else if rest == "?" {
        AtCommandType::Read
    } else if rest.starts_with('=') {
        AtCommandType::Set
    } else {
        AtCommandType::Unknown
    };
    AtCommand::new(name, at_type, body)
}

/// Demo phone contents.
fn seed_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.add_contact("Alice Martin", "+1 650-555-0100", PhoneType::Mobile);
    store.add_contact("Bob Nguyen", "(650) 555-0101", PhoneType::Home);
    store.add_contact("Renée Dubois [work]", "+33 1 42 68 53 00", PhoneType::Work);
    store.add_contact("Dentist", "650.555.0199", PhoneType::Other);

    store.add_call("+16505550100", CallType::Outgoing, Presentation::Allowed, 1_700_000_300);
    store.add_call("6505550101", CallType::Incoming, Presentation::Allowed, 1_700_000_200);
    store.add_call("", CallType::Missed, Presentation::Restricted, 1_700_000_100);
    store.add_call("6505550142", CallType::Missed, Presentation::Allowed, 1_700_000_000);
    store
}

/// Answers consent requests the way the user would.
async fn consent_responder(
    mut requests: mpsc::UnboundedReceiver<ConsentRequest>,
    session: SessionHandle,
    reply: AccessReply,
) {
    while let Some(request) = requests.recv().await {
        info!(peer = %request.peer, authority = %request.authority, "Consent requested");
        if let Err(e) = session.access_reply(request.peer, reply).await {
            warn!(error = %e, "Could not deliver consent reply");
            return;
        }
    }
}

/// Prints responses until the final result code of one command.
async fn print_until_final(responses: &mut mpsc::Receiver<SessionResponse>) -> bool {
    while let Some(out) = responses.recv().await {
        println!("<- {:?}", String::from_utf8_lossy(&out.to_bytes()));
        if out.response.is_final() {
            return true;
        }
    }
    false
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Set up logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    info!("hfp-phonebook v{}", hfp_phonebook::VERSION);

    let store = seed_store();
    let permissions = PermissionTable::with(args.peer, args.permission.into());
    let (consent_tx, consent_rx) = mpsc::unbounded_channel::<ConsentRequest>();
    let gate = AccessGate::new(
        Arc::new(permissions),
        Arc::new(consent_tx),
        args.pairing_authority.clone(),
    );
    let config = PhonebookConfig {
        unknown_number: args.placeholder.clone(),
        ..PhonebookConfig::default()
    };
    let phonebook = AtPhonebook::new(store.clone(), gate, config);
    if let Some(number) = phonebook.last_dialled_number() {
        info!(number = %number, "Last dialled number");
    }

    let (responses_tx, mut responses) = mpsc::channel(64);
    let stats = Arc::new(SessionStats::new());
    let (session, task) = spawn_session(phonebook, responses_tx, Arc::clone(&stats));

    let reply = match (args.deny, args.remember) {
        (false, false) => AccessReply::allow(),
        (false, true) => AccessReply::allow().remembered(),
        (true, false) => AccessReply::reject(),
        (true, true) => AccessReply::reject().remembered(),
    };
    let responder = tokio::spawn(consent_responder(consent_rx, session.clone(), reply));

    for line in args.script() {
        println!("-> {}", line);
        session.command(args.peer, tokenize(&line)).await?;
        if !print_until_final(&mut responses).await {
            warn!("Session closed before the command completed");
            break;
        }
    }

    // the responder holds a handle; stop it so the session can end
    responder.abort();
    drop(session);
    task.await??;

    info!(
        commands = stats.commands_processed.load(Ordering::Relaxed),
        responses = stats.responses_sent.load(Ordering::Relaxed),
        bytes = stats.bytes_sent.load(Ordering::Relaxed),
        open_cursors = store.open_cursors(),
        "Session finished"
    );
    Ok(())
}
