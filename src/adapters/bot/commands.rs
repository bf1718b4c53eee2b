//! Command parsing and reply text for the bot front-end. No I/O here.

use crate::domain::invite::{SUPPORTED_FORMATS, classify};
use crate::domain::{
    BroadcastReport, ChatRecord, FailReason, FormatError, JoinAttemptResult, JoinOutcome,
    LinkKind, RejectReason,
};

/// Telegram caps messages at 4096 chars; keep headroom.
pub const MAX_REPLY_CHARS: usize = 4000;

pub const LOCKED_TEXT: &str = "🔒 This bot is locked. Send the access code to unlock it.";
pub const UNLOCKED_TEXT: &str = "✅ Access granted. Send /help to see the commands.";

/// Broadcasts are sent by the bot, which is not a member of chats the user session joined.
pub const BOT_MEMBERSHIP_NOTE: &str =
    "ℹ️ Broadcasts are sent by the bot. Add it to chats joined from private links, or sends there will fail.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Join(String),
    Broadcast(String),
    List,
    Unknown(String),
}

/// Parse a `/command args` message. Returns `None` for plain text and for commands
/// addressed to another bot (`/cmd@otherbot`).
pub fn parse(text: &str, bot_username: Option<&str>) -> Option<Command> {
    let text = text.trim();
    let rest = text.strip_prefix('/')?;
    let (word, args) = match rest.split_once(char::is_whitespace) {
        Some((w, a)) => (w, a.trim()),
        None => (rest, ""),
    };
    let name = match word.split_once('@') {
        Some((name, target)) => {
            let ours = bot_username.is_some_and(|u| u.eq_ignore_ascii_case(target));
            if !ours {
                return None;
            }
            name
        }
        None => word,
    };

    Some(match name.to_ascii_lowercase().as_str() {
        "start" => Command::Start,
        "help" => Command::Help,
        "join" => Command::Join(args.to_string()),
        "bc" | "broadcast" => Command::Broadcast(args.to_string()),
        "list" => Command::List,
        other => Command::Unknown(other.to_string()),
    })
}

pub fn help_text() -> String {
    format!(
        "Commands:\n\
         /join <link> - join a group or channel\n\
         /bc <message> - send a message to every joined chat\n\
         /list - show joined chats\n\
         /help - this text\n\n\
         Supported link formats:\n{}\n\n\
         Public chats: the bot cannot add itself; add it manually, then /join to register.\n\
         Private invite links are joined through the user session.\n{}",
        SUPPORTED_FORMATS.replace(", ", "\n"),
        BOT_MEMBERSHIP_NOTE
    )
}

pub fn start_text() -> String {
    format!("👋 Auto-join bot ready.\n\n{}", help_text())
}

pub fn usage_join() -> &'static str {
    "Usage: /join <link>"
}

pub fn usage_broadcast() -> &'static str {
    "Usage: /bc <message>"
}

/// The reason already names the supported formats.
pub fn format_error_text(e: &FormatError) -> String {
    format!("❌ Invalid link: {}", e.reason)
}

/// Human-readable join result. `total` is the number of stored chats afterwards.
pub fn format_join(result: &JoinAttemptResult, total: usize) -> String {
    let details = |headline: &str| -> String {
        let Some(chat) = &result.chat else {
            return format!("{}\n{}", headline, result.reference.normalized);
        };
        let members = result
            .member_count
            .map(|n| n.to_string())
            .unwrap_or_else(|| "unknown".into());
        format!(
            "{}\nTitle: {}\nType: {}\nID: {}\nMembers: {}\nStored chats: {}",
            headline, chat.title, chat.chat_type, chat.id, members, total
        )
    };

    match &result.outcome {
        JoinOutcome::Joined => details("✅ Joined"),
        JoinOutcome::AlreadyMember => details("ℹ️ Already a member"),
        JoinOutcome::PartialSuccess { storage_error } => format!(
            "{}\n⚠️ Joined, but saving the chat failed: {}",
            details("✅ Joined"),
            storage_error
        ),
        JoinOutcome::Rejected(RejectReason::ManualAdditionRequired) => format!(
            "❌ The bot cannot join public chats by itself.\nAdd it to {} manually \
             (as admin for channels), then send /join again.",
            result.reference.normalized
        ),
        JoinOutcome::Rejected(reason) => format!(
            "❌ Join refused ({}): {}",
            reason, result.reference.normalized
        ),
        JoinOutcome::Failed(FailReason::SessionUnavailable) => {
            "❌ Private invite links need the user session, which is not configured or not logged in."
                .to_string()
        }
        JoinOutcome::Failed(FailReason::RateLimited { retry_after_secs }) => {
            format!("⏳ Rate limited. Try again in {}s.", retry_after_secs)
        }
        JoinOutcome::Failed(reason) => format!("❌ Join failed ({}).", reason),
    }
}

pub fn format_broadcast_start(targets: usize, preview: &str) -> String {
    format!("📣 Broadcasting to {} chats...\n{}", targets, preview)
}

pub fn format_report(report: &BroadcastReport) -> String {
    let mut out = format!(
        "📣 Broadcast done\nSuccess: {}\nFailed: {}\nTotal: {}\nMessage: {}",
        report.success,
        report.failed(),
        report.total,
        report.preview
    );
    for f in &report.failures {
        out.push_str(&format!("\n• {}: {}", f.chat_id, f.reason));
    }
    out
}

/// Registry listing, split so no chunk exceeds [`MAX_REPLY_CHARS`].
pub fn format_list(records: &[ChatRecord]) -> Vec<String> {
    if records.is_empty() {
        return vec!["No chats joined yet.".to_string()];
    }
    let mut lines = vec![format!("📋 Joined chats ({}):", records.len())];
    for (i, r) in records.iter().enumerate() {
        let last = r
            .last_broadcast_at
            .map(|t| t.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "never".into());
        lines.push(format!(
            "{}. {} [{}] {}\n   last broadcast: {}",
            i + 1,
            r.title,
            r.chat_type,
            r.id,
            last
        ));
    }
    if records.iter().any(joined_by_session) {
        lines.push(BOT_MEMBERSHIP_NOTE.to_string());
    }
    chunk_lines(&lines, MAX_REPLY_CHARS)
}

fn joined_by_session(record: &ChatRecord) -> bool {
    record
        .origin_reference
        .as_deref()
        .and_then(|origin| classify(origin).ok())
        .is_some_and(|r| r.kind == LinkKind::PrivateHash)
}

fn chunk_lines(lines: &[String], max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;
    for line in lines {
        let len = line.chars().count();
        if current_len > 0 && current_len + 1 + len > max_chars {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push('\n');
            current_len += 1;
        }
        current.push_str(line);
        current_len += len;
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
