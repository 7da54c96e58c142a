//! Terminal chat client.
//!
//! Connects to the server's SSE endpoint, decodes the wire events,
//! and renders them with a small pacing buffer so bursts of tokens
//! read as a steady stream. Memory moments and pattern insights are
//! styled distinctly. Ctrl-C aborts the in-flight request; the
//! server's drop guard persists the partial response.

use std::collections::VecDeque;
use std::io::Write as _;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use tokio::io::{AsyncBufReadExt, BufReader};
use uuid::Uuid;

use cairn_infra::config::{default_data_dir, load_global_config};
use cairn_infra::llm::pricing;
use cairn_infra::sqlite::{DatabasePool, SqliteConversationRepository, SqliteUserStore};
use cairn_types::chat::{Conversation, ConversationKind};
use cairn_types::config::GlobalConfig;
use cairn_types::event::ChatEvent;
use cairn_types::usage::RateLimitBody;

/// Interval between pacing-buffer drains.
const DRAIN_INTERVAL: Duration = Duration::from_millis(25);

/// Run the interactive chat loop.
pub async fn run(
    server: String,
    token: Option<String>,
    conversation: Option<Uuid>,
    domain: Option<String>,
    discovery: bool,
) -> anyhow::Result<()> {
    let token = token.context(
        "no API token; run `cairn serve` once to create one, then pass --token or set CAIRN_API_TOKEN",
    )?;

    let data_dir = PathBuf::from(default_data_dir());
    let config = load_global_config(&data_dir).await;
    let pool = DatabasePool::new(&format!("sqlite://{}/cairn.db", data_dir.display()))
        .await
        .context("opening database (has the server run at least once?)")?;

    let owner = SqliteUserStore::new(pool.clone())
        .resolve_token(&token)
        .await?
        .context("token not recognized")?;

    let conversation_id = match conversation {
        Some(id) => id,
        None => {
            let kind = if discovery {
                ConversationKind::Discovery
            } else {
                ConversationKind::Standard
            };
            let conv = Conversation {
                id: Uuid::now_v7(),
                user_id: owner.user_id,
                domain,
                kind,
                created_at: Utc::now(),
            };
            SqliteConversationRepository::new(pool.clone())
                .create(&conv)
                .await?;
            conv.id
        }
    };

    println!();
    println!(
        "  {} conversation {}",
        console::style("cairn").bold().cyan(),
        console::style(conversation_id).dim()
    );
    println!(
        "  {}",
        console::style("Type a message; /quit to exit, Ctrl-C to cancel a reply").dim()
    );
    println!();

    let client = reqwest::Client::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("{} ", console::style("you ▸").bold());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if message == "/quit" || message == "/exit" {
            break;
        }

        stream_reply(&client, &server, &token, conversation_id, message, &config).await?;
    }

    Ok(())
}

/// Send one message and render its streamed reply.
async fn stream_reply(
    client: &reqwest::Client,
    server: &str,
    token: &str,
    conversation_id: Uuid,
    message: &str,
    config: &GlobalConfig,
) -> anyhow::Result<()> {
    let response = client
        .post(format!("{server}/api/v1/chat/stream"))
        .bearer_auth(token)
        .json(&serde_json::json!({
            "conversationId": conversation_id,
            "message": message,
        }))
        .send()
        .await
        .context("request failed; is the server running?")?;

    let status = response.status();
    if status.as_u16() == 429 {
        if let Ok(body) = response.json::<RateLimitBody>().await {
            println!();
            println!("  {}", console::style(&body.message).yellow());
            println!(
                "  {}",
                console::style(format!("{}/{} messages used", body.current_count, body.limit))
                    .dim()
            );
            println!();
        }
        return Ok(());
    }
    if !status.is_success() {
        let detail = response.text().await.unwrap_or_default();
        println!(
            "  {} {status}: {detail}",
            console::style("request rejected").red()
        );
        return Ok(());
    }

    println!();
    let mut events = response.bytes_stream().eventsource();
    let mut pending: VecDeque<String> = VecDeque::new();
    let mut ticker = tokio::time::interval(DRAIN_INTERVAL);
    let mut upstream_open = true;
    let mut outcome: Option<ChatEvent> = None;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                // Dropping the event stream closes the connection; the
                // server persists the partial reply as interrupted.
                println!("\n  {}", console::style("[cancelled]").dim());
                return Ok(());
            }
            _ = ticker.tick() => {
                if let Some(chunk) = pending.pop_front() {
                    print!("{chunk}");
                    std::io::stdout().flush()?;
                }
            }
            next = events.next(), if upstream_open => {
                match next {
                    Some(Ok(event)) => {
                        match serde_json::from_str::<ChatEvent>(&event.data) {
                            Ok(ChatEvent::Token { content, memory_moment, pattern_insight }) => {
                                pending.push_back(styled_chunk(&content, memory_moment, pattern_insight));
                            }
                            Ok(terminal) => {
                                outcome = Some(terminal);
                                upstream_open = false;
                            }
                            Err(_) => {
                                // Keep-alive comments and the like.
                            }
                        }
                    }
                    Some(Err(e)) => {
                        println!("\n  {} {e}", console::style("connection lost:").red());
                        upstream_open = false;
                    }
                    None => upstream_open = false,
                }
            }
        }

        if !upstream_open && pending.is_empty() {
            break;
        }
    }

    match outcome {
        Some(ChatEvent::Done { usage, .. }) => {
            let cost = pricing::estimate_cost(
                usage.prompt_tokens,
                usage.completion_tokens,
                &config.provider.model,
                &config.pricing,
            );
            println!();
            println!(
                "  {} {} tokens {} {}",
                console::style("·").dim(),
                console::style(usage.total_tokens).dim(),
                console::style("·").dim(),
                console::style(pricing::format_cost(cost)).dim()
            );
            println!();
        }
        Some(ChatEvent::Error { message }) => {
            println!("\n  {}", console::style(message).red());
            println!();
        }
        _ => {
            println!("\n  {}", console::style("stream ended unexpectedly").red());
            println!();
        }
    }

    Ok(())
}

/// Style one token chunk for the terminal. Memory moments render
/// cyan italic, pattern insights yellow, plain prose untouched.
fn styled_chunk(content: &str, memory_moment: bool, pattern_insight: bool) -> String {
    if memory_moment {
        console::style(content).cyan().italic().to_string()
    } else if pattern_insight {
        console::style(content).yellow().to_string()
    } else {
        content.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_chunks_pass_through_unstyled() {
        assert_eq!(styled_chunk("hello", false, false), "hello");
    }

    #[test]
    fn wire_events_deserialize_from_sse_data() {
        let token: ChatEvent = serde_json::from_str(
            r#"{"type":"token","content":"hi","memory_moment":true,"pattern_insight":false}"#,
        )
        .unwrap();
        assert!(matches!(
            token,
            ChatEvent::Token { memory_moment: true, .. }
        ));

        let done: ChatEvent = serde_json::from_str(
            r#"{"type":"done","messageId":"m1","usage":{"prompt_tokens":10,"completion_tokens":5,"total_tokens":15}}"#,
        )
        .unwrap();
        match done {
            ChatEvent::Done { message_id, usage } => {
                assert_eq!(message_id, "m1");
                assert_eq!(usage.total_tokens, 15);
            }
            other => panic!("expected done, got {other:?}"),
        }
    }

    #[test]
    fn malformed_sse_data_is_skipped_not_fatal() {
        assert!(serde_json::from_str::<ChatEvent>(": keep-alive").is_err());
    }
}
