//! `cloelia`: command-line client for a Cloelia node.
//!
//! Network subcommands talk to a running node:
//!
//! - **`log-emotion`**: record an emotion for a user.
//! - **`analyze`**: run detection over a user's recent history.
//! - **`firewall-log`** / **`trigger-feed`**: print the node's logs.
//! - **`triggers`**: list a user's stored triggers, most recent first.
//! - **`reply`**: request a generated reply and optionally save its audio.
//!
//! `virtues` and `path` query the symbolic graph locally and need no node.
//!
//! The node address comes from `--url` or `CLOELIA_URL`.

use std::fs;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use cloelia::render::{render_firewall_entry, render_memory_entry, render_path};
use cloelia::{normalize_emotion, SymbolicGraph};
use cloelia_node_api::{
    AnalyzeRequest, AnalyzeResponse, ErrorResponse, FirewallLogResponse, GenerateRequest,
    GenerateResponse, LogEmotionRequest, MessageResponse, TriggerFeedResponse,
    TriggerListResponse,
};
use serde::{de::DeserializeOwned, Serialize};

/// cloelia: symbolic-emotion service CLI
#[derive(Parser)]
#[command(name = "cloelia", version, about, long_about = None)]
struct Cli {
    /// Base URL of the node.
    #[arg(
        long,
        global = true,
        env = "CLOELIA_URL",
        default_value = "http://127.0.0.1:8000"
    )]
    url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record one emotion for a user.
    LogEmotion {
        #[arg(short = 'u', long, value_name = "ID")]
        user_id: i64,

        #[arg(short = 'e', long, value_name = "LABEL")]
        emotion: String,

        /// Free-text context for the entry.
        #[arg(short = 'n', long = "note", value_name = "TEXT")]
        context_note: Option<String>,

        /// Reference to a micro-expression image.
        #[arg(long = "image", value_name = "REF")]
        microexpression_img: Option<String>,
    },

    /// Detect the dominant recent emotion for a user and record a trigger.
    Analyze {
        #[arg(short = 'u', long, value_name = "ID")]
        user_id: i64,

        /// The user's latest emotion. Validated but not recorded.
        #[arg(short = 'e', long, value_name = "LABEL")]
        emotion: String,
    },

    /// Print the firewall log, oldest first.
    FirewallLog {
        /// Print raw JSON instead of one line per entry.
        #[arg(long)]
        json: bool,
    },

    /// Print the symbolic trigger feed, oldest first.
    TriggerFeed {
        #[arg(long)]
        json: bool,
    },

    /// List a user's stored triggers, most recent first.
    Triggers {
        #[arg(short = 'u', long, value_name = "ID")]
        user_id: i64,

        /// At most this many (the node caps it at 100).
        #[arg(short = 'l', long, value_name = "N")]
        limit: Option<usize>,

        #[arg(long)]
        json: bool,
    },

    /// Ask the node for a reply to MESSAGE.
    ///
    /// Prints the reply text and the audio URL. With --save, the narration
    /// is downloaded to PATH.
    Reply {
        message: String,

        #[arg(long, value_name = "PATH")]
        save: Option<PathBuf>,
    },

    /// List the virtues linked to an emotion (offline).
    Virtues { emotion: String },

    /// Shortest path between two graph nodes (offline).
    Path { from: String, to: String },
}

fn main() {
    let cli = Cli::parse();
    let base = cli.url.trim_end_matches('/').to_string();
    let client = reqwest::blocking::Client::new();

    match cli.command {
        Command::LogEmotion {
            user_id,
            emotion,
            context_note,
            microexpression_img,
        } => {
            let resp: MessageResponse = post_json(
                &client,
                &endpoint(&base, "/log-emotion"),
                &LogEmotionRequest {
                    user_id,
                    emotion,
                    context_note,
                    microexpression_img,
                },
            );
            println!("{}", resp.message);
        }

        Command::Analyze { user_id, emotion } => {
            let resp: AnalyzeResponse = post_json(
                &client,
                &endpoint(&base, "/analyze-emotion"),
                &AnalyzeRequest { user_id, emotion },
            );
            match resp {
                AnalyzeResponse::Detected {
                    emotion_detected,
                    suggested_virtue,
                    action,
                    trigger_id,
                } => println!("#{trigger_id}  {emotion_detected} -> {suggested_virtue}  ({action})"),
                AnalyzeResponse::NoPattern { message } => println!("{message}"),
            }
        }

        Command::FirewallLog { json } => {
            let resp: FirewallLogResponse = get_json(&client, &endpoint(&base, "/firewall-log"));
            if json {
                print_pretty(&resp);
            } else if resp.log.is_empty() {
                println!("(empty)");
            } else {
                for entry in &resp.log {
                    println!("{}", render_firewall_entry(entry));
                }
            }
        }

        Command::TriggerFeed { json } => {
            let resp: TriggerFeedResponse = get_json(&client, &endpoint(&base, "/trigger-feed"));
            if json {
                print_pretty(&resp);
            } else if resp.log.is_empty() {
                println!("(empty)");
            } else {
                for entry in &resp.log {
                    println!("{}", render_memory_entry(entry));
                }
            }
        }

        Command::Triggers {
            user_id,
            limit,
            json,
        } => {
            let mut url = endpoint(&base, &format!("/users/{user_id}/triggers"));
            if let Some(limit) = limit {
                url.push_str(&format!("?limit={limit}"));
            }
            let resp: TriggerListResponse = get_json(&client, &url);
            if json {
                print_pretty(&resp);
            } else if resp.triggers.is_empty() {
                println!("(none)");
            } else {
                for t in &resp.triggers {
                    println!(
                        "#{}  {} -> {}  ({})  {}  {}",
                        t.trigger_id,
                        t.emotion_match,
                        t.symbol,
                        t.action_type,
                        t.narration_file,
                        t.created_at.to_rfc3339()
                    );
                }
            }
        }

        Command::Reply { message, save } => {
            let resp: GenerateResponse = post_json(
                &client,
                &endpoint(&base, "/gpt/generate-response"),
                &GenerateRequest { message },
            );
            let audio_url = endpoint(&base, &resp.response.audio_url);
            println!("{}", resp.response.text);
            println!("audio: {audio_url}");

            if let Some(path) = save {
                let bytes = get_bytes(&client, &audio_url);
                fs::write(&path, &bytes).unwrap_or_else(|e| {
                    fatal(&format!("failed to write {}: {}", path.display(), e))
                });
                println!("saved {} bytes to {}", bytes.len(), path.display());
            }
        }

        Command::Virtues { emotion } => {
            let emotion = normalize_emotion(&emotion).unwrap_or_else(|e| fatal(&e.to_string()));
            let graph = SymbolicGraph::new();
            let virtues = graph.virtues_for(&emotion);
            if virtues.is_empty() {
                println!("{emotion}: (none)");
            } else {
                println!("{emotion}: {}", virtues.join(", "));
            }
        }

        Command::Path { from, to } => {
            let graph = SymbolicGraph::new();
            let path = graph.path(&from.trim().to_lowercase(), &to.trim().to_lowercase());
            println!("{}", render_path(&path));
        }
    }
}

/// Join the node base URL and an absolute path.
fn endpoint(base: &str, path: &str) -> String {
    format!("{}/{}", base, path.trim_start_matches('/'))
}

fn post_json<B: Serialize, R: DeserializeOwned>(
    client: &reqwest::blocking::Client,
    url: &str,
    body: &B,
) -> R {
    let resp = client
        .post(url)
        .json(body)
        .send()
        .unwrap_or_else(|e| fatal(&format!("request to {url} failed: {e}")));
    decode(url, resp)
}

fn get_json<R: DeserializeOwned>(client: &reqwest::blocking::Client, url: &str) -> R {
    let resp = client
        .get(url)
        .send()
        .unwrap_or_else(|e| fatal(&format!("request to {url} failed: {e}")));
    decode(url, resp)
}

fn get_bytes(client: &reqwest::blocking::Client, url: &str) -> Vec<u8> {
    let resp = client
        .get(url)
        .send()
        .unwrap_or_else(|e| fatal(&format!("request to {url} failed: {e}")));
    let resp = check_status(url, resp);
    resp.bytes()
        .map(|b| b.to_vec())
        .unwrap_or_else(|e| fatal(&format!("failed to read {url}: {e}")))
}

fn decode<R: DeserializeOwned>(url: &str, resp: reqwest::blocking::Response) -> R {
    check_status(url, resp)
        .json()
        .unwrap_or_else(|e| fatal(&format!("unexpected response from {url}: {e}")))
}

/// Exit with the node's error message on any non-2xx status.
fn check_status(url: &str, resp: reqwest::blocking::Response) -> reqwest::blocking::Response {
    let status = resp.status();
    if status.is_success() {
        return resp;
    }
    let detail = resp
        .json::<ErrorResponse>()
        .map(|e| format!("{} ({})", e.error, e.code))
        .unwrap_or_else(|_| "no error body".to_string());
    fatal(&format!("{url} returned {status}: {detail}"))
}

fn print_pretty<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => fatal(&format!("failed to encode output: {e}")),
    }
}

/// Print an error message to stderr and exit with code 2.
fn fatal(msg: &str) -> ! {
    eprintln!("cloelia: {}", msg);
    process::exit(2);
}
