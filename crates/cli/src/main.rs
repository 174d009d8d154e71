use clap::{Parser, Subcommand};
use std::sync::Arc;
use supportdesk::config;
use supportdesk::conversation::{ConversationStatus, Outcome, Rating};
use supportdesk::desk::{Desk, TurnOutcome};
use supportdesk::pipeline::Pipeline;
use supportdesk::response::HeuristicResponder;
use supportdesk::retrieval;

#[derive(Parser)]
#[command(name = "supportdesk")]
#[command(about = "Support desk CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and a default config.json.
    Init {
        /// Config file path (default: SUPPORTDESK_CONFIG_PATH or ~/.supportdesk/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Chat with the support assistant (interactive). Commands: /end [1-5], /new, /escalate, /stats, /quit.
    Chat {
        /// Config file path (default: SUPPORTDESK_CONFIG_PATH or ~/.supportdesk/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Classify a message and score its escalation risk (JSON output).
    Classify {
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// Message text.
        text: String,
    },

    /// Rank knowledge articles for a query.
    Retrieve {
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// Maximum number of titles (default from config or 3).
        #[arg(long, short)]
        limit: Option<usize>,

        query: String,
    },

    /// Browse the knowledge base.
    Kb {
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// Case-insensitive search over title, content and tags.
        #[arg(long, short, default_value = "")]
        search: String,

        /// Only articles in this category.
        #[arg(long)]
        category: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Version) => {
            println!("supportdesk {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Some(Commands::Init { config }) => run_init(config),
        Some(Commands::Chat { config }) => run_chat(config).await,
        Some(Commands::Classify { config, text }) => run_classify(config, &text),
        Some(Commands::Retrieve {
            config,
            limit,
            query,
        }) => run_retrieve(config, limit, &query),
        Some(Commands::Kb {
            config,
            search,
            category,
        }) => run_kb(config, &search, category.as_deref()),
        None => {
            println!("Run with --help for usage");
            Ok(())
        }
    };

    if let Err(e) = result {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}

fn load_pipeline(config_path: Option<std::path::PathBuf>) -> anyhow::Result<Pipeline> {
    let (config, path) = config::load_config(config_path)?;
    Pipeline::from_config(&config, &path)
}

fn run_init(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(config::default_config_path);
    let dir = config::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

fn run_classify(config_path: Option<std::path::PathBuf>, text: &str) -> anyhow::Result<()> {
    let pipeline = load_pipeline(config_path)?;
    let sentiment = pipeline.classify(text);
    let risk = pipeline.score(text, &sentiment);
    let out = serde_json::json!({
        "sentiment": sentiment,
        "escalationRisk": risk,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn run_retrieve(
    config_path: Option<std::path::PathBuf>,
    limit: Option<usize>,
    query: &str,
) -> anyhow::Result<()> {
    let pipeline = load_pipeline(config_path)?;
    let limit = limit.unwrap_or(pipeline.settings.retrieval_limit);
    let scored = retrieval::retrieve_scored(query, &pipeline.corpus);
    if scored.is_empty() {
        println!("no matching articles");
    }
    for (i, score) in scored.into_iter().take(limit) {
        println!("{:>5.1}  {}", score, pipeline.corpus.articles()[i].title);
    }
    Ok(())
}

fn run_kb(
    config_path: Option<std::path::PathBuf>,
    search: &str,
    category: Option<&str>,
) -> anyhow::Result<()> {
    let pipeline = load_pipeline(config_path)?;
    let articles = pipeline.corpus.browse(search, category);
    if articles.is_empty() {
        println!("no articles found; categories: {}", pipeline.corpus.categories().join(", "));
    }
    for a in articles {
        println!("[{}] {} ({})", a.category, a.title, a.tags.join(", "));
    }
    Ok(())
}

async fn run_chat(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    use std::io::{self, Write};

    let pipeline = Arc::new(load_pipeline(config_path)?);
    let desk = Desk::heuristic(pipeline);
    desk.start_conversation().await;

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;
        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("/exit") || input.eq_ignore_ascii_case("/quit") {
            break;
        }
        if let Some(rest) = input.strip_prefix('/') {
            run_chat_command(&desk, rest).await?;
            continue;
        }

        match desk.run_turn(input).await {
            TurnOutcome::Replied {
                user,
                reply,
                escalation_scheduled,
            } => {
                if let Some(s) = user.sentiment {
                    println!(
                        "  [{} {:.0}%, risk {:.0}%]",
                        s.emotion,
                        s.confidence * 100.0,
                        user.escalation_risk.unwrap_or(0.0) * 100.0
                    );
                }
                println!("< {}", reply.text.trim());
                if let Some(docs) = reply.retrieved_docs {
                    println!("  sources: {}", docs.join(", "));
                }
                if escalation_scheduled {
                    desk.settle().await;
                    let escalated = desk
                        .snapshot()
                        .await
                        .current()
                        .map(|c| c.status == ConversationStatus::Escalated)
                        .unwrap_or(false);
                    if escalated {
                        println!("! this conversation has been escalated to a human agent");
                    }
                }
            }
            TurnOutcome::Discarded { issued_for } => {
                eprintln!("reply for {} was discarded", issued_for);
            }
            TurnOutcome::NoConversation => {
                eprintln!("no active conversation; type /new to start one");
            }
            TurnOutcome::Ignored => {}
        }
    }

    Ok(())
}

async fn run_chat_command(desk: &Desk<HeuristicResponder>, command: &str) -> anyhow::Result<()> {
    let mut parts = command.split_whitespace();
    match parts.next().unwrap_or("") {
        "end" => {
            let rating = match parts.next() {
                Some(raw) => match raw.parse::<u8>().ok().and_then(Rating::new) {
                    Some(r) => Some(r),
                    None => {
                        eprintln!("rating must be a number from 1 to 5");
                        return Ok(());
                    }
                },
                None => None,
            };
            match desk.end_conversation(rating).await {
                Outcome::Rejected(reason) => eprintln!("cannot end conversation: {}", reason),
                _ => println!("conversation resolved, thank you"),
            }
            desk.start_conversation().await;
        }
        "new" => {
            if let Some(id) = desk.start_conversation().await {
                println!("started {}", id);
            }
        }
        "escalate" => match desk.escalate().await {
            Outcome::Rejected(reason) => eprintln!("cannot escalate: {}", reason),
            _ => println!("! this conversation has been escalated to a human agent"),
        },
        "stats" => {
            println!("{}", serde_json::to_string_pretty(&desk.analytics().await)?);
        }
        other => eprintln!("unknown command: /{}", other),
    }
    Ok(())
}
