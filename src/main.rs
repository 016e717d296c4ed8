use anyhow::{bail, Context, Result};
use bookswap::auth::{assign_avatar, email_hash, AccountService, AuthError, IdentityToolkitClient};
use bookswap::config::{
    default_config_path, find_config_file, get_config, load_config, Config, LogFormat,
    CONFIG_FILE_NAME,
};
use bookswap::models::{BookCondition, FilterSet, RecordKind, ResultPage, SignupDetails, SortKey};
use bookswap::search::SearchPipeline;
use bookswap::store::{FirestoreStore, InMemoryStore, ProfileStore, RecordStore};
use bookswap::ui::{self, Spinner, Status};
use bookswap::utils::{format_price, format_relative_time, is_terminal, HttpClient};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// bookswap - search listings and manage accounts on the student book marketplace
#[derive(Parser, Debug)]
#[command(name = "bookswap")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Search books for sale, exchange offers and study material", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v for debug, -vv for trace)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, short, value_enum, global = true, default_value_t = OutputFormat::Auto)]
    output: OutputFormat,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Read listings from a JSON fixture file instead of Firestore (search and recent only)
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Output format for results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Cards on a terminal, JSON otherwise
    Auto,
    /// Coloured listing cards
    Cards,
    /// Table format (human-readable)
    Table,
    /// JSON format (machine-readable)
    Json,
    /// Plain text cards without colours
    Plain,
}

impl OutputFormat {
    fn resolve(self) -> Self {
        match self {
            OutputFormat::Auto if is_terminal() => OutputFormat::Cards,
            OutputFormat::Auto => OutputFormat::Json,
            other => other,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search listings by text and filters
    #[command(alias = "s")]
    Search {
        /// Search text; leave empty to browse available books
        query: Option<String>,

        /// Only this kind of listing (book, exchange, material)
        #[arg(long, short)]
        category: Option<RecordKind>,

        /// Class label contains this text (case-insensitive)
        #[arg(long = "class")]
        class_label: Option<String>,

        /// Exact examination board (e.g. CBSE)
        #[arg(long, short)]
        board: Option<String>,

        /// Exact book condition (e.g. "Like New")
        #[arg(long)]
        condition: Option<String>,

        /// Sort order: recent, price_low, price_high, popular
        #[arg(long, short, default_value = "recent")]
        sort: String,

        /// Lowest book price
        #[arg(long)]
        min_price: Option<f64>,

        /// Highest book price
        #[arg(long)]
        max_price: Option<f64>,

        /// Page number, starting at 1
        #[arg(long, short, default_value_t = 1, allow_negative_numbers = true)]
        page: i64,
    },

    /// Show the newest available books
    #[command(alias = "r")]
    Recent {
        /// Number of listings (default from config)
        #[arg(long, short)]
        limit: Option<usize>,
    },

    /// Create an account
    Signup {
        /// Email address
        email: String,

        /// Password (read from stdin when omitted)
        #[arg(long)]
        password: Option<String>,

        #[arg(long)]
        first_name: Option<String>,

        #[arg(long)]
        last_name: Option<String>,

        #[arg(long)]
        student_id: Option<String>,
    },

    /// Sign in to an account
    Login {
        /// Email address
        email: String,

        /// Password (read from stdin when omitted)
        #[arg(long)]
        password: Option<String>,
    },

    /// Show the avatar an email address is assigned
    Avatar {
        /// Email address
        email: String,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Write a configuration file with default settings
    Init {
        /// Where to write (default: user config directory)
        #[arg(long)]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().or_else(find_config_file);
    let config = match &config_path {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => get_config()?,
    };

    init_logging(&cli, &config);
    if let Some(path) = &config_path {
        tracing::debug!("Using config file: {}", path.display());
    }

    let format = cli.output.resolve();

    match cli.command {
        Some(Commands::Search {
            query,
            category,
            class_label,
            board,
            condition,
            sort,
            min_price,
            max_price,
            page,
        }) => {
            let mut filters = FilterSet::new().sort_by(sort.parse::<SortKey>().unwrap_or_default());
            filters.category = category;
            if let Some(class_label) = class_label {
                filters = filters.class_label(class_label);
            }
            if let Some(board) = board {
                filters = filters.board(board);
            }
            filters.condition = condition
                .filter(|c| !c.trim().is_empty())
                .map(|c| c.parse::<BookCondition>().unwrap_or_else(|never| match never {}));
            filters.min_price = min_price;
            filters.max_price = max_price;

            let pipeline = SearchPipeline::new(record_store(&cli.data, &config)?)
                .with_page_size(config.search.page_size);
            let query = query.unwrap_or_default();

            let spinner = spinner_for(format, cli.quiet, "Searching listings...");
            let started = Instant::now();
            let page = match pipeline.search(&query, &filters, page).await {
                Ok(page) => {
                    spinner.finish();
                    page
                }
                Err(e) => {
                    spinner.finish_with_error("Search failed");
                    return Err(anyhow::Error::new(e).context("Search failed"));
                }
            };
            tracing::info!(total = page.total, page = page.page, "Search complete");
            output_page(&query, &page, format, started)?;
        }

        Some(Commands::Recent { limit }) => {
            let pipeline = SearchPipeline::new(record_store(&cli.data, &config)?);
            let limit = limit.unwrap_or(config.search.recent_limit);

            let spinner = spinner_for(format, cli.quiet, "Loading recent listings...");
            let started = Instant::now();
            let page = match pipeline.recent_listings(limit).await {
                Ok(page) => {
                    spinner.finish();
                    page
                }
                Err(e) => {
                    spinner.finish_with_error("Could not load recent listings");
                    return Err(anyhow::Error::new(e).context("Failed to load recent listings"));
                }
            };
            output_page("", &page, format, started)?;
        }

        Some(Commands::Signup {
            email,
            password,
            first_name,
            last_name,
            student_id,
        }) => {
            let password = password_or_prompt(password)?;
            let details = SignupDetails {
                first_name: first_name.unwrap_or_default(),
                last_name: last_name.unwrap_or_default(),
                student_id: student_id.unwrap_or_default(),
            };

            ensure_hosted_accounts(&cli.data)?;
            let service = account_service(&config)?;
            let outcome = service
                .signup(&email, &password, &details)
                .await
                .map_err(auth_failure)?;

            if format == OutputFormat::Json {
                let json = serde_json::json!({
                    "uid": outcome.session.uid,
                    "email": outcome.session.email,
                    "emojiNumber": outcome.avatar.number(),
                    "emoji": outcome.avatar.emoji(),
                    "gender": outcome.avatar.gender(),
                    "message": outcome.message,
                });
                println!("{}", serde_json::to_string_pretty(&json)?);
            } else if !cli.quiet {
                ui::print_status(Status::Success, &outcome.message);
                ui::print_status(
                    Status::Info,
                    &format!("Verification email sent to {}", outcome.session.email),
                );
            }
        }

        Some(Commands::Login { email, password }) => {
            let password = password_or_prompt(password)?;
            ensure_hosted_accounts(&cli.data)?;
            let service = account_service(&config)?;
            let outcome = service
                .login(&email, &password)
                .await
                .map_err(auth_failure)?;

            if format == OutputFormat::Json {
                let json = serde_json::json!({
                    "uid": outcome.session.uid,
                    "email": outcome.session.email,
                    "message": outcome.message,
                });
                println!("{}", serde_json::to_string_pretty(&json)?);
            } else if !cli.quiet {
                ui::print_status(Status::Success, &outcome.message);
            }
        }

        Some(Commands::Avatar { email }) => {
            let avatar = assign_avatar(&email);
            if format == OutputFormat::Json {
                let json = serde_json::json!({
                    "email": email,
                    "hash": email_hash(&email),
                    "emojiNumber": avatar.number(),
                    "emoji": avatar.emoji(),
                    "gender": avatar.gender(),
                });
                println!("{}", serde_json::to_string_pretty(&json)?);
            } else {
                println!("{} {} ({})", avatar.emoji(), email, avatar.gender());
            }
        }

        Some(Commands::Config { action }) => match action {
            ConfigAction::Init { path, force } => {
                let path = path
                    .or_else(default_config_path)
                    .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
                if path.exists() && !force {
                    bail!(
                        "{} already exists (use --force to overwrite)",
                        path.display()
                    );
                }
                Config::default().save(&path)?;
                if !cli.quiet {
                    ui::print_status(
                        Status::Success,
                        &format!("Wrote configuration to {}", path.display()),
                    );
                }
            }
            ConfigAction::Show => {
                if config.firebase.project_id.is_none() && format != OutputFormat::Json {
                    ui::print_status(
                        Status::Warning,
                        "firebase.project_id is not set; only --data searches will work",
                    );
                }
                let mut shown = config.clone();
                if shown.firebase.api_key.is_some() {
                    shown.firebase.api_key = Some("********".to_string());
                }
                if format == OutputFormat::Json {
                    println!("{}", serde_json::to_string_pretty(&shown)?);
                } else {
                    print!("{}", toml::to_string_pretty(&shown)?);
                }
            }
        },

        None => {
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}

/// Install the tracing subscriber.
///
/// `RUST_LOG` wins; otherwise `-v`/`-q` override the configured level.
fn init_logging(cli: &Cli, config: &Config) {
    let level = if cli.quiet {
        "error".to_string()
    } else {
        match cli.verbose {
            0 => config.logging.level.clone(),
            1 => "debug".to_string(),
            _ => "trace".to_string(),
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("bookswap={}", level)));
    let registry = tracing_subscriber::registry().with(filter);

    match config.logging.format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

/// Fixture-backed store when `--data` is given, Firestore otherwise
fn record_store(data: &Option<PathBuf>, config: &Config) -> Result<Arc<dyn RecordStore>> {
    match data {
        Some(path) => {
            let store = InMemoryStore::from_fixture_file(path)
                .with_context(|| format!("Failed to load fixture {}", path.display()))?;
            Ok(Arc::new(store))
        }
        None => Ok(Arc::new(firestore(config)?)),
    }
}

fn firestore(config: &Config) -> Result<FirestoreStore> {
    let http = HttpClient::new(&config.http)?;
    Ok(FirestoreStore::from_config(&config.firebase, http)?)
}

/// Accounts live in the hosted backend; a fixture file cannot keep them
fn ensure_hosted_accounts(data: &Option<PathBuf>) -> Result<()> {
    if data.is_some() {
        bail!("--data only applies to search and recent; signup and login need the hosted backend");
    }
    Ok(())
}

fn account_service(config: &Config) -> Result<AccountService> {
    let http = HttpClient::new(&config.http)?;
    let auth = IdentityToolkitClient::from_config(&config.firebase, http).map_err(auth_failure)?;
    let profiles: Arc<dyn ProfileStore> = Arc::new(firestore(config)?);
    Ok(AccountService::new(Arc::new(auth), profiles))
}

fn auth_failure(err: AuthError) -> anyhow::Error {
    ui::print_status(Status::Error, &err.friendly_message());
    anyhow::anyhow!("authentication failed ({})", err.code())
}

fn password_or_prompt(password: Option<String>) -> Result<String> {
    if let Some(password) = password {
        return Ok(password);
    }
    eprint!("Password: ");
    std::io::stderr().flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        bail!("A password is required");
    }
    Ok(password)
}

fn spinner_for(format: OutputFormat, quiet: bool, msg: &str) -> Spinner {
    if quiet || format == OutputFormat::Json || !is_terminal() {
        Spinner::hidden()
    } else {
        Spinner::new(msg)
    }
}

fn output_page(query: &str, page: &ResultPage, format: OutputFormat, started: Instant) -> Result<()> {
    let now = chrono::Utc::now();

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(page)?);
        }
        OutputFormat::Plain => {
            for record in &page.items {
                for line in ui::record_card(record, now) {
                    if !line.is_empty() {
                        println!("{}", line);
                    }
                }
                println!();
            }
            if let Some(line) = ui::pagination_line(page) {
                println!("{}", line);
            }
        }
        OutputFormat::Cards | OutputFormat::Auto => {
            ui::print_results_header(query, page, started.elapsed());
            if page.is_empty() {
                ui::print_status(Status::Info, &ui::no_results_message(query));
            }
            for record in &page.items {
                ui::print_record_card(record, now);
            }
            if let Some(line) = ui::pagination_line(page) {
                println!();
                ui::print_divider();
                println!("{}", line);
            }
        }
        OutputFormat::Table => {
            use comfy_table::{Attribute, Cell, Table};

            if page.is_empty() {
                println!("{}", ui::no_results_message(query));
                return Ok(());
            }

            let width = bookswap::utils::terminal_width();
            let title_width = width.saturating_sub(70).max(20);

            let mut table = Table::new();
            table.load_preset(comfy_table::presets::UTF8_FULL);
            table.set_header(vec!["Type", "Title", "Class", "Board", "Price", "Posted"]);

            for record in &page.items {
                table.add_row(vec![
                    Cell::new(record.kind().name()),
                    Cell::new(bookswap::utils::truncate_with_ellipsis(
                        record.title().unwrap_or("Untitled"),
                        title_width,
                    ))
                    .add_attribute(Attribute::Bold),
                    Cell::new(record.class_label().unwrap_or("-")),
                    Cell::new(record.board().unwrap_or("-")),
                    Cell::new(match record.kind() {
                        RecordKind::Book => format_price(record.price()),
                        _ => "-".to_string(),
                    }),
                    Cell::new(format_relative_time(record.created_at(), now)),
                ]);
            }
            println!("{table}");
            if let Some(line) = ui::pagination_line(page) {
                println!("{}", line);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["bookswap"]);
        assert_eq!(cli.verbose, 0);
        assert!(!cli.quiet);
        assert_eq!(cli.output, OutputFormat::Auto);
        assert!(cli.data.is_none());
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_verbose_and_quiet() {
        let cli = Cli::parse_from(["bookswap", "-vv"]);
        assert_eq!(cli.verbose, 2);

        let cli = Cli::parse_from(["bookswap", "--quiet"]);
        assert!(cli.quiet);
    }

    #[test]
    fn test_cli_output_format() {
        let cli = Cli::parse_from(["bookswap", "-o", "json"]);
        assert_eq!(cli.output, OutputFormat::Json);
        assert_eq!(OutputFormat::Table.resolve(), OutputFormat::Table);
    }

    #[test]
    fn test_cli_search_defaults() {
        let cli = Cli::parse_from(["bookswap", "search"]);
        match cli.command {
            Some(Commands::Search {
                query, sort, page, ..
            }) => {
                assert!(query.is_none());
                assert_eq!(sort, "recent");
                assert_eq!(page, 1);
            }
            _ => panic!("Expected Search command"),
        }
    }

    #[test]
    fn test_cli_search_with_filters() {
        let cli = Cli::parse_from([
            "bookswap",
            "--data",
            "listings.json",
            "search",
            "algebra",
            "--category",
            "books",
            "--class",
            "10",
            "--board",
            "CBSE",
            "--condition",
            "Like New",
            "--sort",
            "price_low",
            "--min-price",
            "100",
            "--max-price",
            "500",
            "--page",
            "-2",
        ]);
        assert_eq!(cli.data, Some(PathBuf::from("listings.json")));
        match cli.command {
            Some(Commands::Search {
                query,
                category,
                class_label,
                board,
                condition,
                sort,
                min_price,
                max_price,
                page,
            }) => {
                assert_eq!(query.as_deref(), Some("algebra"));
                assert_eq!(category, Some(RecordKind::Book));
                assert_eq!(class_label.as_deref(), Some("10"));
                assert_eq!(board.as_deref(), Some("CBSE"));
                assert_eq!(condition.as_deref(), Some("Like New"));
                assert_eq!(sort, "price_low");
                assert_eq!(min_price, Some(100.0));
                assert_eq!(max_price, Some(500.0));
                assert_eq!(page, -2);
            }
            _ => panic!("Expected Search command"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_category() {
        let result = Cli::try_parse_from(["bookswap", "search", "--category", "magazine"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_recent_and_accounts() {
        let cli = Cli::parse_from(["bookswap", "recent", "--limit", "4"]);
        assert!(matches!(cli.command, Some(Commands::Recent { limit: Some(4) })));

        let cli = Cli::parse_from([
            "bookswap",
            "signup",
            "asha@example.com",
            "--password",
            "secret123",
            "--first-name",
            "Asha",
        ]);
        match cli.command {
            Some(Commands::Signup {
                email,
                password,
                first_name,
                ..
            }) => {
                assert_eq!(email, "asha@example.com");
                assert_eq!(password.as_deref(), Some("secret123"));
                assert_eq!(first_name.as_deref(), Some("Asha"));
            }
            _ => panic!("Expected Signup command"),
        }

        let cli = Cli::parse_from(["bookswap", "avatar", "a@example.com"]);
        assert!(matches!(cli.command, Some(Commands::Avatar { .. })));
    }

    #[test]
    fn test_fixture_data_is_refused_for_accounts() {
        let cli = Cli::parse_from([
            "bookswap",
            "--data",
            "demos/listings.json",
            "login",
            "asha@example.com",
        ]);
        assert!(ensure_hosted_accounts(&cli.data).is_err());

        let cli = Cli::parse_from(["bookswap", "login", "asha@example.com"]);
        assert!(ensure_hosted_accounts(&cli.data).is_ok());
    }

    #[test]
    fn test_cli_config_init() {
        let cli = Cli::parse_from(["bookswap", "config", "init", "--force"]);
        match cli.command {
            Some(Commands::Config {
                action: ConfigAction::Init { path, force },
            }) => {
                assert!(path.is_none());
                assert!(force);
            }
            _ => panic!("Expected config init"),
        }
    }
}
