mod terminal;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use househelper_core::auth::{
    AccessGuard, FileKeyValueStore, GuardOutcome, LoginOrchestrator, LoginPayload, PhoneAuthEvent,
    SessionStore, PHONE_AUTH_OK,
};
use househelper_core::config::ApiConfig;
use househelper_core::http::{ApiClient, ReqwestTransport};
use househelper_core::services::house_transactions::{
    HouseTransactionList, HouseTransactionService, TransactionFilter,
};
use househelper_core::services::system::SystemService;
use househelper_core::services::users::{UserAccount, UserService};
use tracing_subscriber::EnvFilter;

use terminal::{TerminalIdentity, TerminalUi};

const DEFAULT_PROFILE: &str = "default";

type Client = ApiClient<ReqwestTransport, FileKeyValueStore>;
type Orchestrator =
    LoginOrchestrator<ReqwestTransport, FileKeyValueStore, TerminalIdentity, TerminalUi>;

#[derive(Parser, Debug)]
#[command(author, version, about = "HouseHelper API client")]
struct Cli {
    /// Profile name for the stored session
    #[arg(long, global = true, default_value = DEFAULT_PROFILE)]
    profile: String,
    /// Log request and login details to stderr
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Session management
    #[command(subcommand)]
    Auth(AuthCommand),
    /// User account details
    #[command(subcommand)]
    User(UserCommand),
    /// House transaction statistics
    #[command(subcommand)]
    Transactions(TransactionCommand),
    /// Check the backend health endpoint
    Health,
    /// Show backend service information
    Info,
}

#[derive(Subcommand, Debug)]
enum AuthCommand {
    /// Sign in with a login code and profile consent
    Login,
    /// Sign in with an encrypted phone number payload
    Phone(PhoneArgs),
    /// Forget the stored token and profile
    Logout,
    /// Show whether a session is stored
    Status,
}

#[derive(Args, Debug)]
struct PhoneArgs {
    /// Encrypted phone data from the getPhoneNumber event
    #[arg(long = "encrypted-data")]
    encrypted_data: String,
    /// Initialisation vector from the getPhoneNumber event
    #[arg(long)]
    iv: String,
    /// errMsg reported by the event
    #[arg(long = "err-msg", default_value = PHONE_AUTH_OK)]
    err_msg: String,
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    /// Show the signed-in account, signing in first if needed
    Me(MeArgs),
}

#[derive(Args, Debug)]
struct MeArgs {
    /// Sign in without asking first; failures are reported as errors
    #[arg(long = "no-prompt")]
    no_prompt: bool,
    /// Output raw JSON
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum TransactionCommand {
    /// List transaction volumes
    List(TransactionListArgs),
}

#[derive(Args, Debug)]
struct TransactionListArgs {
    /// Filter by city
    #[arg(long)]
    city: Option<String>,
    /// First day to include (YYYY-MM-DD)
    #[arg(long)]
    start: Option<NaiveDate>,
    /// Last day to include (YYYY-MM-DD)
    #[arg(long)]
    end: Option<NaiveDate>,
    /// Number of rows to skip
    #[arg(long)]
    skip: Option<u32>,
    /// Maximum number of rows
    #[arg(long, default_value_t = 100)]
    limit: u32,
    /// Output raw JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let client = build_client(&cli.profile)?;
    match cli.command {
        Commands::Auth(cmd) => match cmd {
            AuthCommand::Login => auth_login(client).await?,
            AuthCommand::Phone(args) => auth_phone(client, args).await?,
            AuthCommand::Logout => auth_logout(&client, &cli.profile)?,
            AuthCommand::Status => auth_status(&client, &cli.profile)?,
        },
        Commands::User(cmd) => match cmd {
            UserCommand::Me(args) => user_me(client, args).await?,
        },
        Commands::Transactions(cmd) => match cmd {
            TransactionCommand::List(args) => transactions_list(client, args).await?,
        },
        Commands::Health => health(client).await?,
        Commands::Info => info(client).await?,
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_client(profile: &str) -> Result<Client> {
    let config = ApiConfig::from_env().context("invalid HOUSEHELPER_* configuration")?;
    let store = FileKeyValueStore::with_default_locator(profile)
        .context("unable to initialise session store")?;
    let transport = ReqwestTransport::new().context("failed to build HTTP client")?;
    tracing::debug!(base_url = %config.base_url, prefix = %config.api_prefix, "client configured");
    Ok(ApiClient::new(config, transport, SessionStore::new(store)))
}

fn orchestrator(client: Client) -> Orchestrator {
    LoginOrchestrator::new(client, TerminalIdentity, TerminalUi)
}

async fn auth_login(client: Client) -> Result<()> {
    let payload = orchestrator(client)
        .login_with_profile()
        .await
        .context("login failed")?;
    print_login(&payload);
    Ok(())
}

async fn auth_phone(client: Client, args: PhoneArgs) -> Result<()> {
    let event = PhoneAuthEvent {
        err_msg: args.err_msg,
        encrypted_data: Some(args.encrypted_data),
        iv: Some(args.iv),
    };
    let payload = orchestrator(client)
        .login_with_phone(event)
        .await
        .context("phone login failed")?;
    print_login(&payload);
    Ok(())
}

fn print_login(payload: &LoginPayload) {
    println!("Login succeeded ({} token stored).", payload.token_type);
}

fn auth_logout(client: &Client, profile: &str) -> Result<()> {
    client
        .session()
        .clear()
        .context("failed to remove stored session")?;
    println!("Deleted session for profile '{profile}'.");
    Ok(())
}

fn auth_status(client: &Client, profile: &str) -> Result<()> {
    let session = client.session();
    if !session.is_logged_in().context("failed to read session")? {
        println!("Profile '{profile}' is not signed in.");
        return Ok(());
    }
    let user = session.profile().context("failed to read cached profile")?;
    match user.nick_name {
        Some(name) => println!("Profile '{profile}' is signed in as {name}."),
        None => println!("Profile '{profile}' is signed in."),
    }
    Ok(())
}

async fn user_me(client: Client, args: MeArgs) -> Result<()> {
    let service = UserService::new(client.clone());
    let guard = AccessGuard::new(orchestrator(client));
    let outcome = guard
        .ensure_logged_in(|| service.me(), !args.no_prompt)
        .await
        .context("sign-in failed")?;

    let account = match outcome {
        GuardOutcome::Completed(result) => result.context("failed to load account")?,
        GuardOutcome::Declined => {
            println!("Sign-in declined.");
            return Ok(());
        }
        GuardOutcome::LoginFailed => return Err(anyhow!("not signed in")),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&account)?);
    } else {
        render_account(&account);
    }
    Ok(())
}

fn render_account(account: &UserAccount) {
    println!("User ID : {}", account.id);
    println!("Username: {}", account.username);
    println!("Email   : {}", account.email);
    if let Some(role) = account.role_id {
        println!("Role    : {}", role);
    }
    println!("Created : {}", account.created_at);
}

async fn transactions_list(client: Client, args: TransactionListArgs) -> Result<()> {
    let filter = TransactionFilter {
        city: args.city,
        start_date: args.start,
        end_date: args.end,
        skip: args.skip,
        limit: Some(args.limit),
    };
    let list = HouseTransactionService::new(client)
        .list(filter)
        .await
        .context("failed to list transactions")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&list)?);
    } else {
        render_transactions(&list);
    }
    Ok(())
}

fn render_transactions(list: &HouseTransactionList) {
    if list.items.is_empty() {
        println!("No transactions found.");
        return;
    }
    println!(
        "{:<12} {:<10} {:>8} {:>12} {:>8} {:>12}",
        "DATE", "CITY", "NEW", "NEW m2", "RESALE", "RESALE m2"
    );
    for item in &list.items {
        println!(
            "{:<12} {:<10} {:>8} {:>12.1} {:>8} {:>12.1}",
            item.transaction_date,
            item.city,
            item.new_house_count,
            item.new_house_area,
            item.second_hand_count,
            item.second_hand_area
        );
    }
    println!("{} of {} rows", list.items.len(), list.total);
}

async fn health(client: Client) -> Result<()> {
    let body = SystemService::new(client)
        .health()
        .await
        .context("health check failed")?;
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

async fn info(client: Client) -> Result<()> {
    let body = SystemService::new(client)
        .info()
        .await
        .context("failed to fetch service info")?;
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}
