use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use roster::api::{CachedUsersClient, CreateUserInput, Role, UpdateUserInput, User};
use roster::auth::{CredentialProvider, FileCredentials, LogSession, MemoryCredentials};
use roster::cache::{ListState, QueryState};
use roster::config::Config;

#[derive(Parser, Debug)]
#[command(name = "roster")]
#[command(about = "Browse and edit users through the users API")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/roster/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// API base url, overrides the config file
  #[arg(long)]
  base_url: Option<String>,

  /// Log request traffic
  #[arg(short, long)]
  verbose: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// List all users
  List,
  /// Show one user
  Get { id: i64 },
  /// Show a user's profile
  Profile { id: i64 },
  /// Create a user
  Create {
    #[arg(long)]
    name: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    password: String,
    #[arg(long)]
    role: Option<Role>,
  },
  /// Update fields of a user
  Update {
    id: i64,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    avatar: Option<String>,
    #[arg(long)]
    bio: Option<String>,
    #[arg(long)]
    website: Option<String>,
    #[arg(long)]
    location: Option<String>,
  },
  /// Delete a user
  Delete { id: i64 },
  /// Store an auth token for later requests
  Login { token: String },
  /// Forget the stored auth token
  Logout,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let mut config = Config::load(args.config.as_deref())?;
  if let Some(base_url) = args.base_url {
    config.api.base_url = base_url;
  }

  let _guard = init_logging(args.verbose, config.log_file.as_deref())?;

  let token_file = FileCredentials::open()?;
  match &args.command {
    Command::Login { token } => {
      token_file.store(token)?;
      println!("Token saved to {}", token_file.path().display());
      return Ok(());
    }
    Command::Logout => {
      token_file.clear();
      println!("Token removed");
      return Ok(());
    }
    _ => {}
  }

  // An explicit env token wins over the stored one
  let credentials: Arc<dyn CredentialProvider> = match Config::env_token() {
    Some(token) => Arc::new(MemoryCredentials::new(Some(token))),
    None => Arc::new(token_file),
  };

  let client = CachedUsersClient::new(&config, credentials, Arc::new(LogSession))?;
  client.cache().spawn_collector(config.cache.collect_interval());
  let result = run(&client, args.command).await;
  client.shutdown();
  result
}

async fn run(client: &CachedUsersClient, command: Command) -> Result<()> {
  match command {
    Command::List => {
      let state = client.users().await;
      match state.list_state() {
        ListState::Loading => println!("Loading..."),
        ListState::Error(e) => return Err(eyre!("Failed to load users: {}", e)),
        ListState::Empty => println!("No users found"),
        ListState::Items(users) => {
          for user in users {
            print_user_line(user);
          }
        }
      }
    }

    Command::Get { id } => {
      let user = expect_found(client.user(id).await, id)?;
      print_json(&user)?;
    }

    Command::Profile { id } => {
      let profile = expect_found(client.user_profile(id).await, id)?;
      print_json(&profile)?;
    }

    Command::Create {
      name,
      email,
      password,
      role,
    } => {
      let input = CreateUserInput {
        name,
        email,
        password,
        role,
      };
      input.validate()?;
      let user = client.create_user(&input).await?;
      print_json(&user)?;
    }

    Command::Update {
      id,
      name,
      email,
      avatar,
      bio,
      website,
      location,
    } => {
      let input = UpdateUserInput {
        name,
        email,
        avatar,
        bio,
        website,
        location,
      };
      if input.is_empty() {
        return Err(eyre!("Nothing to update, pass at least one field"));
      }
      input.validate()?;
      let user = client.update_user(id, &input).await?;
      print_json(&user)?;
    }

    Command::Delete { id } => {
      client.delete_user(id).await?;
      println!("Deleted user {}", id);
    }

    Command::Login { .. } | Command::Logout => unreachable!("handled before the client is built"),
  }

  Ok(())
}

fn expect_found<T>(state: QueryState<T>, id: i64) -> Result<T> {
  if state.is_idle() {
    return Err(eyre!("Invalid user id {}, ids start at 1", id));
  }
  state
    .into_result()?
    .ok_or_else(|| eyre!("User {} could not be loaded", id))
}

fn print_user_line(user: &User) {
  println!(
    "{:>6}  {:<24}  {:<32}  {}",
    user.id.to_string(),
    user.name,
    user.email,
    user.role.as_str()
  );
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
  let text = serde_json::to_string_pretty(value)?;
  println!("{}", text);
  Ok(())
}

fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
  let filter = if verbose {
    EnvFilter::new("debug")
  } else {
    EnvFilter::from_default_env().add_directive(Level::WARN.into())
  };

  match log_file {
    Some(path) => {
      let dir = path.parent().unwrap_or_else(|| Path::new("."));
      let name = path
        .file_name()
        .ok_or_else(|| eyre!("Invalid log file path: {}", path.display()))?;
      let appender = tracing_appender::rolling::never(dir, name);
      let (writer, guard) = tracing_appender::non_blocking(appender);

      tracing_subscriber::registry()
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .with(filter)
        .init();

      Ok(Some(guard))
    }
    None => {
      tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

      Ok(None)
    }
  }
}
