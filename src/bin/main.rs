use std::error::Error;

use clap::Parser;
use tracing::Level;
use vtex_user_role::client::UserRoleClient;
use vtex_user_role::parameters::Commands;
use vtex_user_role::user_role::{UserRole, UserRoleId};

#[derive(Parser, Debug)]
#[command(name = "vtex-user-role-cli")]
struct Cli {
    /// Maximum level of the logs written to stderr
    #[arg(long, global = true, default_value = "info")]
    log_level: Level,

    #[command(subcommand)]
    command: Commands,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Create {
            provider,
            user_role,
        } => {
            let client = UserRoleClient::try_new(provider.try_into_config()?)?;
            let user_role = UserRole::from(user_role);
            client.create_user_role(&user_role)?;
            println!("{}", user_role.id());
            Ok(())
        }
        Commands::Delete {
            provider,
            user_role,
        } => {
            let client = UserRoleClient::try_new(provider.try_into_config()?)?;
            client.delete_user_role(&UserRole::from(user_role))?;
            Ok(())
        }
        Commands::ParseId { id } => {
            let user_role = UserRole::from(id.parse::<UserRoleId>()?);
            println!("{}", serde_json::to_string_pretty(&user_role)?);
            Ok(())
        }
    }
}
