use std::error::Error;

use clap::{Args, Parser, Subcommand};
use engine::{Engine, Movement, Role};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "granary_admin")]
#[command(about = "Admin utilities for Granary (bootstrap staff, warehouses and stock)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./granary.db?mode=rwc"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    User(User),
    Warehouse(Warehouse),
    Commodity(Commodity),
    Client(Client),
    Stock(Stock),
}

#[derive(Args, Debug)]
struct User {
    #[command(subcommand)]
    command: UserCommand,
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    Create(UserCreateArgs),
}

#[derive(Args, Debug)]
struct UserCreateArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    email: Option<String>,
    /// One of "SUPER ADMIN", "ADMIN", "SUPERVISOR", "WAREHOUSE MANAGER", "AGENT".
    #[arg(long, value_parser = parse_role)]
    role: Role,
}

#[derive(Args, Debug)]
struct Warehouse {
    #[command(subcommand)]
    command: WarehouseCommand,
}

#[derive(Subcommand, Debug)]
enum WarehouseCommand {
    Create(WarehouseCreateArgs),
}

#[derive(Args, Debug)]
struct WarehouseCreateArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    location: Option<String>,
    /// Id of the warehouse manager running it.
    #[arg(long)]
    manager: Option<String>,
}

#[derive(Args, Debug)]
struct Commodity {
    #[command(subcommand)]
    command: CommodityCommand,
}

#[derive(Subcommand, Debug)]
enum CommodityCommand {
    Create(CommodityCreateArgs),
}

#[derive(Args, Debug)]
struct CommodityCreateArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    grade: Option<String>,
}

#[derive(Args, Debug)]
struct Client {
    #[command(subcommand)]
    command: ClientCommand,
}

#[derive(Subcommand, Debug)]
enum ClientCommand {
    Create(ClientCreateArgs),
}

#[derive(Args, Debug)]
struct ClientCreateArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    phone: Option<String>,
}

#[derive(Args, Debug)]
struct Stock {
    #[command(subcommand)]
    command: StockCommand,
}

#[derive(Subcommand, Debug)]
enum StockCommand {
    /// Record goods entering a warehouse outside of a dispatch.
    Add(StockArgs),
    /// Record goods leaving a warehouse outside of a dispatch.
    Remove(StockArgs),
}

#[derive(Args, Debug)]
struct StockArgs {
    #[arg(long)]
    warehouse: Uuid,
    #[arg(long)]
    commodity: Uuid,
    #[arg(long)]
    bags: i64,
    #[arg(long)]
    weight: f64,
}

fn parse_role(raw: &str) -> Result<Role, String> {
    Role::try_from(raw).map_err(|err| err.to_string())
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let db = connect_db(&cli.database_url).await?;
    let engine = Engine::builder().database(db).build().await?;

    match cli.command {
        Command::User(User {
            command: UserCommand::Create(args),
        }) => {
            let id = engine
                .new_user(&args.name, args.email.as_deref(), args.role)
                .await?;
            println!("created user: {} ({id})", args.name);
        }
        Command::Warehouse(Warehouse {
            command: WarehouseCommand::Create(args),
        }) => {
            let id = engine
                .new_warehouse(
                    &args.name,
                    args.location.as_deref(),
                    args.manager.as_deref(),
                )
                .await?;
            println!("created warehouse: {} ({id})", args.name);
        }
        Command::Commodity(Commodity {
            command: CommodityCommand::Create(args),
        }) => {
            let id = engine
                .new_commodity(&args.name, args.grade.as_deref())
                .await?;
            println!("created commodity: {} ({id})", args.name);
        }
        Command::Client(Client {
            command: ClientCommand::Create(args),
        }) => {
            let id = engine
                .new_client(&args.name, args.email.as_deref(), args.phone.as_deref())
                .await?;
            println!("created client: {} ({id})", args.name);
        }
        Command::Stock(Stock { command }) => {
            let (args, movement) = match command {
                StockCommand::Add(args) => {
                    let movement =
                        Movement::credit(args.warehouse, args.commodity, args.bags, args.weight);
                    (args, movement)
                }
                StockCommand::Remove(args) => {
                    let movement =
                        Movement::debit(args.warehouse, args.commodity, args.bags, args.weight);
                    (args, movement)
                }
            };
            if args.bags < 0 || !args.weight.is_finite() || args.weight < 0.0 {
                eprintln!("bags and weight must not be negative");
                std::process::exit(2);
            }

            let entry = engine.apply_movement(movement).await?;
            println!(
                "warehouse {} now holds {} bags / {} kg of {}",
                args.warehouse, entry.quantity, entry.weight, args.commodity
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_parse_case_insensitively() {
        assert_eq!(parse_role("warehouse manager"), Ok(Role::WarehouseManager));
        assert!(parse_role("farmer").is_err());
    }

    #[test]
    fn stock_add_parses() {
        let cli = Cli::try_parse_from([
            "granary_admin",
            "--database-url",
            "sqlite::memory:",
            "stock",
            "add",
            "--warehouse",
            "6f1c1f3e-8a3b-4c4e-9d59-0b8f3c1d2e4a",
            "--commodity",
            "0d9e8c7b-6a5f-4e3d-8c2b-1a0f9e8d7c6b",
            "--bags",
            "60",
            "--weight",
            "1200",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::Stock(Stock {
                command: StockCommand::Add(StockArgs { bags: 60, .. })
            })
        ));
    }
}
