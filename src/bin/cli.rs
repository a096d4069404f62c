use kutility_store::{sdk, KVReader, KVWriter, SaveMode, StoreConfig, DEFAULT_APP, DEFAULT_VENDOR, SETTINGS_STORE};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Parser)]
#[command(author, version, about = "Inspect and edit Kutility settings stores", long_about = None)]
struct Cli {
    /// Directory holding the store files (defaults to the per-user config directory).
    #[arg(short, long)]
    data_dir: Option<String>,

    /// Store name, without the `.json` extension.
    #[arg(short, long, default_value = SETTINGS_STORE)]
    name: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Clone)]
enum Commands {
    Get { key: String },
    Set { key: String, value: String },
    Del { key: String },
    List,
    Clear,
    /// Print the path of the store file.
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let store = match &cli.data_dir {
        Some(dir) => sdk::open_in(dir, &cli.name, StoreConfig::from_env())?,
        None => sdk::open_with(DEFAULT_VENDOR, DEFAULT_APP, &cli.name, StoreConfig::from_env())?,
    };

    match cli.command {
        Commands::Get { key } => {
            let val = store.get_value(&key).await?;
            println!("{}", serde_json::to_string_pretty(&val)?);
        }
        Commands::Set { key, value } => {
            let val: Value = serde_json::from_str(&value).unwrap_or(Value::String(value));
            store.put_value(&key, val, SaveMode::Wait).await;
            println!("OK");
        }
        Commands::Del { key } => {
            match store.remove_value(&key, SaveMode::Wait).await {
                Some(_) => println!("OK"),
                None => println!("NOT FOUND"),
            }
        }
        Commands::List => {
            let all: BTreeMap<String, String> = store.get_all().await.into_iter().collect();
            for (key, encoded) in all {
                println!("{} = {}", key, encoded);
            }
        }
        Commands::Clear => {
            store.clear(SaveMode::Wait).await;
            println!("OK");
        }
        Commands::Path => {
            println!("{}", store.path().display());
        }
    }

    store.flush().await;
    Ok(())
}
