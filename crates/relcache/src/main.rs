use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use relcache::store::RedisStore;
use relcache::{Config, Item, KeyRef, RelevantCache};

/// relcache - Redis cache client with cascading invalidation
#[derive(Parser, Debug)]
#[command(name = "relcache")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Store endpoint (redis:// or rediss://)
    #[arg(long, short = 'u', env = "REDIS_URL")]
    url: Option<String>,

    /// Skip TLS certificate verification for rediss:// endpoints
    #[arg(long)]
    skip_tls_verify: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that the store is alive
    Ping,
    /// Print the payload stored at a key
    Get { key: String },
    /// Print the payloads of several keys, one per line
    Mget {
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// Write a raw value without relevance metadata
    Set {
        key: String,
        value: String,
        /// Expiration in seconds (0 = never)
        #[arg(long, default_value_t = 0)]
        ttl: u64,
    },
    /// Write an item that cascades to its relevant keys on delete
    Put {
        key: String,
        value: String,
        /// Key (or pattern) deleted together with this item; repeatable
        #[arg(long = "relevant", short = 'r')]
        relevant: Vec<String>,
        /// Expiration in seconds (0 = never)
        #[arg(long, default_value_t = 0)]
        ttl: u64,
    },
    /// Delete keys and everything relevant to them (DEL)
    Del {
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// Delete keys and everything relevant to them (UNLINK)
    Unlink {
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// Show the keys a cascading delete would remove
    Relevance { key: String },
    /// Increment a counter
    Incr { key: String },
    /// Set a hash field
    Hset {
        key: String,
        field: String,
        value: String,
    },
    /// Print a hash field
    Hget { key: String, field: String },
    /// Print the number of fields in a hash
    Hlen { key: String },
    /// Print every key as a JSON array
    Dump,
    /// Remove every key from the current database
    Purge,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "relcache=info,relcache_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = Config::from_env();
    if cli.skip_tls_verify {
        config = config.with_skip_tls_verify(true);
    }
    if let Some(url) = cli.url {
        config = config.with_redis_url(url);
    }

    let cache = RelevantCache::connect(&config)
        .await
        .with_context(|| format!("Failed to connect to {}", config.redis_url))?;
    tracing::debug!(endpoint = %config.redis_url, "Connected");

    run(&cache, cli.command).await
}

async fn run(cache: &RelevantCache<RedisStore>, command: Command) -> Result<()> {
    match command {
        Command::Ping => println!("PONG"),
        Command::Get { key } => {
            let payload = cache.get(&key).await?;
            println!("{}", String::from_utf8_lossy(&payload));
        }
        Command::Mget { keys } => {
            let refs: Vec<KeyRef<'_>> = keys.iter().map(KeyRef::from).collect();
            for value in cache.mget(&refs).await? {
                match value {
                    Some(payload) => println!("{}", String::from_utf8_lossy(&payload)),
                    None => println!("(nil)"),
                }
            }
        }
        Command::Set { key, value, ttl } => {
            cache
                .write_raw_with_ttl(&key, value.as_bytes(), Duration::from_secs(ttl))
                .await?;
            println!("OK");
        }
        Command::Put {
            key,
            value,
            relevant,
            ttl,
        } => {
            let item = Item::new(key, value)
                .with_relevant_keys(relevant)
                .with_ttl(Duration::from_secs(ttl));
            cache.write_item(&item).await?;
            println!("OK");
        }
        Command::Del { keys } => {
            let refs: Vec<KeyRef<'_>> = keys.iter().map(KeyRef::from).collect();
            println!("{}", cache.del(&refs).await?);
        }
        Command::Unlink { keys } => {
            let refs: Vec<KeyRef<'_>> = keys.iter().map(KeyRef::from).collect();
            println!("{}", cache.unlink(&refs).await?);
        }
        Command::Relevance { key } => {
            for key in cache.relevance(&key).await? {
                println!("{key}");
            }
        }
        Command::Incr { key } => println!("{}", cache.increment(&key).await?),
        Command::Hset { key, field, value } => {
            cache.hset(&key, &field, value.as_bytes()).await?;
            println!("OK");
        }
        Command::Hget { key, field } => {
            let value = cache.hget(&key, &field).await?;
            println!("{}", String::from_utf8_lossy(&value));
        }
        Command::Hlen { key } => println!("{}", cache.hlen(&key).await?),
        Command::Dump => {
            let keys = cache.dump().await?;
            println!("{}", serde_json::to_string(&keys)?);
        }
        Command::Purge => {
            cache.purge().await?;
            println!("OK");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_put_with_relevant_keys() {
        let cli = Cli::try_parse_from([
            "relcache", "put", "A", "v1", "-r", "B", "--relevant", "user:*", "--ttl", "30",
        ])
        .unwrap();

        match cli.command {
            Command::Put {
                key,
                value,
                relevant,
                ttl,
            } => {
                assert_eq!(key, "A");
                assert_eq!(value, "v1");
                assert_eq!(relevant, vec!["B", "user:*"]);
                assert_eq!(ttl, 30);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_del_requires_keys() {
        assert!(Cli::try_parse_from(["relcache", "del"]).is_err());
    }
}
