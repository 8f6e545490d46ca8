mod constants;
mod routes;

use clap::Parser;
use std::net::SocketAddr;
use supply_core::{Role, SupplyChain};
use tracing::{info, Level};

use crate::constants::DEFAULT_LISTEN;
use crate::routes::{router, AppState};

#[derive(Parser, Debug)]
struct Args {
    /// Address to listen on, e.g. 127.0.0.1:8080
    #[arg(long, default_value = DEFAULT_LISTEN)]
    listen: String,

    /// Seed for all synthetic data; random when omitted
    #[arg(long)]
    seed: Option<u64>,

    /// Number of products to create for the manufacturer at startup
    #[arg(long, default_value_t = 0)]
    demo_products: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let mut chain = match args.seed {
        Some(seed) => SupplyChain::seeded(seed),
        None => SupplyChain::from_os_entropy(),
    };

    for user in chain.users() {
        info!(role = %user.role, address = %user.address, "demo user");
    }
    if args.demo_products > 0 {
        let manufacturer = chain
            .user_by_role(Role::Manufacturer)
            .map(|u| u.address.clone())
            .ok_or_else(|| anyhow::anyhow!("demo roster has no manufacturer"))?;
        for i in 1..=args.demo_products {
            chain.add_product(&format!("Demo Product {i}"), &manufacturer);
        }
        info!(count = args.demo_products, "demo products created");
    }

    let app = router(AppState::new(chain));

    let addr: SocketAddr = args.listen.parse()?;
    info!("supply-node listening on http://{addr}");
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutting down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_defaults() {
        let args = Args::try_parse_from(["supply-node"]).unwrap();
        assert_eq!(args.listen, DEFAULT_LISTEN);
        assert_eq!(args.seed, None);
        assert_eq!(args.demo_products, 0);
    }

    #[test]
    fn args_overrides() {
        let args = Args::try_parse_from([
            "supply-node",
            "--listen",
            "0.0.0.0:9000",
            "--seed",
            "7",
            "--demo-products",
            "3",
        ])
        .unwrap();
        assert_eq!(args.listen, "0.0.0.0:9000");
        assert_eq!(args.seed, Some(7));
        assert_eq!(args.demo_products, 3);
    }
}
