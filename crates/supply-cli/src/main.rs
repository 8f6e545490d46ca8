use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use reqwest::{Client, RequestBuilder};
use serde_json::json;
use supply_core::{Product, ProductStatus, Role};
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "supply-cli")]
#[command(about = "CLI client for the supply-chain ledger node")]
struct Cli {
    /// Node base URL (e.g. http://127.0.0.1:8080)
    #[arg(long, global = true, default_value = "http://127.0.0.1:8080")]
    node: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in with a role's demo password
    Login {
        #[arg(long)]
        role: Role,
        #[arg(long)]
        password: String,
    },
    /// List users
    Users,
    /// Show one user's balance, volume and reputation
    User { address: String },
    /// List products
    Products,
    /// Show one product
    Product { id: String },
    /// Ledger transactions for a product
    History { id: String },
    /// Market analysis for a product
    Market { id: String },
    /// Create a product
    Add {
        #[arg(long)]
        name: String,
        /// Manufacturer address
        #[arg(long)]
        manufacturer: String,
    },
    /// Set a product's status directly
    Status {
        id: String,
        #[arg(long)]
        status: ProductStatus,
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
    },
    /// Move a product one step along its lifecycle, if the role allows it
    Advance {
        id: String,
        #[arg(long = "as")]
        role: Role,
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
    },
    /// Pay the manufacturer for a product
    Pay {
        id: String,
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
    },
    /// Set the distributor margin (percent)
    Margin {
        id: String,
        #[arg(long)]
        margin: f64,
    },
    /// Set the batch size
    Batch {
        id: String,
        #[arg(long)]
        size: u32,
    },
    /// Run a quality inspection
    Inspect {
        id: String,
        #[arg(long)]
        inspector: String,
    },
    /// Override the retail price
    RetailPrice {
        id: String,
        #[arg(long)]
        price: f64,
    },
    /// Chain height and tip hash
    Head,
    /// List sealed blocks
    Blocks {
        #[arg(long, default_value_t = 25)]
        limit: usize,
        /// Newest first
        #[arg(long)]
        desc: bool,
    },
    /// Re-check every block digest and link
    Verify,
    /// Transactions not yet sealed
    Mempool,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .pretty()
        .init();

    let cli = Cli::parse();
    let client = Client::new();
    let node = cli.node.trim_end_matches('/').to_string();
    let url = |path: &str| format!("{node}{path}");

    let req = match cli.cmd {
        Command::Login { role, password } => client
            .post(url("/auth/login"))
            .json(&json!({ "role": role, "password": password })),
        Command::Users => client.get(url("/users")),
        Command::User { address } => client.get(url(&format!("/users/{address}"))),
        Command::Products => client.get(url("/products")),
        Command::Product { id } => client.get(url(&format!("/products/{id}"))),
        Command::History { id } => client.get(url(&format!("/products/{id}/transactions"))),
        Command::Market { id } => client.get(url(&format!("/products/{id}/market"))),
        Command::Add { name, manufacturer } => client
            .post(url("/products"))
            .json(&json!({ "name": name, "manufacturer": manufacturer })),
        Command::Status {
            id,
            status,
            from,
            to,
        } => status_request(&client, &url(&format!("/products/{id}/status")), status, &from, &to),
        Command::Advance { id, role, from, to } => {
            let product: Product = client
                .get(url(&format!("/products/{id}")))
                .send()
                .await?
                .error_for_status()?
                .json()
                .await
                .context("decoding product")?;
            let next = next_status(role, &product)?;
            debug!(from = %product.status, to = %next, "advancing");
            status_request(&client, &url(&format!("/products/{id}/status")), next, &from, &to)
        }
        Command::Pay { id, from, to } => client
            .post(url(&format!("/products/{id}/payment")))
            .json(&json!({ "from": from, "to": to })),
        Command::Margin { id, margin } => client
            .post(url(&format!("/products/{id}/margin")))
            .json(&json!({ "margin": margin })),
        Command::Batch { id, size } => client
            .post(url(&format!("/products/{id}/batch-size")))
            .json(&json!({ "size": size })),
        Command::Inspect { id, inspector } => client
            .post(url(&format!("/products/{id}/inspection")))
            .json(&json!({ "inspector": inspector })),
        Command::RetailPrice { id, price } => client
            .post(url(&format!("/products/{id}/retail-price")))
            .json(&json!({ "price": price })),
        Command::Head => client.get(url("/chain/head")),
        Command::Blocks { limit, desc } => {
            let dir = if desc { "desc" } else { "asc" };
            client.get(url(&format!("/chain/blocks?limit={limit}&dir={dir}")))
        }
        Command::Verify => client.get(url("/chain/verify")),
        Command::Mempool => client.get(url("/mempool")),
    };

    show(req).await
}

fn status_request(
    client: &Client,
    url: &str,
    status: ProductStatus,
    from: &str,
    to: &str,
) -> RequestBuilder {
    client
        .post(url)
        .json(&json!({ "status": status, "from": from, "to": to }))
}

/// The status `role` may move `product` to.
fn next_status(role: Role, product: &Product) -> Result<ProductStatus> {
    if !role.can_advance(product.status) {
        bail!("a {role} cannot advance a product that is {}", product.status);
    }
    match product.status.next() {
        Some(next) => Ok(next),
        None => bail!("product {} is already {}", product.id, product.status),
    }
}

async fn show(req: RequestBuilder) -> Result<()> {
    let res = req.send().await?;
    let status = res.status();
    let body = res.text().await?;
    println!("status: {status}");
    match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        Err(_) => println!("{body}"),
    }
    if !status.is_success() {
        bail!("node answered {status}");
    }
    Ok(())
}
