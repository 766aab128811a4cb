//! Storefront CLI

#![expect(clippy::print_stdout, reason = "command output goes to stdout")]

use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use jiff::{Timestamp, tz::TimeZone};
use storefront::{
    CatalogFilter, CategoryId, OrderId, ProductId,
    catalog::{SortField, SortOrder},
    quantity::clamp_detail_quantity,
};
use storefront_app::{
    cart::{CartUpdate, Hydration, RemoteSync, SyncStatus},
    catalog::FetchOutcome,
    config::{self, ClientConfig},
    context::AppContext,
    notifications::NotificationKind,
    observability,
    session::BearerToken,
};

#[derive(Debug, Parser)]
#[command(name = "storefront-cli", about = "Storefront client", long_about = None)]
struct Cli {
    #[command(flatten)]
    config: ClientConfig,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List products matching a filter
    Products(ProductsArgs),

    /// Show a single product
    Product {
        /// Product slug
        slug: String,
    },

    /// List categories
    Categories,

    /// Inspect or change the cart
    Cart(CartCommand),

    /// Place an order for the current cart
    Checkout,

    /// List past orders or show one of them
    Orders(OrdersCommand),

    /// Forget the local cart and continue as a guest
    SignOut,
}

#[derive(Debug, Args)]
struct ProductsArgs {
    /// Free-text search
    #[arg(long)]
    search: Option<String>,

    /// Category identifier
    #[arg(long)]
    category: Option<String>,

    /// Sort field (createdAt, price, name)
    #[arg(long, default_value_t = SortField::CreatedAt)]
    sort: SortField,

    /// Sort direction (asc, desc)
    #[arg(long, default_value_t = SortOrder::Desc)]
    order: SortOrder,

    /// Number of pages to load
    #[arg(long, default_value_t = 1)]
    pages: u32,
}

#[derive(Debug, Args)]
struct CartCommand {
    #[command(subcommand)]
    command: CartSubcommand,
}

#[derive(Debug, Subcommand)]
enum CartSubcommand {
    /// Show cart lines and totals
    Show,

    /// Add a product by slug
    Add {
        /// Product slug
        slug: String,

        /// Quantity to add
        #[arg(long, default_value_t = 1)]
        quantity: u32,
    },

    /// Set a line quantity from free-form input
    Set {
        /// Product identifier
        product_id: String,

        /// New quantity
        quantity: String,
    },

    /// Remove a line
    Remove {
        /// Product identifier
        product_id: String,
    },

    /// Empty the cart
    Clear,

    /// Reload the cart from the server
    Sync,
}

#[derive(Debug, Args)]
struct OrdersCommand {
    #[command(subcommand)]
    command: Option<OrdersSubcommand>,
}

#[derive(Debug, Subcommand)]
enum OrdersSubcommand {
    /// List past orders (default)
    List,

    /// Show lines, address and totals of one order
    Show {
        /// Order identifier
        order_id: String,
    },
}

#[tokio::main]
pub async fn main() -> ExitCode {
    let cli = match config::load::<Cli>() {
        Ok(cli) => cli,
        Err(error) => error.exit(),
    };

    if let Err(error) = observability::init_subscriber(&cli.config.logging) {
        report(&error.to_string());

        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            report(&error);

            ExitCode::FAILURE
        }
    }
}

#[expect(clippy::print_stderr, reason = "errors are reported on stderr")]
fn report(error: &str) {
    eprintln!("{error}");
}

async fn run(cli: Cli) -> Result<(), String> {
    let ctx = AppContext::from_config(&cli.config)
        .map_err(|error| format!("failed to start: {error}"))?;

    match cli.command {
        Commands::Products(args) => list_products(&ctx, args).await,
        Commands::Product { slug } => show_product(&ctx, &slug).await,
        Commands::Categories => list_categories(&ctx).await,
        Commands::Cart(CartCommand { command }) => {
            restore(&ctx, cli.config.token.as_deref()).await;
            cart(&ctx, command).await
        }
        Commands::Checkout => {
            restore(&ctx, cli.config.token.as_deref()).await;
            checkout(&ctx).await
        }
        Commands::Orders(OrdersCommand { command }) => {
            restore(&ctx, cli.config.token.as_deref()).await;

            match command {
                None | Some(OrdersSubcommand::List) => orders(&ctx).await,
                Some(OrdersSubcommand::Show { order_id }) => {
                    show_order(&ctx, &OrderId::new(order_id)).await
                }
            }
        }
        Commands::SignOut => {
            ctx.sign_out();
            println!("signed out, local cart cleared");
            Ok(())
        }
    }
}

/// Signs in when a token is configured, otherwise loads the guest cart.
async fn restore(ctx: &AppContext, token: Option<&str>) {
    let hydration = match token.and_then(BearerToken::new) {
        Some(token) => ctx.sign_in(token).await,
        None => ctx.cart.hydrate().await,
    };

    if let Hydration::LocalFallback(error) = hydration {
        println!("store unreachable ({error}), using the cart saved on this device");
    }
}

async fn list_products(ctx: &AppContext, args: ProductsArgs) -> Result<(), String> {
    let mut filter = CatalogFilter::default().sort(args.sort, args.order);

    if let Some(search) = args.search {
        filter = filter.search(search);
    }

    if let Some(category) = args.category {
        // Category routes need the slug, which only the category list knows.
        if ctx.catalog.ensure_categories().await == 0 {
            println!("categories unavailable, showing all products");
        }

        filter = filter.category(CategoryId::new(category));
    }

    ctx.catalog
        .set_filter(filter)
        .await
        .map_err(|error| error.user_message().to_string())?;

    for _ in 1..args.pages {
        let outcome = ctx
            .catalog
            .load_more()
            .await
            .map_err(|error| error.user_message().to_string())?;

        if outcome == FetchOutcome::Skipped {
            break;
        }
    }

    let view = ctx.catalog.view();

    if view.products.is_empty() {
        println!("no products found");
        return Ok(());
    }

    for product in &view.products {
        let stock = if product.in_stock {
            format!("{} in stock", product.stock)
        } else {
            "out of stock".to_string()
        };

        println!(
            "{:<24} {:<32} {:>16}  {stock}",
            product.id,
            product.name,
            ctx.format_price(product.price)
        );
    }

    if view.has_more {
        println!("more results available, try --pages {}", args.pages.saturating_add(1));
    }

    Ok(())
}

async fn show_product(ctx: &AppContext, slug: &str) -> Result<(), String> {
    let product = ctx
        .catalog
        .product(slug)
        .await
        .map_err(|error| error.user_message().to_string())?;

    println!("{} ({})", product.name, product.id);
    println!("price: {}", ctx.format_price(product.price));

    if let Some(name) = product.category.as_ref().and_then(|c| c.name.as_deref()) {
        println!("category: {name}");
    }

    if product.in_stock {
        println!("stock: {}", product.stock);
    } else {
        println!("stock: out of stock");
    }

    if let Some(image) = product.primary_image() {
        println!("image: {image}");
    }

    if let Some(description) = &product.description {
        println!();
        println!("{description}");
    }

    Ok(())
}

async fn list_categories(ctx: &AppContext) -> Result<(), String> {
    ctx.catalog
        .load_categories()
        .await
        .map_err(|error| error.user_message().to_string())?;

    for category in ctx.catalog.view().categories {
        println!("{:<24} {:<24} {}", category.id, category.slug, category.name);
    }

    Ok(())
}

async fn cart(ctx: &AppContext, command: CartSubcommand) -> Result<(), String> {
    match command {
        CartSubcommand::Show | CartSubcommand::Sync => {}
        CartSubcommand::Add { slug, quantity } => {
            let product = ctx
                .catalog
                .product(&slug)
                .await
                .map_err(|error| error.user_message().to_string())?;

            let quantity = clamp_detail_quantity(quantity, product.stock);

            let update = ctx
                .cart
                .add_line(&product, quantity)
                .map_err(|error| error.to_string())?;

            settle_update(ctx, update).await?;
        }
        CartSubcommand::Set {
            product_id,
            quantity,
        } => {
            let update = ctx
                .cart
                .set_quantity_input(&ProductId::new(product_id), &quantity);

            settle_update(ctx, update).await?;
        }
        CartSubcommand::Remove { product_id } => {
            let update = ctx.cart.remove(&ProductId::new(product_id));

            settle_update(ctx, update).await?;
        }
        CartSubcommand::Clear => {
            settle(ctx, ctx.cart.clear()).await;
        }
    }

    print_cart(ctx);

    Ok(())
}

async fn settle_update(ctx: &AppContext, update: CartUpdate) -> Result<(), String> {
    match update {
        CartUpdate::NotInCart => Err("product is not in the cart".to_string()),
        CartUpdate::Unchanged { quantity } => {
            println!("quantity unchanged ({quantity})");
            Ok(())
        }
        CartUpdate::Applied { sync, .. } | CartUpdate::Removed { sync, .. } => {
            settle(ctx, sync).await;
            Ok(())
        }
    }
}

/// Waits for the server confirmation so the process does not exit mid-request.
async fn settle(ctx: &AppContext, sync: RemoteSync) {
    match sync.settled().await {
        SyncStatus::LocalOnly => println!("saved on this device"),
        SyncStatus::Confirmed => println!("saved to your account"),
        SyncStatus::Failed(_) | SyncStatus::Interrupted => {}
    }

    print_notification(ctx);
}

fn print_notification(ctx: &AppContext) {
    if let Some(notification) = ctx.notifier.current() {
        let tag = match notification.kind {
            NotificationKind::Success => "ok",
            NotificationKind::Error => "error",
        };

        println!("[{tag}] {}", notification.message);
    }
}

fn print_cart(ctx: &AppContext) {
    let cart = ctx.cart.snapshot();

    if cart.is_empty() {
        println!("{}", storefront_app::messages::EMPTY_CART);
        return;
    }

    for line in cart.lines() {
        let conflict = if line.has_stock_conflict() {
            "  (not enough stock)"
        } else {
            ""
        };

        println!(
            "{:<24} {:<32} {:>3} x {:>14} = {:>16}{conflict}",
            line.product_id,
            line.name,
            line.quantity,
            ctx.format_price(line.unit_price),
            ctx.format_price(line.line_total())
        );
    }

    let summary = ctx.cart.summary();

    println!();
    println!("items:    {}", summary.item_count);
    println!("subtotal: {}", ctx.format_price(summary.subtotal));

    if summary.shipping == 0 {
        println!("shipping: free");
    } else {
        println!("shipping: {}", ctx.format_price(summary.shipping));
    }

    if summary.free_shipping_remaining > 0 {
        println!(
            "add {} more for free shipping",
            ctx.format_price(summary.free_shipping_remaining)
        );
    }

    println!("total:    {}", ctx.format_price(summary.grand_total));
}

async fn checkout(ctx: &AppContext) -> Result<(), String> {
    let receipt = ctx
        .checkout
        .checkout()
        .await
        .map_err(|error| error.user_message().to_string())?;

    match &receipt.order {
        Some(order) => println!("order {} placed", order.id),
        None => println!("order placed"),
    }

    println!(
        "charged {} ({} items)",
        ctx.format_price(receipt.summary.grand_total),
        receipt.summary.item_count
    );

    settle(ctx, receipt.cart_cleared).await;

    Ok(())
}

async fn orders(ctx: &AppContext) -> Result<(), String> {
    let orders = ctx
        .order_history()
        .await
        .map_err(|error| error.user_message().to_string())?;

    if orders.is_empty() {
        println!("no orders yet");
        return Ok(());
    }

    for order in orders {
        let placed = order
            .created_at
            .map_or_else(|| "-".to_string(), local_time);

        println!(
            "{:<24} {:<20} {:>16}",
            order.id,
            placed,
            ctx.format_price(order.total)
        );
    }

    Ok(())
}

async fn show_order(ctx: &AppContext, id: &OrderId) -> Result<(), String> {
    let order = ctx
        .order_detail(id)
        .await
        .map_err(|error| error.user_message().to_string())?;

    println!("order {}", order.id);

    if let Some(placed) = order.created_at {
        println!("placed: {}", local_time(placed));
    }

    println!();

    for line in &order.items {
        println!(
            "{:<24} {:<32} {:>3} {:>16}",
            line.product_id,
            line.name,
            line.quantity,
            ctx.format_price(line.line_total)
        );
    }

    if let Some(address) = &order.shipping_address {
        println!();
        println!("ship to:  {} ({})", address.full_name, address.phone);
        println!("          {}", address.street);
    }

    println!();
    println!("subtotal: {}", ctx.format_price(order.subtotal));
    println!("shipping: {}", ctx.format_price(order.shipping_fee));
    println!("total:    {}", ctx.format_price(order.total));

    Ok(())
}

fn local_time(timestamp: Timestamp) -> String {
    timestamp
        .to_zoned(TimeZone::system())
        .strftime("%Y-%m-%d %H:%M")
        .to_string()
}
