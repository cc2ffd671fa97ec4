use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "storefront")]
#[command(about = "Browse the shop catalog, fill a cart and send the order")]
#[command(version = "0.1.0")]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List products with optional filtering
    Catalog {
        /// Category (name or slug); defaults to the first one in the feed
        #[arg(short, long)]
        category: Option<String>,
        /// Grade filter, e.g. "golden"
        #[arg(short, long)]
        grade: Option<String>,
        /// Strain type filter: indica, sativa or hybrid
        #[arg(short = 't', long = "type")]
        strain_type: Option<String>,
    },
    /// Show detailed information about a product
    Show {
        /// Product ID
        id: String,
    },
    /// List catalog categories
    Categories,
    /// Show the grade price grids, or the grades offered in a category
    Grades {
        /// Category to list grades for
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Quote a weight of a grade
    Price {
        /// Grade name; unknown grades use the default grid
        grade: String,
        /// Weight in grams
        grams: f64,
    },
    /// Cart management commands
    Cart {
        #[command(subcommand)]
        command: CartCommands,
    },
    /// Send the cart as an order
    Checkout {
        /// Telegram handle to reach you on
        #[arg(long)]
        telegram: Option<String>,
        /// Phone number to reach you on
        #[arg(long)]
        phone: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum CartCommands {
    /// Show cart contents and total
    Show,
    /// Add a product to the cart
    Add {
        /// Product ID
        id: String,
        /// Weight such as 5 or 2.5g; weighed products default to 1g
        #[arg(short, long)]
        weight: Option<String>,
        /// Number of units
        #[arg(short = 'n', long, default_value_t = 1)]
        count: u32,
    },
    /// Remove a line from the cart
    Remove {
        /// Product ID
        id: String,
        /// Selection of the line, e.g. 5g or 1pc
        selection: String,
    },
    /// Change the count of a line by a signed amount
    Update {
        /// Product ID
        id: String,
        /// Selection of the line, e.g. 5g or 1pc
        selection: String,
        /// Amount to add; negative values decrease, never below one
        #[arg(allow_hyphen_values = true)]
        delta: i64,
    },
    /// Empty the cart
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}
