use std::sync::Arc;

use anyhow::{Context, Result};
use console::{style, Emoji};
use dialoguer::{theme::ColorfulTheme, Confirm, Input};
use tracing::{error, info, warn};

use crate::{
    cli::args::*,
    models::{
        cart::{AddItemRequest, LineKey, Selection},
        order::ContactDetails,
        price_grid::PricingTable,
        product::{CatalogFilter, Product},
    },
    services::{
        CartService, CatalogService, CheckoutError, CheckoutService, HttpInventorySource,
        Notifier, PricingService, TelegramNotifier,
    },
    storage::FileCartStorage,
    utils::{
        formatting::{
            format_cart_table, format_grade_table, format_price, format_product_detail,
            format_product_table, grade_style, slugify, to_title_case, unslugify,
        },
        Config,
    },
};

static CHECKMARK: Emoji<'_, '_> = Emoji("✅ ", "");
static CROSS: Emoji<'_, '_> = Emoji("❌ ", "");
static WARNING: Emoji<'_, '_> = Emoji("⚠️ ", "");
static INFO: Emoji<'_, '_> = Emoji("ℹ️ ", "");
static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "");
static CART: Emoji<'_, '_> = Emoji("🛒 ", "");

/// Match a user-typed category against the catalog's categories by slug.
fn resolve_category<'a>(input: &str, categories: &'a [String]) -> Option<&'a String> {
    let wanted = slugify(input);
    categories.iter().find(|category| slugify(category) == wanted)
}

pub struct CliApp {
    pricing_service: PricingService,
    catalog_service: CatalogService,
    cart_service: CartService,
    checkout_service: CheckoutService,
    catalog_loaded: bool,
}

impl CliApp {
    pub async fn new(config: &Config) -> Result<Self> {
        let table = match &config.price_grids_path {
            Some(path) => PricingTable::with_overrides_from_file(path)
                .with_context(|| format!("Failed to load price grids from {}", path.display()))?,
            None => PricingTable::standard(),
        };

        let source = HttpInventorySource::new(&config.inventory_url)
            .context("Failed to set up inventory source")?;

        let storage = FileCartStorage::new(config.cart_dir.clone())
            .with_context(|| format!("Failed to open cart directory {}", config.cart_dir.display()))?;

        let notifier: Option<Arc<dyn Notifier>> = match config.telegram() {
            Some((token, chat_id)) => {
                let telegram = TelegramNotifier::new(&config.telegram_api_url, token, chat_id)
                    .context("Failed to set up Telegram notifier")?;
                Some(Arc::new(telegram) as Arc<dyn Notifier>)
            }
            None => {
                warn!("TG_TOKEN or TG_CHAT_ID not set, checkout is disabled");
                None
            }
        };

        Ok(Self {
            pricing_service: PricingService::new(table),
            catalog_service: CatalogService::new(Arc::new(source)),
            cart_service: CartService::load(Arc::new(storage)).await,
            checkout_service: CheckoutService::new(notifier),
            catalog_loaded: false,
        })
    }

    pub async fn run(&mut self, args: Args) -> Result<()> {
        match args.command {
            Commands::Catalog { category, grade, strain_type } => {
                self.handle_catalog(category, grade, strain_type).await
            }
            Commands::Show { id } => self.handle_show(id).await,
            Commands::Categories => self.handle_categories().await,
            Commands::Grades { category } => self.handle_grades(category).await,
            Commands::Price { grade, grams } => self.handle_price(grade, grams),
            Commands::Cart { command } => self.handle_cart_command(command).await,
            Commands::Checkout { telegram, phone } => self.handle_checkout(telegram, phone).await,
        }
    }

    async fn ensure_catalog(&mut self) {
        if !self.catalog_loaded {
            self.catalog_service.refresh().await;
            self.catalog_loaded = true;
        }
    }

    /// Price of a product at the selection its card starts on.
    fn entry_price(&self, product: &Product) -> u64 {
        let selection = PricingService::default_selection(product);
        self.pricing_service
            .unit_price(product, &selection)
            .unwrap_or(product.price)
    }

    // Catalog Commands
    async fn handle_catalog(
        &mut self,
        category: Option<String>,
        grade: Option<String>,
        strain_type: Option<String>,
    ) -> Result<()> {
        self.ensure_catalog().await;

        let categories = self.catalog_service.categories();
        let category = match category {
            Some(input) => match resolve_category(&input, &categories) {
                Some(category) => category.clone(),
                None => {
                    println!(
                        "{} No category named '{}'",
                        WARNING,
                        style(unslugify(&input)).yellow()
                    );
                    return Ok(());
                }
            },
            None => match categories.first() {
                Some(category) => category.clone(),
                None => {
                    println!("{} No products available right now", INFO);
                    return Ok(());
                }
            },
        };

        let mut filter = CatalogFilter::new().with_category(category.as_str());
        if let Some(grade) = grade {
            filter = filter.with_subcategory(grade);
        }
        if let Some(strain_type) = strain_type {
            filter = filter.with_strain_type(strain_type);
        }

        let products = self.catalog_service.filter(&filter);
        if products.is_empty() {
            println!("{} No products found in {}", INFO, to_title_case(&category));
            return Ok(());
        }

        let rows: Vec<(&Product, u64)> = products
            .into_iter()
            .map(|product| (product, self.entry_price(product)))
            .collect();

        println!(
            "{} {}",
            INFO,
            style(format!("{}: {} products", to_title_case(&category), rows.len())).bold()
        );
        println!("{}", format_product_table(&rows));
        Ok(())
    }

    async fn handle_show(&mut self, id: String) -> Result<()> {
        self.ensure_catalog().await;

        match self.catalog_service.find(&id) {
            Some(product) => {
                println!("{} {}", INFO, style("Product Details").bold().cyan());
                println!("{}", format_product_detail(product, self.entry_price(product)));
            }
            None => println!("{} Product '{}' not found", CROSS, style(&id).red()),
        }
        Ok(())
    }

    async fn handle_categories(&mut self) -> Result<()> {
        self.ensure_catalog().await;

        let categories = self.catalog_service.categories();
        if categories.is_empty() {
            println!("{} No products available right now", INFO);
            return Ok(());
        }

        println!("{} {}", INFO, style("Categories").bold().cyan());
        for category in categories {
            println!("  {} ({})", to_title_case(&category), style(slugify(&category)).dim());
        }
        Ok(())
    }

    async fn handle_grades(&mut self, category: Option<String>) -> Result<()> {
        let Some(input) = category else {
            let table = self.pricing_service.table();
            println!("{} {}", INFO, style("Price grids").bold().cyan());
            println!("{}", format_grade_table(&table.grades(), table.default_grade()));
            return Ok(());
        };

        self.ensure_catalog().await;
        let categories = self.catalog_service.categories();
        let Some(category) = resolve_category(&input, &categories) else {
            println!("{} No category named '{}'", WARNING, style(unslugify(&input)).yellow());
            return Ok(());
        };

        println!("{} {}", INFO, style(to_title_case(category)).bold().cyan());
        for grade in self.catalog_service.subcategories(category) {
            println!("  {}", grade_style(&grade).apply_to(&grade));
        }

        let strain_types = self.catalog_service.strain_types(category);
        if !strain_types.is_empty() {
            println!("{}", style("Types").bold());
            for strain_type in strain_types {
                println!("  {}", strain_type);
            }
        }
        Ok(())
    }

    fn handle_price(&self, grade: String, grams: f64) -> Result<()> {
        let table = self.pricing_service.table();
        if !table.contains(&grade) {
            println!(
                "{} Unknown grade '{}', using {}",
                WARNING,
                style(&grade).yellow(),
                table.default_grade()
            );
        }

        let (resolved, _) = table.resolve(&grade);
        let price = self.pricing_service.price_for(grams, &grade);
        println!(
            "{}g of {} = {}",
            grams,
            grade_style(resolved.as_str()).apply_to(to_title_case(resolved.as_str())),
            style(format_price(price)).bold().yellow()
        );
        Ok(())
    }

    // Cart Commands
    async fn handle_cart_command(&mut self, command: CartCommands) -> Result<()> {
        match command {
            CartCommands::Show => self.handle_cart_show(),
            CartCommands::Add { id, weight, count } => self.handle_cart_add(id, weight, count).await,
            CartCommands::Remove { id, selection } => self.handle_cart_remove(id, selection).await,
            CartCommands::Update { id, selection, delta } => {
                self.handle_cart_update(id, selection, delta).await
            }
            CartCommands::Clear { force } => self.handle_cart_clear(force).await,
        }
    }

    fn handle_cart_show(&self) -> Result<()> {
        let cart = self.cart_service.cart();
        if cart.is_empty() {
            println!("{} Your cart is empty", CART);
        } else {
            println!(
                "{} {}",
                CART,
                style(format!("{} lines, {} items", cart.len(), cart.item_count())).bold()
            );
            println!("{}", format_cart_table(cart));
        }
        Ok(())
    }

    async fn handle_cart_add(&mut self, id: String, weight: Option<String>, count: u32) -> Result<()> {
        self.ensure_catalog().await;

        let Some(product) = self.catalog_service.find(&id) else {
            println!("{} Product '{}' not found", CROSS, style(&id).red());
            return Ok(());
        };

        let selection = match weight {
            Some(weight) => weight
                .parse::<Selection>()
                .context("Invalid weight")?,
            None => PricingService::default_selection(product),
        };

        let unit_price = match self.pricing_service.unit_price(product, &selection) {
            Ok(price) => price,
            Err(e) => {
                println!("{} {}", CROSS, style(&e).red());
                return Ok(());
            }
        };

        if count == 0 {
            println!("{} Nothing to add", INFO);
            return Ok(());
        }

        let request = AddItemRequest::new(product.id.as_str(), product.name.as_str(), selection, unit_price)
            .with_quantity(count);
        let name = product.name.clone();
        self.cart_service.add_item(request).await;

        println!(
            "{} Added {} x {} ({}) at {}",
            CHECKMARK,
            count,
            style(&name).green(),
            selection,
            format_price(unit_price)
        );
        println!("Cart total: {}", style(format_price(self.cart_service.total())).bold().yellow());
        Ok(())
    }

    async fn handle_cart_remove(&mut self, id: String, selection: String) -> Result<()> {
        let selection = selection.parse::<Selection>().context("Invalid selection")?;
        let key = LineKey::new(id.trim(), selection);

        if self.cart_service.remove_item(&key).await {
            println!("{} Removed {} ({})", CHECKMARK, style(&key.product_id).green(), selection);
            println!("Cart total: {}", style(format_price(self.cart_service.total())).bold().yellow());
        } else {
            println!("{} No cart line for {} ({})", WARNING, style(&key.product_id).yellow(), selection);
        }
        Ok(())
    }

    async fn handle_cart_update(&mut self, id: String, selection: String, delta: i64) -> Result<()> {
        let selection = selection.parse::<Selection>().context("Invalid selection")?;
        let key = LineKey::new(id.trim(), selection);

        match self.cart_service.update_quantity(&key, delta).await {
            Some(quantity) => {
                println!(
                    "{} {} ({}) now x{}",
                    CHECKMARK,
                    style(&key.product_id).green(),
                    selection,
                    quantity
                );
                println!("Cart total: {}", style(format_price(self.cart_service.total())).bold().yellow());
            }
            None => {
                println!("{} No cart line for {} ({})", WARNING, style(&key.product_id).yellow(), selection)
            }
        }
        Ok(())
    }

    async fn handle_cart_clear(&mut self, force: bool) -> Result<()> {
        if self.cart_service.is_empty() {
            println!("{} Your cart is already empty", CART);
            return Ok(());
        }

        if !force {
            let theme = ColorfulTheme::default();
            let confirm = Confirm::with_theme(&theme)
                .with_prompt("Remove everything from your cart?")
                .default(false)
                .interact()?;

            if !confirm {
                println!("Cart left unchanged");
                return Ok(());
            }
        }

        self.cart_service.clear().await;
        println!("{} Cart cleared", CHECKMARK);
        Ok(())
    }

    // Checkout
    fn prompt_contact() -> Result<ContactDetails> {
        let theme = ColorfulTheme::default();

        let handle: String = Input::with_theme(&theme)
            .with_prompt("Telegram handle (optional)")
            .allow_empty(true)
            .interact_text()?;

        let phone: String = Input::with_theme(&theme)
            .with_prompt("Phone (optional)")
            .allow_empty(true)
            .interact_text()?;

        Ok(ContactDetails::new(Some(handle), Some(phone)))
    }

    async fn handle_checkout(&mut self, telegram: Option<String>, phone: Option<String>) -> Result<()> {
        if self.cart_service.is_empty() {
            println!("{} Your cart is empty, nothing to order", CART);
            return Ok(());
        }
        if !self.checkout_service.is_configured() {
            println!("{} Ordering is not available: TG_TOKEN and TG_CHAT_ID are not set", CROSS);
            return Ok(());
        }

        println!("{} {}", ROCKET, style("Checkout").bold().cyan());
        self.handle_cart_show()?;

        let contact = if telegram.is_none() && phone.is_none() {
            Self::prompt_contact()?
        } else {
            ContactDetails::new(telegram, phone)
        };

        match self.checkout_service.submit(&mut self.cart_service, contact).await {
            Ok(receipt) => {
                println!("{} Order sent! We will contact you shortly.", CHECKMARK);
                println!(
                    "{} lines, total {}",
                    receipt.lines,
                    style(format_price(receipt.total)).bold().green()
                );
                info!("Order placed, total {}", receipt.total);
                self.checkout_service.acknowledge();
            }
            Err(CheckoutError::InvalidContact(e)) => {
                println!("{} Please give a Telegram handle or a phone number", WARNING);
                warn!("Checkout rejected contact details: {}", e);
            }
            Err(CheckoutError::NotSent(e)) => {
                println!(
                    "{} Order not sent, your cart is unchanged: {}",
                    CROSS,
                    style(&e).red()
                );
                error!("Order not sent: {}", e);
            }
            Err(e) => {
                println!("{} Checkout failed: {}", CROSS, style(&e).red());
                error!("Checkout failed: {}", e);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_category_by_slug() {
        let categories = vec!["Buds".to_string(), "Pre Rolls".to_string()];
        assert_eq!(resolve_category("buds", &categories), Some(&categories[0]));
        assert_eq!(resolve_category("pre-rolls", &categories), Some(&categories[1]));
        assert_eq!(resolve_category(" PRE ROLLS ", &categories), Some(&categories[1]));
        assert_eq!(resolve_category("edibles", &categories), None);
    }
}
