use console::{style, Style};
use tabled::{
    settings::{Alignment, Style as TableStyle},
    Table, Tabled,
};

use crate::models::{
    cart::Cart,
    price_grid::{Grade, PriceGrid},
    product::{Badge, Product},
};

/// Whole baht with thousands separators, e.g. `1,550฿`.
pub fn format_price(amount: u64) -> String {
    format!("{}฿", format_number(amount))
}

pub fn format_number(number: u64) -> String {
    let digits = number.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for ch in text.trim().to_lowercase().chars() {
        if ch.is_alphanumeric() || ch == '_' {
            slug.push(ch);
        } else if (ch == ' ' || ch == '-') && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}

pub fn unslugify(slug: &str) -> String {
    slug.replace('-', " ")
}

pub fn to_title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Terminal colour for a grade.
pub fn grade_style(grade: &str) -> Style {
    match Grade::new(grade).as_str() {
        "silver" => Style::new().white(),
        "golden" => Style::new().yellow(),
        "premium" => Style::new().green(),
        "selected premium" => Style::new().magenta(),
        _ => Style::new().green().dim(),
    }
}

fn format_badge(badge: Option<Badge>) -> String {
    match badge {
        Some(Badge::New) => style("NEW").cyan().to_string(),
        Some(Badge::Hit) => style("HIT").yellow().to_string(),
        Some(Badge::Sale) => style("SALE").red().to_string(),
        None => String::new(),
    }
}

#[derive(Tabled)]
struct ProductTableRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Grade")]
    grade: String,
    #[tabled(rename = "Type")]
    strain_type: String,
    #[tabled(rename = "From")]
    price: String,
    #[tabled(rename = "")]
    badge: String,
}

/// `entry_price` is what the product costs at its default selection.
pub fn format_product_table(products: &[(&Product, u64)]) -> String {
    if products.is_empty() {
        return String::new();
    }

    let rows: Vec<ProductTableRow> = products
        .iter()
        .map(|(product, entry_price)| ProductTableRow {
            id: product.id.clone(),
            name: if product.name.chars().count() > 30 {
                format!("{}...", product.name.chars().take(27).collect::<String>())
            } else {
                product.name.clone()
            },
            grade: grade_style(&product.subcategory)
                .apply_to(&product.subcategory)
                .to_string(),
            strain_type: product.strain_type.clone().unwrap_or_else(|| "-".to_string()),
            price: format_price(*entry_price),
            badge: format_badge(product.badge),
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(TableStyle::rounded()).with(Alignment::left());
    table.to_string()
}

#[derive(Tabled)]
struct CartTableRow {
    #[tabled(rename = "Product")]
    product: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Selection")]
    selection: String,
    #[tabled(rename = "Qty")]
    quantity: u32,
    #[tabled(rename = "Unit")]
    unit_price: String,
    #[tabled(rename = "Subtotal")]
    subtotal: String,
}

pub fn format_cart_table(cart: &Cart) -> String {
    if cart.is_empty() {
        return String::new();
    }

    let rows: Vec<CartTableRow> = cart
        .items()
        .iter()
        .map(|item| CartTableRow {
            product: item.name.clone(),
            id: item.product_id.clone(),
            selection: item.selection.to_string(),
            quantity: item.quantity,
            unit_price: format_price(item.unit_price),
            subtotal: format_price(item.subtotal()),
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(TableStyle::rounded()).with(Alignment::left());

    format!(
        "{}\n{}: {}",
        table,
        style("Total").bold(),
        style(format_price(cart.total())).bold().green()
    )
}

#[derive(Tabled)]
struct GradeTableRow {
    #[tabled(rename = "Grade")]
    grade: String,
    #[tabled(rename = "1g")]
    at_1: String,
    #[tabled(rename = "5g")]
    at_5: String,
    #[tabled(rename = "10g")]
    at_10: String,
    #[tabled(rename = "20g")]
    at_20: String,
}

pub fn format_grade_table(grades: &[(&Grade, &PriceGrid)], default_grade: &Grade) -> String {
    let rows: Vec<GradeTableRow> = grades
        .iter()
        .map(|(grade, grid)| {
            let mut name = to_title_case(grade.as_str());
            if *grade == default_grade {
                name.push_str(" (default)");
            }
            GradeTableRow {
                grade: grade_style(grade.as_str()).apply_to(name).to_string(),
                at_1: format_price(grid.at_1),
                at_5: format_price(grid.at_5),
                at_10: format_price(grid.at_10),
                at_20: format_price(grid.at_20),
            }
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(TableStyle::rounded()).with(Alignment::left());
    table.to_string()
}

pub fn format_product_detail(product: &Product, entry_price: u64) -> String {
    let mut output = String::new();

    output.push_str(&format!("{}: {}\n", style("ID").bold(), style(&product.id).cyan()));
    output.push_str(&format!("{}: {}\n", style("Name").bold(), style(&product.name).green()));
    output.push_str(&format!(
        "{}: {}\n",
        style("Category").bold(),
        to_title_case(&product.category)
    ));
    if !product.subcategory.is_empty() {
        output.push_str(&format!(
            "{}: {}\n",
            style("Grade").bold(),
            grade_style(&product.subcategory).apply_to(&product.subcategory)
        ));
    }
    if let Some(strain_type) = &product.strain_type {
        output.push_str(&format!("{}: {}\n", style("Type").bold(), strain_type));
    }
    output.push_str(&format!(
        "{}: {}\n",
        style("Price").bold(),
        style(format_price(entry_price)).yellow()
    ));
    if let Some(description) = &product.description {
        output.push_str(&format!("{}: {}\n", style("Description").bold(), style(description).dim()));
    }
    if let Some(stock) = product.stock {
        output.push_str(&format!("{}: {}\n", style("In stock").bold(), stock));
    }
    output.push_str(&format!("{}: {}\n", style("Image").bold(), style(&product.image).dim()));

    output
}
