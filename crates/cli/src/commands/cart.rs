//! Cart commands. Every mutation loads the persisted cart, applies one
//! change, saves it and prints the result.

use rust_decimal::Decimal;

use harbor_core::ProductId;
use harbor_storefront::cart::{CartStore, ProductCatalog, StaticCatalog};
use harbor_storefront::{AppError, AppState};

/// Print the cart.
///
/// # Errors
///
/// Returns an error if the catalog cannot be loaded.
pub fn show(state: &AppState) -> Result<(), AppError> {
    let catalog = state.catalog()?;
    print_cart(&state.load_cart(&catalog));
    Ok(())
}

/// Add one unit of a catalog product.
///
/// # Errors
///
/// Returns an error if the product is not in the catalog or the cart cannot be saved.
pub fn add(state: &AppState, product_id: &str) -> Result<(), AppError> {
    let catalog = state.catalog()?;
    let product = catalog
        .product(&ProductId::new(product_id))
        .ok_or_else(|| AppError::NotFound(format!("Product {product_id}")))?;
    mutate(state, &catalog, |cart| {
        cart.add_item(product);
        Ok(())
    })
}

/// Remove a line.
///
/// # Errors
///
/// Returns an error if the product is not in the cart or the cart cannot be saved.
pub fn remove(state: &AppState, product_id: &str) -> Result<(), AppError> {
    let catalog = state.catalog()?;
    mutate(state, &catalog, |cart| {
        require_line(cart.remove_item(&ProductId::new(product_id)), product_id)
    })
}

/// Set a line's quantity.
///
/// # Errors
///
/// Returns an error if the product is not in the cart or the cart cannot be saved.
pub fn set_quantity(state: &AppState, product_id: &str, quantity: i64) -> Result<(), AppError> {
    let catalog = state.catalog()?;
    mutate(state, &catalog, |cart| {
        require_line(
            cart.update_quantity(&ProductId::new(product_id), quantity),
            product_id,
        )
    })
}

/// Flip a line's selection.
///
/// # Errors
///
/// Returns an error if the product is not in the cart or the cart cannot be saved.
pub fn toggle(state: &AppState, product_id: &str) -> Result<(), AppError> {
    let catalog = state.catalog()?;
    mutate(state, &catalog, |cart| {
        require_line(cart.toggle_select(&ProductId::new(product_id)), product_id)
    })
}

/// Select or deselect every line.
///
/// # Errors
///
/// Returns an error if the cart cannot be saved.
pub fn select_all(state: &AppState, selected: bool) -> Result<(), AppError> {
    let catalog = state.catalog()?;
    mutate(state, &catalog, |cart| {
        cart.toggle_select_all(selected);
        Ok(())
    })
}

/// Apply a discount amount.
///
/// # Errors
///
/// Returns an error if the cart cannot be saved.
pub fn discount(state: &AppState, amount: Decimal) -> Result<(), AppError> {
    let catalog = state.catalog()?;
    mutate(state, &catalog, |cart| {
        cart.set_discount(amount);
        Ok(())
    })
}

/// Empty the cart.
///
/// # Errors
///
/// Returns an error if the cart cannot be saved.
pub fn clear(state: &AppState) -> Result<(), AppError> {
    let catalog = state.catalog()?;
    mutate(state, &catalog, |cart| {
        cart.clear();
        Ok(())
    })
}

fn mutate(
    state: &AppState,
    catalog: &StaticCatalog,
    change: impl FnOnce(&mut CartStore) -> Result<(), AppError>,
) -> Result<(), AppError> {
    let mut cart = state.load_cart(catalog);
    change(&mut cart)?;
    state.save_cart(&cart)?;
    print_cart(&cart);
    Ok(())
}

fn require_line(found: bool, product_id: &str) -> Result<(), AppError> {
    if found {
        Ok(())
    } else {
        Err(AppError::NotFound(format!("Cart line {product_id}")))
    }
}

#[allow(clippy::print_stdout)]
fn print_cart(cart: &CartStore) {
    if cart.is_empty() {
        println!("Your cart is empty");
    }

    for item in cart.items() {
        let mark = if item.is_selected { "x" } else { " " };
        let was = if item.product.is_discounted() {
            format!(" (was {})", item.product.original_price)
        } else {
            String::new()
        };
        println!(
            "[{mark}] {:<12} {:<28} {:>3} x {}{was} = {}",
            item.id,
            item.product.name,
            item.quantity,
            item.product.price,
            item.line_total(),
        );
    }

    if !cart.add_ons().is_empty() {
        println!();
        println!("Add-ons:");
        for add_on in cart.add_ons() {
            println!(
                "    {:<12} {:<28} {} (was {})",
                add_on.id, add_on.name, add_on.discount_price, add_on.original_price
            );
        }
    }

    let totals = cart.totals();
    let discount = format!("-{}", totals.discount);
    println!();
    println!("Subtotal: {:>12}", totals.subtotal.display());
    println!("Shipping: {:>12}", totals.shipping_fee.display());
    println!("Discount: {discount:>12}");
    println!("Total:    {:>12}", totals.total.display());
}
