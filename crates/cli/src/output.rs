//! Terminal rendering.

#![allow(clippy::print_stdout)]

use tienda_client::SessionSnapshot;
use tienda_core::{Cart, OrderId, format_mxn};

pub fn line(message: &str) {
    println!("{message}");
}

pub fn signed_in(session: &SessionSnapshot) {
    if let Some(identity) = session.identity() {
        let role = if identity.is_admin() { "admin" } else { "customer" };
        println!("Signed in as {} ({role})", display_name(identity));
    }
}

pub fn whoami(session: &SessionSnapshot) {
    match session.identity() {
        Some(identity) => {
            let role = if identity.is_admin() { "admin" } else { "customer" };
            println!("{} <{}> ({role})", display_name(identity), identity.id);
        }
        None => println!("Not signed in"),
    }
}

pub fn cart(cart: &Cart) {
    if cart.is_empty() {
        println!("Your cart is empty");
        return;
    }

    for line in &cart.lines {
        let name = line.name.as_deref().unwrap_or_else(|| line.product.as_str());
        println!(
            "{:>4} x {name:<32} {:>16} {:>16}",
            line.quantity,
            format_mxn(line.unit_price),
            format_mxn(line.line_subtotal)
        );
    }
    println!("{:>4}   {:<32} {:>16} {:>16}", "", "Total", "", format_mxn(cart.total));
}

pub fn order_placed(id: Option<&OrderId>) {
    match id {
        Some(id) => println!("Order {id} placed"),
        None => println!("Order placed"),
    }
}

fn display_name(identity: &tienda_core::Identity) -> &str {
    if identity.display_name.is_empty() {
        identity.id.as_str()
    } else {
        &identity.display_name
    }
}
