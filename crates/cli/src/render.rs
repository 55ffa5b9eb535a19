//! Plain-text rendering of API records.

use std::fmt::Write as _;

use bazaar_admin::{AdminStats, Coupon, ManagedUser};
use bazaar_core::{CurrencyCode, Price};
use bazaar_storefront::checkout::CheckoutSummary;
use bazaar_storefront::models::{
    CartLine, Identity, Notification, Order, Product, Review, StockLevel, WishlistEntry,
};
use rust_decimal::Decimal;

pub fn money(amount: Decimal) -> String {
    Price::new(amount, CurrencyCode::TRY).display()
}

fn stock(level: StockLevel) -> String {
    match level {
        StockLevel::OutOfStock => "out of stock".to_string(),
        StockLevel::Low(n) => format!("only {n} left"),
        StockLevel::InStock => "in stock".to_string(),
    }
}

pub fn identity(identity: &Identity) -> String {
    let mut out = format!("{} <{}>\n", identity.display_name(), identity.email);
    let _ = writeln!(out, "  id:       {}", identity.id);
    let _ = writeln!(out, "  role:     {}", identity.role);
    let _ = writeln!(
        out,
        "  verified: {}",
        if identity.is_email_verified { "yes" } else { "no" }
    );
    out
}

pub fn product_row(product: &Product) -> String {
    let price = if product.discount_percentage() > 0 {
        format!(
            "{} (was {}, -{}%)",
            money(product.effective_price()),
            money(product.price),
            product.discount_percentage()
        )
    } else {
        money(product.price)
    };
    format!(
        "{:<10} {:<40} {price}  [{}]",
        product.id,
        product.name,
        stock(product.stock_level())
    )
}

pub fn product_detail(product: &Product, reviews: &[Review]) -> String {
    let mut out = product_row(product);
    out.push('\n');
    if !product.brand.is_empty() || !product.category.is_empty() {
        let _ = writeln!(out, "  {} / {}", product.brand, product.category);
    }
    if product.review_count > 0 {
        let _ = writeln!(
            out,
            "  rating {:.1} from {} reviews",
            product.rating, product.review_count
        );
    }
    if !product.description.is_empty() {
        let _ = writeln!(out, "\n{}", product.description.trim());
    }
    for (key, value) in &product.specifications {
        let _ = writeln!(out, "  {key}: {value}");
    }
    for review in reviews {
        let _ = writeln!(
            out,
            "  {} {}: {}",
            "*".repeat(usize::from(review.rating)),
            review.user_name,
            review.comment
        );
    }
    out
}

pub fn cart(lines: &[CartLine], total: Decimal, items: u32) -> String {
    if lines.is_empty() {
        return "Your cart is empty.\n".to_string();
    }
    let mut out = String::new();
    for line in lines {
        let _ = writeln!(
            out,
            "{:<10} {:<36} {:>3} x {:>10} = {}",
            line.id,
            line.product.name,
            line.quantity,
            money(line.product.effective_price()),
            money(line.line_total())
        );
    }
    let _ = writeln!(out, "{items} items, total {}", money(total));
    out
}

pub fn wishlist(entries: &[WishlistEntry]) -> String {
    if entries.is_empty() {
        return "Your wishlist is empty.\n".to_string();
    }
    entries
        .iter()
        .map(|entry| {
            format!(
                "{:<10} {:<40} {}\n",
                entry.product_id,
                entry.product.name,
                money(entry.product.effective_price())
            )
        })
        .collect()
}

pub fn notification(notification: &Notification) -> String {
    let marker = if notification.is_read { ' ' } else { '*' };
    format!(
        "{marker} [{}] {} {}: {}\n",
        notification.severity,
        notification.created_at.format("%Y-%m-%d %H:%M"),
        notification.title,
        notification.message
    )
}

pub fn order_row(order: &Order) -> String {
    let placed = order
        .created_at
        .map(|at| at.format("%Y-%m-%d").to_string())
        .unwrap_or_default();
    format!(
        "{:<10} {:<12} {:<10} {:>3} items  {}  {placed}",
        order.id,
        order.order_number,
        order.status,
        order.total_items(),
        money(order.total)
    )
}

pub fn order_detail(order: &Order) -> String {
    let mut out = order_row(order);
    out.push('\n');
    let _ = writeln!(out, "  payment: {}", order.payment_status);
    if let Some(tracking) = &order.tracking_number {
        let _ = writeln!(out, "  tracking: {tracking}");
    }
    if let Some(address) = &order.shipping_address {
        let _ = writeln!(
            out,
            "  ship to: {}, {}, {} {}",
            address.name, address.address, address.district, address.city
        );
    }
    for item in &order.items {
        let _ = writeln!(
            out,
            "  {:>3} x {:<36} {}",
            item.quantity,
            item.name,
            money(item.price)
        );
    }
    if order.can_cancel() {
        let _ = writeln!(out, "  (can be cancelled: bz orders cancel {})", order.id);
    }
    out
}

pub fn summary(summary: &CheckoutSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Subtotal: {}", money(summary.subtotal));
    if !summary.discount.is_zero() {
        let _ = writeln!(out, "Discount: -{}", money(summary.discount));
    }
    let shipping = if summary.has_free_shipping() {
        "free".to_string()
    } else {
        money(summary.shipping)
    };
    let _ = writeln!(out, "Shipping: {shipping}");
    let _ = writeln!(out, "Total:    {}", money(summary.total));
    if let Some(remaining) = summary.remaining_for_free_shipping {
        let _ = writeln!(out, "Add {} more for free shipping.", money(remaining));
    }
    out
}

pub fn stats(stats: &AdminStats) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Users:          {} (+{} today)", stats.total_users, stats.new_users_today);
    let _ = writeln!(out, "Products:       {} ({} low on stock)", stats.total_products, stats.low_stock_products);
    let _ = writeln!(out, "Orders:         {} ({} pending)", stats.total_orders, stats.pending_orders);
    let _ = writeln!(out, "Revenue:        {}", money(stats.total_revenue));
    let _ = writeln!(out, "This month:     {}", money(stats.monthly_revenue));
    out
}

pub fn user_row(user: &ManagedUser) -> String {
    format!(
        "{:<10} {:<28} {:<32} {:<8} {}",
        user.id,
        user.full_name,
        user.email,
        user.role,
        if user.is_active { "active" } else { "banned" }
    )
}

pub fn coupon_row(coupon: &Coupon) -> String {
    let value = match coupon.kind {
        bazaar_core::CouponKind::Percentage => format!("{}%", coupon.value.normalize()),
        bazaar_core::CouponKind::Fixed => money(coupon.value),
    };
    let usage = coupon.usage_limit.map_or_else(
        || format!("{} used", coupon.used_count),
        |limit| format!("{}/{limit} used", coupon.used_count),
    );
    format!(
        "{:<16} {:>10}  {usage}  {}",
        coupon.code,
        value,
        if coupon.is_active { "active" } else { "inactive" }
    )
}

pub fn review_row(review: &Review) -> String {
    let state = if review.is_reported {
        format!("reported x{}", review.report_count)
    } else if review.is_approved {
        "approved".to_string()
    } else {
        "pending".to_string()
    };
    format!(
        "{:<10} {} {:<20} {:<10} {}",
        review.id,
        "*".repeat(usize::from(review.rating)),
        review.user_name,
        state,
        review.comment
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bazaar_core::ShippingPolicy;

    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_money_uses_two_decimals() {
        assert_eq!(money(dec("29.9")), "₺29.90");
    }

    #[test]
    fn test_summary_mentions_free_shipping_gap() {
        let text = summary(&CheckoutSummary::compute(
            dec("210"),
            &ShippingPolicy::default(),
            Decimal::ZERO,
        ));
        assert!(text.contains("Shipping: ₺29.90"));
        assert!(text.contains("Add ₺290.00 more"));
    }

    #[test]
    fn test_empty_cart() {
        assert_eq!(cart(&[], Decimal::ZERO, 0), "Your cart is empty.\n");
    }
}
