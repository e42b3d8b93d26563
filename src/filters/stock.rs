//! Stock expressions correlated to the outer `products p` row.
//!
//! Every expression reads the product's subcategory flags, so only the
//! ledger its shape makes authoritative ever contributes. The SQL is plain
//! enough to run unchanged on PostgreSQL and SQLite.

use crate::domain::value_objects::VariantShape;

const SIZE_LEDGER: &str = "(SELECT COALESCE(SUM(cs.quantity), 0) FROM color_size cs \
     JOIN sizes sz ON sz.id = cs.size_id WHERE sz.product_id = p.id)";
const COLOR_LEDGER: &str = "(SELECT COALESCE(SUM(cp.quantity), 0) FROM color_product cp \
     WHERE cp.product_id = p.id)";
const PLAIN_LEDGER: &str = "COALESCE(p.quantity, 0)";

/// Aggregate for one ledger, regardless of shape.
pub fn ledger(shape: VariantShape) -> &'static str {
    match shape {
        VariantShape::Plain => PLAIN_LEDGER,
        VariantShape::Color => COLOR_LEDGER,
        VariantShape::Size => SIZE_LEDGER,
    }
}

fn shape_condition(shape: VariantShape) -> &'static str {
    match shape {
        VariantShape::Size => "sc.has_size",
        VariantShape::Color => "sc.has_color AND NOT sc.has_size",
        VariantShape::Plain => "NOT sc.has_color AND NOT sc.has_size",
    }
}

/// The product's stock, resolved once by its shape.
pub fn resolved() -> String {
    format!(
        "(SELECT CASE WHEN {} THEN {} WHEN {} THEN {} ELSE {} END \
         FROM subcategories sc WHERE sc.id = p.subcategory_id)",
        shape_condition(VariantShape::Size),
        SIZE_LEDGER,
        shape_condition(VariantShape::Color),
        COLOR_LEDGER,
        PLAIN_LEDGER,
    )
}

/// One ledger's aggregate when the product uses that shape, 0 otherwise.
pub fn gated(shape: VariantShape) -> String {
    format!(
        "(SELECT CASE WHEN {} THEN {} ELSE 0 END FROM subcategories sc WHERE sc.id = p.subcategory_id)",
        shape_condition(shape),
        ledger(shape),
    )
}

/// Sort priority: size-color first, then product-color, then plain.
pub const SORT_PRIORITY: [VariantShape; 3] = [VariantShape::Size, VariantShape::Color, VariantShape::Plain];
