// src/services/quotation_aggregator.rs

use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::models::budget::{CommercialLine, PurchasingLine, QuotationItem, QuotationSummary};

pub fn margin_amount(cost_base: Decimal, apply_margin: bool, margin_percent: Decimal) -> Decimal {
    if apply_margin {
        cost_base * margin_percent / Decimal::ONE_HUNDRED
    } else {
        Decimal::ZERO
    }
}

/// Custo base, margem, total e lista de compras consolidada.
pub fn aggregate(
    items: &[QuotationItem],
    apply_margin: bool,
    margin_percent: Decimal,
) -> QuotationSummary {
    let cost_base: Decimal = items.iter().map(|i| i.subtotal).sum();
    let margin = margin_amount(cost_base, apply_margin, margin_percent);

    QuotationSummary {
        cost_base,
        margin,
        total: cost_base + margin,
        purchasing_list: purchasing_list(items),
    }
}

/// Redistribui a margem proporcionalmente ao subtotal de cada item.
/// A soma dos preços finais é o total do orçamento e o percentual não aparece.
pub fn commercial_preview(items: &[QuotationItem], summary: &QuotationSummary) -> Vec<CommercialLine> {
    items
        .iter()
        .map(|item| {
            let final_price = if summary.cost_base > Decimal::ZERO {
                item.subtotal + item.subtotal / summary.cost_base * summary.margin
            } else {
                item.subtotal
            };

            CommercialLine {
                item_id: item.id,
                description: item.description.clone(),
                quantity: item.quantity,
                unit: item.unit.clone(),
                final_price,
            }
        })
        .collect()
}

/// Junta as linhas de material de todos os itens por material.
/// Linhas avulsas sem material de catálogo não se fundem com nada.
pub fn purchasing_list(items: &[QuotationItem]) -> Vec<PurchasingLine> {
    let mut lines: Vec<PurchasingLine> = Vec::new();
    let mut by_material: HashMap<i64, usize> = HashMap::new();

    for line in items.iter().flat_map(|i| i.materials.iter()) {
        let existing = line.material_id.and_then(|id| by_material.get(&id).copied());

        match existing {
            Some(idx) => {
                lines[idx].quantity += line.quantity;
                lines[idx].total += line.total;
            }
            None => {
                if let Some(id) = line.material_id {
                    by_material.insert(id, lines.len());
                }
                lines.push(PurchasingLine {
                    material_id: line.material_id,
                    name: line.name.clone(),
                    unit: line.unit.clone(),
                    quantity: line.quantity,
                    total: line.total,
                });
            }
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::budget::MaterialLine;
    use rust_decimal_macros::dec;

    fn item(id: i64, subtotal: Decimal) -> QuotationItem {
        QuotationItem {
            id,
            quotation_id: 1,
            description: format!("Rubro {id}"),
            quantity: dec!(1),
            unit: "gl".to_string(),
            manual_price: Some(subtotal),
            subtotal,
            ..QuotationItem::default()
        }
    }

    fn line(material_id: Option<i64>, quantity: Decimal, total: Decimal) -> MaterialLine {
        MaterialLine {
            material_id,
            name: "Cemento".to_string(),
            quantity,
            raw_quantity: quantity,
            unit: "bolsa".to_string(),
            unit_price: total / quantity,
            total,
            is_custom: material_id.is_none(),
        }
    }

    #[test]
    fn margin_is_added_over_cost_base() {
        let items = vec![item(1, dec!(391100)), item(2, dec!(108900))];

        let summary = aggregate(&items, true, dec!(25));

        assert_eq!(summary.cost_base, dec!(500000));
        assert_eq!(summary.margin, dec!(125000));
        assert_eq!(summary.total, dec!(625000));
    }

    #[test]
    fn margin_can_be_disabled() {
        let items = vec![item(1, dec!(1000))];

        let summary = aggregate(&items, false, dec!(25));

        assert_eq!(summary.margin, Decimal::ZERO);
        assert_eq!(summary.total, dec!(1000));
    }

    #[test]
    fn commercial_preview_sums_to_total() {
        let items = vec![item(1, dec!(333)), item(2, dec!(1000)), item(3, dec!(17))];
        let summary = aggregate(&items, true, dec!(17.5));

        let preview = commercial_preview(&items, &summary);
        let sum: Decimal = preview.iter().map(|l| l.final_price).sum();

        assert!((sum - summary.total).abs() < dec!(0.000001));
        // Cada item recebe a margem na proporção do seu subtotal
        assert!(preview[1].final_price > preview[0].final_price);
    }

    #[test]
    fn commercial_preview_with_zero_cost_base_keeps_subtotals() {
        let items = vec![item(1, Decimal::ZERO)];
        let summary = aggregate(&items, true, dec!(30));

        let preview = commercial_preview(&items, &summary);

        assert_eq!(preview[0].final_price, Decimal::ZERO);
    }

    #[test]
    fn purchasing_list_merges_by_material() {
        let mut a = item(1, dec!(10));
        a.materials = vec![line(Some(5), dec!(8), dec!(8000))];
        let mut b = item(2, dec!(10));
        b.materials = vec![
            line(Some(5), dec!(3), dec!(3000)),
            line(Some(6), dec!(1), dec!(50)),
        ];

        let list = purchasing_list(&[a, b]);

        assert_eq!(list.len(), 2);
        assert_eq!(list[0].material_id, Some(5));
        assert_eq!(list[0].quantity, dec!(11));
        assert_eq!(list[0].total, dec!(11000));
        assert_eq!(list[1].material_id, Some(6));
    }

    #[test]
    fn custom_lines_without_material_stay_separate() {
        let mut a = item(1, dec!(10));
        a.materials = vec![line(None, dec!(2), dec!(200)), line(None, dec!(2), dec!(200))];

        let list = purchasing_list(&[a]);

        assert_eq!(list.len(), 2);
    }
}
