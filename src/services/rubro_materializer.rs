// src/services/rubro_materializer.rs
//
// Converte os itens de um orçamento aceito em rubros de obra.
// Os custos do orçamento ficam congelados; os materiais dos itens de template
// são recalculados com o template e os preços ATUAIS do catálogo.

use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::{
    models::{
        budget::{MaterialLine, QuotationItem},
        catalog::ServiceTypeMaterial,
        project::{NewProjectRubro, NewRubroMaterial},
    },
    services::cost_estimator,
};

fn copy_line(line: &MaterialLine) -> NewRubroMaterial {
    NewRubroMaterial {
        material_id: line.material_id,
        name: line.name.clone(),
        cantidad: line.quantity,
        unit: line.unit.clone(),
        unit_price: line.unit_price,
        total_cost: line.total,
    }
}

// A quantidade de obra é a arredondada (compra-se bolsa inteira), então o custo também.
fn derive_line(line: &MaterialLine) -> NewRubroMaterial {
    NewRubroMaterial {
        material_id: line.material_id,
        name: line.name.clone(),
        cantidad: line.quantity,
        unit: line.unit.clone(),
        unit_price: line.unit_price,
        total_cost: line.quantity * line.unit_price,
    }
}

fn rubro_materials(
    item: &QuotationItem,
    templates: &HashMap<i64, Vec<ServiceTypeMaterial>>,
) -> Vec<NewRubroMaterial> {
    let mut materials: Vec<NewRubroMaterial> = match item.service_type_id {
        Some(service_type_id) => match templates.get(&service_type_id) {
            Some(template) => cost_estimator::material_lines(template, item.quantity)
                .iter()
                .map(derive_line)
                .collect(),
            // Tipo de serviço apagado depois do orçamento: fica o snapshot do orçamento
            None => {
                tracing::warn!(
                    service_type_id,
                    item_id = item.id,
                    "Tipo de serviço não existe mais; usando materiais congelados do orçamento"
                );
                item.materials.iter().filter(|m| !m.is_custom).map(copy_line).collect()
            }
        },
        None => Vec::new(),
    };

    materials.extend(
        item.materials
            .iter()
            .filter(|m| m.is_custom || item.service_type_id.is_none())
            .map(copy_line),
    );

    materials.retain(|m| m.cantidad > Decimal::ZERO);
    materials
}

/// Um rubro por item, na ordem do orçamento.
pub fn materialize(
    items: &[QuotationItem],
    templates: &HashMap<i64, Vec<ServiceTypeMaterial>>,
) -> Vec<NewProjectRubro> {
    items
        .iter()
        .enumerate()
        .map(|(idx, item)| NewProjectRubro {
            position: idx as i32,
            service_type_id: item.service_type_id,
            description: item.description.clone(),
            quantity: item.quantity,
            unit: item.unit.clone(),
            estimated_days: item.estimated_days,
            materials_cost: item.materials_cost,
            labor_cost: item.labor_cost,
            fixed_cost: item.fixed_cost,
            subtotal: item.subtotal,
            materials: rubro_materials(item, templates),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::cost_estimator::tests::template_material;
    use rust_decimal_macros::dec;

    fn template_item(service_type_id: i64, quantity: Decimal) -> QuotationItem {
        QuotationItem {
            id: 10,
            quotation_id: 1,
            service_type_id: Some(service_type_id),
            description: "Muro 12cm".to_string(),
            quantity,
            unit: "m2".to_string(),
            estimated_days: dec!(2.5),
            materials_cost: dec!(153600),
            labor_cost: dec!(237500),
            fixed_cost: Decimal::ZERO,
            subtotal: dec!(391100),
            materials: vec![MaterialLine {
                material_id: Some(7),
                name: "Ladrillo".to_string(),
                quantity: dec!(320),
                raw_quantity: dec!(320),
                unit: "un".to_string(),
                unit_price: dec!(480),
                total: dec!(153600),
                is_custom: false,
            }],
            ..QuotationItem::default()
        }
    }

    fn custom_line(name: &str, quantity: Decimal, price: Decimal) -> MaterialLine {
        MaterialLine {
            material_id: None,
            name: name.to_string(),
            quantity,
            raw_quantity: quantity,
            unit: "gl".to_string(),
            unit_price: price,
            total: quantity * price,
            is_custom: true,
        }
    }

    #[test]
    fn cost_fields_are_copied_verbatim() {
        let items = vec![template_item(3, dec!(20))];
        let templates = HashMap::from([(3, vec![template_material(7, "un", dec!(16), dec!(480))])]);

        let rubros = materialize(&items, &templates);

        assert_eq!(rubros.len(), 1);
        let rubro = &rubros[0];
        assert_eq!(rubro.subtotal, dec!(391100));
        assert_eq!(rubro.labor_cost, dec!(237500));
        assert_eq!(rubro.quantity, dec!(20));
        assert_eq!(rubro.service_type_id, Some(3));
    }

    #[test]
    fn template_materials_use_current_catalog_prices() {
        let items = vec![template_item(3, dec!(20))];
        // O ladrilho subiu de 480 para 500 depois do orçamento
        let templates = HashMap::from([(3, vec![template_material(7, "un", dec!(16), dec!(500))])]);

        let rubros = materialize(&items, &templates);
        let material = &rubros[0].materials[0];

        assert_eq!(material.cantidad, dec!(320));
        assert_eq!(material.unit_price, dec!(500));
        assert_eq!(material.total_cost, dec!(160000));
        // O subtotal congelado não muda
        assert_eq!(rubros[0].subtotal, dec!(391100));
    }

    #[test]
    fn edited_template_replaces_quoted_material_list() {
        // Orçado com 16 ladrillos/m2; depois o template passou a 12/m2 + cal
        let items = vec![template_item(3, dec!(20))];
        let templates = HashMap::from([(
            3,
            vec![
                template_material(7, "un", dec!(12), dec!(480)),
                template_material(9, "kg", dec!(0.52), dec!(200)),
            ],
        )]);

        let rubros = materialize(&items, &templates);
        let materials = &rubros[0].materials;

        assert_eq!(materials.len(), 2);
        assert_eq!(materials[0].material_id, Some(7));
        assert_eq!(materials[0].cantidad, dec!(240));
        assert_eq!(materials[0].total_cost, dec!(115200));
        assert_eq!(materials[1].material_id, Some(9));
        assert_eq!(materials[1].cantidad, dec!(10.4));
        assert_eq!(materials[1].total_cost, dec!(2080));
        // Custos do orçamento continuam congelados
        assert_eq!(rubros[0].materials_cost, dec!(153600));
    }

    #[test]
    fn derived_quantities_are_rounded_for_purchase() {
        let items = vec![template_item(3, dec!(20))];
        let templates = HashMap::from([(3, vec![template_material(9, "bolsa", dec!(0.36), dec!(1000))])]);

        let rubros = materialize(&items, &templates);
        let material = &rubros[0].materials[0];

        assert_eq!(material.cantidad, dec!(8));
        assert_eq!(material.total_cost, dec!(8000));
    }

    #[test]
    fn custom_lines_are_copied_through() {
        let mut item = template_item(3, dec!(20));
        item.materials.push(custom_line("Flete", dec!(1), dec!(35000)));
        let templates = HashMap::from([(3, vec![template_material(7, "un", dec!(16), dec!(480))])]);

        let rubros = materialize(&[item], &templates);

        assert_eq!(rubros[0].materials.len(), 2);
        assert_eq!(rubros[0].materials[1].name, "Flete");
        assert_eq!(rubros[0].materials[1].total_cost, dec!(35000));
    }

    #[test]
    fn deleted_service_type_falls_back_to_frozen_lines() {
        let items = vec![template_item(3, dec!(20))];

        let rubros = materialize(&items, &HashMap::new());

        assert_eq!(rubros[0].materials.len(), 1);
        assert_eq!(rubros[0].materials[0].unit_price, dec!(480));
    }

    #[test]
    fn manual_items_without_materials_produce_empty_rubros() {
        let item = QuotationItem {
            description: "Limpieza final".to_string(),
            quantity: dec!(1),
            unit: "gl".to_string(),
            manual_price: Some(dec!(80000)),
            subtotal: dec!(80000),
            ..QuotationItem::default()
        };

        let rubros = materialize(&[item], &HashMap::new());

        assert!(rubros[0].materials.is_empty());
        assert_eq!(rubros[0].subtotal, dec!(80000));
    }

    #[test]
    fn rubros_keep_quotation_order() {
        let mut second = template_item(3, dec!(5));
        second.description = "Revoque".to_string();
        let items = vec![template_item(3, dec!(20)), second];

        let rubros = materialize(&items, &HashMap::new());

        assert_eq!(rubros[0].position, 0);
        assert_eq!(rubros[1].position, 1);
        assert_eq!(rubros[1].description, "Revoque");
    }
}
