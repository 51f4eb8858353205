// src/services/cost_estimator.rs
//
// Estimador de custos de um rubro a partir de um tipo de serviço.
// Funções puras: tudo que vem do banco (template, preços, configurações) entra por parâmetro.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::{
    common::error::AppError,
    models::{
        budget::{EstimateResult, MaterialLine},
        catalog::{ServiceType, ServiceTypeMaterial},
        settings::BudgetSettings,
    },
};

// Unidades que só se compram inteiras
const DISCRETE_UNITS: &[&str] = &["un", "unidad", "bolsa", "balde"];

pub fn is_discrete_unit(unit: &str) -> bool {
    let unit = unit.trim().to_lowercase();
    DISCRETE_UNITS.contains(&unit.as_str())
}

/// Arredonda para cima: inteiro em unidades discretas, uma casa decimal nas contínuas.
/// É só para a quantidade exibida/gravada; o custo usa a quantidade bruta.
pub fn round_quantity(raw: Decimal, unit: &str) -> Decimal {
    if is_discrete_unit(unit) {
        raw.ceil()
    } else {
        let ten = Decimal::TEN;
        (raw * ten).ceil() / ten
    }
}

/// Arredonda para a unidade monetária inteira mais próxima.
pub fn round_currency(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// Linhas de material do template para a quantidade pedida.
pub fn material_lines(materials: &[ServiceTypeMaterial], quantity: Decimal) -> Vec<MaterialLine> {
    materials
        .iter()
        .map(|m| {
            let raw_quantity = m.quantity_per_unit * quantity;
            MaterialLine {
                material_id: Some(m.material_id),
                name: m.material_name.clone(),
                quantity: round_quantity(raw_quantity, &m.unit),
                raw_quantity,
                unit: m.unit.clone(),
                unit_price: m.unit_price,
                total: raw_quantity * m.unit_price,
                is_custom: false,
            }
        })
        .collect()
}

pub fn estimated_days(service_type: &ServiceType, quantity: Decimal) -> Decimal {
    match service_type.productivity_rate {
        Some(rate) if rate > Decimal::ZERO => quantity / rate,
        _ => Decimal::ZERO,
    }
}

fn labor_cost(service_type: &ServiceType, days: Decimal, settings: &BudgetSettings) -> Decimal {
    if days <= Decimal::ZERO {
        return Decimal::ZERO;
    }

    let per_day = service_type.labor_cost_per_day.unwrap_or(Decimal::ZERO);
    let charge_percent = if service_type.includes_social_charges {
        service_type.social_charges_percent
    } else {
        settings.social_charges_percent
    };

    days * per_day * (Decimal::ONE + charge_percent / Decimal::ONE_HUNDRED)
}

fn fixed_cost(days: Decimal, settings: &BudgetSettings) -> Decimal {
    match settings.monthly_fixed_cost {
        Some(monthly)
            if days > Decimal::ZERO && settings.working_days_per_month > Decimal::ZERO =>
        {
            monthly / settings.working_days_per_month * days
        }
        _ => Decimal::ZERO,
    }
}

/// Calcula materiais, mão de obra, prazo e custo fixo rateado de `quantity` unidades do serviço.
pub fn estimate(
    service_type: &ServiceType,
    materials: &[ServiceTypeMaterial],
    quantity: Decimal,
    settings: &BudgetSettings,
) -> Result<EstimateResult, AppError> {
    if quantity <= Decimal::ZERO {
        return Err(AppError::InvalidQuantity { quantity, max: None });
    }

    let lines = material_lines(materials, quantity);
    let raw_materials: Decimal = lines.iter().map(|l| l.total).sum();

    let days = estimated_days(service_type, quantity);
    let materials_cost = round_currency(raw_materials);
    let labor_cost = round_currency(labor_cost(service_type, days, settings));
    let fixed_cost = round_currency(fixed_cost(days, settings));

    Ok(EstimateResult {
        quantity,
        estimated_days: days,
        materials_cost,
        labor_cost,
        fixed_cost,
        subtotal: materials_cost + labor_cost + fixed_cost,
        materials: lines,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    pub(crate) fn service_type(productivity: Option<Decimal>, labor: Option<Decimal>) -> ServiceType {
        ServiceType {
            id: 1,
            name: "Mampostería".to_string(),
            unit: "m2".to_string(),
            productivity_rate: productivity,
            labor_cost_per_day: labor,
            social_charges_percent: Decimal::ZERO,
            includes_social_charges: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    pub(crate) fn template_material(
        material_id: i64,
        unit: &str,
        per_unit: Decimal,
        price: Decimal,
    ) -> ServiceTypeMaterial {
        ServiceTypeMaterial {
            id: material_id,
            service_type_id: 1,
            material_id,
            material_name: format!("Material {material_id}"),
            unit: unit.to_string(),
            unit_price: price,
            quantity_per_unit: per_unit,
            position: 0,
        }
    }

    #[test]
    fn masonry_scenario() {
        let st = service_type(Some(dec!(8)), Some(dec!(95000)));
        let materials = vec![template_material(7, "un", dec!(16), dec!(480))];

        let result = estimate(&st, &materials, dec!(20), &BudgetSettings::default()).unwrap();

        assert_eq!(result.materials_cost, dec!(153600));
        assert_eq!(result.estimated_days, dec!(2.5));
        assert_eq!(result.labor_cost, dec!(237500));
        assert_eq!(result.fixed_cost, Decimal::ZERO);
        assert_eq!(result.subtotal, dec!(391100));
        assert_eq!(result.materials[0].quantity, dec!(320));
    }

    #[test]
    fn discrete_units_round_up_to_whole_numbers() {
        assert_eq!(round_quantity(dec!(7.2), "un"), dec!(8));
        assert_eq!(round_quantity(dec!(7.2), " Bolsa "), dec!(8));
        assert_eq!(round_quantity(dec!(7), "balde"), dec!(7));
    }

    #[test]
    fn continuous_units_round_up_to_one_decimal() {
        assert_eq!(round_quantity(dec!(7.23), "kg"), dec!(7.3));
        assert_eq!(round_quantity(dec!(7.2), "m3"), dec!(7.2));
        assert_eq!(round_quantity(dec!(0.01), "lt"), dec!(0.1));
    }

    #[test]
    fn materials_cost_uses_raw_quantity() {
        let st = service_type(None, None);
        // 0.36 * 20 = 7.2 bolsas -> grava 8, mas custa 7.2
        let materials = vec![template_material(1, "bolsa", dec!(0.36), dec!(1000))];

        let result = estimate(&st, &materials, dec!(20), &BudgetSettings::default()).unwrap();

        assert_eq!(result.materials[0].quantity, dec!(8));
        assert_eq!(result.materials[0].raw_quantity, dec!(7.2));
        assert_eq!(result.materials_cost, dec!(7200));
    }

    #[test]
    fn missing_productivity_zeroes_duration_and_labor() {
        let st = service_type(None, Some(dec!(95000)));
        let materials = vec![template_material(1, "kg", dec!(2), dec!(100))];

        let result = estimate(&st, &materials, dec!(10), &BudgetSettings::default()).unwrap();

        assert_eq!(result.estimated_days, Decimal::ZERO);
        assert_eq!(result.labor_cost, Decimal::ZERO);
        assert_eq!(result.fixed_cost, Decimal::ZERO);
        assert_eq!(result.materials_cost, dec!(2000));
        assert_eq!(result.subtotal, dec!(2000));
    }

    #[test]
    fn non_positive_quantity_is_rejected() {
        let st = service_type(Some(dec!(8)), Some(dec!(95000)));

        let err = estimate(&st, &[], Decimal::ZERO, &BudgetSettings::default()).unwrap_err();
        assert!(matches!(err, AppError::InvalidQuantity { .. }));

        let err = estimate(&st, &[], dec!(-3), &BudgetSettings::default()).unwrap_err();
        assert!(matches!(err, AppError::InvalidQuantity { .. }));
    }

    #[test]
    fn global_social_charges_apply_when_rate_excludes_them() {
        let st = service_type(Some(dec!(10)), Some(dec!(100000)));
        let settings = BudgetSettings {
            social_charges_percent: dec!(50),
            ..BudgetSettings::default()
        };

        let result = estimate(&st, &[], dec!(10), &settings).unwrap();

        assert_eq!(result.labor_cost, dec!(150000));
    }

    #[test]
    fn own_social_charges_replace_global_percentage() {
        let mut st = service_type(Some(dec!(10)), Some(dec!(100000)));
        st.includes_social_charges = true;
        st.social_charges_percent = dec!(20);
        let settings = BudgetSettings {
            social_charges_percent: dec!(50),
            ..BudgetSettings::default()
        };

        let result = estimate(&st, &[], dec!(10), &settings).unwrap();

        assert_eq!(result.labor_cost, dec!(120000));
    }

    #[test]
    fn fixed_cost_is_prorated_by_working_days() {
        let st = service_type(Some(dec!(8)), Some(dec!(95000)));
        let settings = BudgetSettings {
            monthly_fixed_cost: Some(dec!(1100000)),
            working_days_per_month: dec!(22),
            ..BudgetSettings::default()
        };

        let result = estimate(&st, &[], dec!(20), &settings).unwrap();

        // 1.100.000 / 22 = 50.000 por dia * 2,5 dias
        assert_eq!(result.fixed_cost, dec!(125000));
        assert_eq!(result.subtotal, dec!(237500) + dec!(125000));
    }

    #[test]
    fn cost_components_are_rounded_to_whole_currency() {
        let st = service_type(Some(dec!(3)), Some(dec!(1000)));

        let result = estimate(&st, &[], dec!(20), &BudgetSettings::default()).unwrap();

        // 20/3 dias * 1000 = 6666,66...
        assert_eq!(result.labor_cost, dec!(6667));
        assert_eq!(result.subtotal, dec!(6667));
    }
}
