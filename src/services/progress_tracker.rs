// src/services/progress_tracker.rs
//
// Máquina de estados do avanço de obra.
// As funções `plan_*` recebem o rubro já travado (com os materiais) e devolvem
// tudo que precisa ser gravado: o novo estado + os lançamentos de caixa.
// Quem chama (ProgressService) grava o plano inteiro numa única transação.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::{
    common::error::AppError,
    models::{
        finance::{NewCashMovement, CATEGORY_LABOR, CATEGORY_MATERIALS, CATEGORY_RUBRO_PROGRESS},
        project::{
            percent_of, MaterialProgress, ProgressState, ProjectProgress, ProjectRubro,
            RubroMaterial, RubroProgress,
        },
    },
};

#[derive(Debug, Clone, PartialEq)]
pub struct LaborApplication {
    pub applied_at: DateTime<Utc>,
    // None quando o custo de mão de obra é zero
    pub movement: Option<NewCashMovement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MaterialApplication {
    pub material: RubroMaterial,
    pub movement: NewCashMovement,
    pub all_materials_applied: bool,
    pub labor: Option<LaborApplication>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RubroApplication {
    pub cantidad_aplicada: Decimal,
    pub movement: Option<NewCashMovement>,
    pub is_complete: bool,
    pub labor: Option<LaborApplication>,
}

fn labor_application(rubro: &ProjectRubro, now: DateTime<Utc>) -> LaborApplication {
    let movement = (rubro.labor_cost > Decimal::ZERO).then(|| {
        NewCashMovement::expense(
            rubro.project_id,
            rubro.labor_cost,
            CATEGORY_LABOR,
            format!("Mão de obra - {}", rubro.description),
        )
    });

    LaborApplication { applied_at: now, movement }
}

// Disparo automático: só quando há custo de mão de obra ainda não aplicado
fn auto_labor(rubro: &ProjectRubro, complete: bool, now: DateTime<Utc>) -> Option<LaborApplication> {
    (complete && rubro.labor_pending()).then(|| labor_application(rubro, now))
}

/// Casas decimais das colunas de quantidade (`NUMERIC(14, 4)`).
pub const QUANTITY_SCALE: u32 = 4;

// O banco arredondaria em silêncio o que passar disso
fn fits_quantity_scale(quantity: Decimal) -> bool {
    quantity.normalize().scale() <= QUANTITY_SCALE
}

/// Quantidade a aplicar: > 0 e representável na coluna. `max` só quando o material é conhecido.
pub fn check_apply_quantity(quantity: Decimal, max: Option<Decimal>) -> Result<(), AppError> {
    if quantity <= Decimal::ZERO || !fits_quantity_scale(quantity) {
        return Err(AppError::InvalidQuantity { quantity, max });
    }
    Ok(())
}

/// ApplyMaterial: aplica `quantity` de um material do rubro.
pub fn plan_apply_material(
    rubro: &ProjectRubro,
    material_id: i64,
    quantity: Decimal,
    now: DateTime<Utc>,
) -> Result<MaterialApplication, AppError> {
    let current = rubro.materials.iter().find(|m| m.id == material_id);

    // 1. Quantidade positiva e com a escala da coluna, antes de qualquer busca
    check_apply_quantity(quantity, current.map(RubroMaterial::remaining))?;

    let current =
        current.ok_or_else(|| AppError::ResourceNotFound(format!("Material {material_id}")))?;
    let remaining = current.remaining();

    // 2. Não pode passar do que falta
    if quantity > remaining {
        return Err(AppError::ExceedsRemaining { requested: quantity, remaining });
    }

    // 3. Novo estado
    let before = current.cantidad_aplicada;
    let after = before + quantity;
    let was_complete = current.is_complete();

    let mut material = current.clone();
    material.cantidad_aplicada = after;
    material.sync_applied_flag();
    if material.applied && !was_complete {
        material.applied_at = Some(now);
    }

    // 4. Custo do incremento pelo preço unitário (não por total/cantidad arredondado)
    let cost = quantity * material.unit_price;
    let note = format!(
        "{}: {} → {} de {} {} ({}% → {}%)",
        material.name,
        before.normalize(),
        after.normalize(),
        material.cantidad.normalize(),
        material.unit,
        percent_of(before, material.cantidad).normalize(),
        percent_of(after, material.cantidad).normalize(),
    );
    let movement = NewCashMovement::expense(rubro.project_id, cost, CATEGORY_MATERIALS, note);

    // 5. Todos os materiais do rubro concluídos? (comparação, nunca a flag gravada)
    let all_materials_applied = rubro
        .materials
        .iter()
        .map(|m| if m.id == material_id { &material } else { m })
        .all(RubroMaterial::is_complete);

    let labor = auto_labor(rubro, all_materials_applied, now);

    Ok(MaterialApplication { material, movement, all_materials_applied, labor })
}

/// ApplyRubroProgress: para rubros sem materiais discretos, informa a nova quantidade aplicada.
pub fn plan_rubro_progress(
    rubro: &ProjectRubro,
    new_cantidad_aplicada: Decimal,
    now: DateTime<Utc>,
) -> Result<RubroApplication, AppError> {
    if rubro.has_materials() {
        return Err(AppError::RubroHasMaterials { rubro_id: rubro.id });
    }

    if new_cantidad_aplicada < Decimal::ZERO
        || new_cantidad_aplicada > rubro.quantity
        || !fits_quantity_scale(new_cantidad_aplicada)
    {
        return Err(AppError::InvalidQuantity {
            quantity: new_cantidad_aplicada,
            max: Some(rubro.quantity),
        });
    }

    let previous = rubro.cantidad_aplicada;
    let delta = new_cantidad_aplicada - previous;
    let unit_cost = if rubro.quantity > Decimal::ZERO {
        rubro.subtotal / rubro.quantity
    } else {
        Decimal::ZERO
    };

    let movement = (delta > Decimal::ZERO).then(|| {
        let note = format!(
            "{}: {} → {} de {} {} ({}%)",
            rubro.description,
            previous.normalize(),
            new_cantidad_aplicada.normalize(),
            rubro.quantity.normalize(),
            rubro.unit,
            percent_of(new_cantidad_aplicada, rubro.quantity).normalize(),
        );
        NewCashMovement::expense(rubro.project_id, delta * unit_cost, CATEGORY_RUBRO_PROGRESS, note)
    });

    let is_complete = new_cantidad_aplicada >= rubro.quantity;
    let labor = auto_labor(rubro, is_complete, now);

    Ok(RubroApplication { cantidad_aplicada: new_cantidad_aplicada, movement, is_complete, labor })
}

/// ApplyLabor manual. Mão de obra é tudo ou nada e nunca é desfeita.
pub fn plan_apply_labor(rubro: &ProjectRubro, now: DateTime<Utc>) -> Result<LaborApplication, AppError> {
    if rubro.mano_obra_applied {
        return Err(AppError::AlreadyApplied { rubro_id: rubro.id });
    }
    Ok(labor_application(rubro, now))
}

// =============================================================================
//  VISÃO DE AVANÇO
// =============================================================================

fn material_progress(material: &RubroMaterial) -> MaterialProgress {
    MaterialProgress {
        material_id: material.id,
        name: material.name.clone(),
        unit: material.unit.clone(),
        cantidad: material.cantidad,
        cantidad_aplicada: material.cantidad_aplicada,
        remaining: material.remaining(),
        percent: percent_of(material.cantidad_aplicada, material.cantidad),
        state: material.progress_state(),
    }
}

pub fn rubro_progress(rubro: &ProjectRubro) -> RubroProgress {
    let labor_executed = if rubro.mano_obra_applied { rubro.labor_cost } else { Decimal::ZERO };

    let (state, percent, executed) = if rubro.has_materials() {
        let total: Decimal = rubro.materials.iter().map(|m| m.cantidad * m.unit_price).sum();
        let applied: Decimal = rubro
            .materials
            .iter()
            .map(|m| m.cantidad_aplicada * m.unit_price)
            .sum();

        let state = if rubro.all_materials_applied() {
            ProgressState::Applied
        } else if rubro.materials.iter().any(|m| m.cantidad_aplicada > Decimal::ZERO) {
            ProgressState::Partial
        } else {
            ProgressState::Pending
        };

        (state, percent_of(applied, total), applied)
    } else {
        let executed = if rubro.quantity > Decimal::ZERO {
            rubro.cantidad_aplicada * rubro.subtotal / rubro.quantity
        } else {
            Decimal::ZERO
        };
        (
            rubro.progress_state(),
            percent_of(rubro.cantidad_aplicada, rubro.quantity),
            executed,
        )
    };

    RubroProgress {
        rubro_id: rubro.id,
        description: rubro.description.clone(),
        state,
        percent,
        mano_obra_applied: rubro.mano_obra_applied,
        executed_cost: (executed + labor_executed).round_dp(2),
        budgeted_cost: rubro.subtotal,
        materials: rubro.materials.iter().map(material_progress).collect(),
    }
}

pub fn project_progress(project_id: i64, rubros: &[ProjectRubro]) -> ProjectProgress {
    let rubros: Vec<RubroProgress> = rubros.iter().map(rubro_progress).collect();
    let budgeted_cost: Decimal = rubros.iter().map(|r| r.budgeted_cost).sum();
    let executed_cost: Decimal = rubros.iter().map(|r| r.executed_cost).sum();

    ProjectProgress {
        project_id,
        budgeted_cost,
        executed_cost,
        percent: percent_of(executed_cost, budgeted_cost),
        rubros,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::finance::MovementType;
    use rust_decimal_macros::dec;

    fn material(id: i64, cantidad: Decimal, unit_price: Decimal) -> RubroMaterial {
        RubroMaterial {
            id,
            rubro_id: 1,
            material_id: Some(id * 100),
            name: format!("Material {id}"),
            cantidad,
            unit: "un".to_string(),
            unit_price,
            total_cost: cantidad * unit_price,
            ..RubroMaterial::default()
        }
    }

    fn rubro(labor_cost: Decimal, materials: Vec<RubroMaterial>) -> ProjectRubro {
        ProjectRubro {
            id: 1,
            project_id: 42,
            description: "Muro 12cm".to_string(),
            quantity: dec!(20),
            unit: "m2".to_string(),
            labor_cost,
            subtotal: dec!(100000) + labor_cost,
            materials,
            ..ProjectRubro::default()
        }
    }

    // Grava o plano no rubro em memória, como o ProgressService faz no banco.
    fn commit_material(rubro: &mut ProjectRubro, plan: &MaterialApplication) {
        let slot = rubro.materials.iter_mut().find(|m| m.id == plan.material.id).unwrap();
        *slot = plan.material.clone();
        if let Some(labor) = &plan.labor {
            rubro.mano_obra_applied = true;
            rubro.mano_obra_applied_at = Some(labor.applied_at);
        }
    }

    #[test]
    fn partial_then_complete_with_labor_auto_applied() {
        let mut r = rubro(dec!(50000), vec![material(1, dec!(10), dec!(480))]);
        let now = Utc::now();

        let first = plan_apply_material(&r, 1, dec!(5), now).unwrap();
        assert_eq!(first.movement.amount, dec!(2400));
        assert_eq!(first.movement.movement_type, MovementType::Expense);
        assert!(!first.material.applied);
        assert!(first.material.applied_at.is_none());
        assert!(!first.all_materials_applied);
        assert!(first.labor.is_none());
        commit_material(&mut r, &first);

        let second = plan_apply_material(&r, 1, dec!(5), now).unwrap();
        assert_eq!(second.movement.amount, dec!(2400));
        assert!(second.material.applied);
        assert_eq!(second.material.applied_at, Some(now));
        assert!(second.all_materials_applied);

        let labor = second.labor.clone().expect("labor auto-applied");
        let labor_movement = labor.movement.expect("labor expense");
        assert_eq!(labor_movement.amount, dec!(50000));
        assert_eq!(labor_movement.category, CATEGORY_LABOR);
        commit_material(&mut r, &second);
        assert!(r.mano_obra_applied);
    }

    #[test]
    fn note_records_before_and_after() {
        let r = rubro(Decimal::ZERO, vec![material(1, dec!(10), dec!(480))]);

        let plan = plan_apply_material(&r, 1, dec!(5), Utc::now()).unwrap();
        let note = plan.movement.note.unwrap();

        assert!(note.contains("0 → 5 de 10"), "{note}");
        assert!(note.contains("0% → 50%"), "{note}");
    }

    #[test]
    fn non_positive_quantity_is_rejected() {
        let r = rubro(Decimal::ZERO, vec![material(1, dec!(10), dec!(480))]);

        for q in [Decimal::ZERO, dec!(-1)] {
            let err = plan_apply_material(&r, 1, q, Utc::now()).unwrap_err();
            assert!(matches!(err, AppError::InvalidQuantity { .. }));
        }
    }

    #[test]
    fn exceeding_remaining_is_rejected_with_context() {
        let mut m = material(1, dec!(10), dec!(480));
        m.cantidad_aplicada = dec!(7);
        let r = rubro(Decimal::ZERO, vec![m]);

        let err = plan_apply_material(&r, 1, dec!(3.5), Utc::now()).unwrap_err();

        match err {
            AppError::ExceedsRemaining { requested, remaining } => {
                assert_eq!(requested, dec!(3.5));
                assert_eq!(remaining, dec!(3));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unknown_material_is_not_found() {
        let r = rubro(Decimal::ZERO, vec![material(1, dec!(10), dec!(480))]);

        let err = plan_apply_material(&r, 99, dec!(1), Utc::now()).unwrap_err();

        assert!(matches!(err, AppError::ResourceNotFound(_)));
    }

    #[test]
    fn quantity_is_checked_before_material_lookup() {
        let r = rubro(Decimal::ZERO, vec![material(1, dec!(10), dec!(480))]);

        let unknown = plan_apply_material(&r, 99, Decimal::ZERO, Utc::now()).unwrap_err();
        assert!(matches!(unknown, AppError::InvalidQuantity { max: None, .. }));

        let known = plan_apply_material(&r, 1, dec!(-2), Utc::now()).unwrap_err();
        match known {
            AppError::InvalidQuantity { max, .. } => assert_eq!(max, Some(dec!(10))),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn quantity_finer_than_column_scale_is_rejected() {
        let mut r = rubro(dec!(50000), vec![material(1, dec!(10), dec!(480))]);

        // 9.99996 viraria 10.0000 no banco com applied = false
        let err = plan_apply_material(&r, 1, dec!(9.99996), Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::InvalidQuantity { .. }));
        assert_eq!(r.materials[0].cantidad_aplicada, Decimal::ZERO);

        // Zeros à direita não contam como casas
        let plan = plan_apply_material(&r, 1, dec!(9.999900), Utc::now()).unwrap();
        commit_material(&mut r, &plan);
        let last = plan_apply_material(&r, 1, dec!(0.0001), Utc::now()).unwrap();

        assert!(last.material.applied);
        assert!(last.all_materials_applied);
        assert!(last.labor.is_some());
    }

    #[test]
    fn rubro_progress_finer_than_column_scale_is_rejected() {
        let r = rubro(dec!(20000), vec![]);

        let err = plan_rubro_progress(&r, dec!(19.99999), Utc::now()).unwrap_err();

        assert!(matches!(err, AppError::InvalidQuantity { max: Some(_), .. }));
        assert!(plan_rubro_progress(&r, dec!(19.9999), Utc::now()).is_ok());
    }

    #[test]
    fn applied_quantity_is_monotonic_and_bounded() {
        let mut r = rubro(Decimal::ZERO, vec![material(1, dec!(10), dec!(480))]);
        let steps = [dec!(2.5), dec!(20), dec!(0.5), dec!(-1), dec!(4), dec!(3.1), dec!(3)];
        let mut last = Decimal::ZERO;

        for q in steps {
            if let Ok(plan) = plan_apply_material(&r, 1, q, Utc::now()) {
                commit_material(&mut r, &plan);
            }
            let applied = r.materials[0].cantidad_aplicada;
            assert!(applied >= last);
            assert!(applied <= r.materials[0].cantidad);
            assert_eq!(r.materials[0].applied, applied >= r.materials[0].cantidad);
            last = applied;
        }

        assert_eq!(last, dec!(10));
    }

    #[test]
    fn ledger_increments_add_up_to_applied_value() {
        let mut r = rubro(Decimal::ZERO, vec![material(1, dec!(7), dec!(333.33))]);
        let mut posted = Decimal::ZERO;

        for q in [dec!(1), dec!(2.5), dec!(0.25), dec!(3.25)] {
            let plan = plan_apply_material(&r, 1, q, Utc::now()).unwrap();
            posted += plan.movement.amount;
            commit_material(&mut r, &plan);
        }

        let expected = r.materials[0].cantidad_aplicada * r.materials[0].unit_price;
        assert!((posted - expected).abs() <= dec!(0.02), "{posted} vs {expected}");
    }

    #[test]
    fn labor_waits_for_every_material() {
        let mut r = rubro(
            dec!(50000),
            vec![material(1, dec!(2), dec!(100)), material(2, dec!(3), dec!(100))],
        );

        let plan = plan_apply_material(&r, 1, dec!(2), Utc::now()).unwrap();
        assert!(!plan.all_materials_applied);
        assert!(plan.labor.is_none());
        commit_material(&mut r, &plan);

        let plan = plan_apply_material(&r, 2, dec!(3), Utc::now()).unwrap();
        assert!(plan.all_materials_applied);
        assert!(plan.labor.is_some());
    }

    #[test]
    fn zero_labor_cost_never_auto_applies() {
        let mut r = rubro(Decimal::ZERO, vec![material(1, dec!(1), dec!(100))]);

        let plan = plan_apply_material(&r, 1, dec!(1), Utc::now()).unwrap();
        commit_material(&mut r, &plan);

        assert!(plan.all_materials_applied);
        assert!(plan.labor.is_none());
        assert!(!r.mano_obra_applied);
    }

    #[test]
    fn labor_already_applied_is_not_reapplied() {
        let mut r = rubro(dec!(50000), vec![material(1, dec!(2), dec!(100))]);
        r.mano_obra_applied = true;

        let plan = plan_apply_material(&r, 1, dec!(2), Utc::now()).unwrap();

        assert!(plan.all_materials_applied);
        assert!(plan.labor.is_none());
    }

    #[test]
    fn manual_labor_is_idempotent() {
        let mut r = rubro(dec!(50000), vec![]);

        let first = plan_apply_labor(&r, Utc::now()).unwrap();
        assert_eq!(first.movement.as_ref().unwrap().amount, dec!(50000));
        r.mano_obra_applied = true;

        let err = plan_apply_labor(&r, Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::AlreadyApplied { rubro_id: 1 }));
    }

    #[test]
    fn manual_labor_without_cost_posts_nothing() {
        let r = rubro(Decimal::ZERO, vec![]);

        let plan = plan_apply_labor(&r, Utc::now()).unwrap();

        assert!(plan.movement.is_none());
    }

    #[test]
    fn rubro_progress_posts_proportional_increment() {
        // subtotal 100000 em 20 m2 = 5000 por m2
        let mut r = rubro(Decimal::ZERO, vec![]);
        r.cantidad_aplicada = dec!(4);

        let plan = plan_rubro_progress(&r, dec!(10), Utc::now()).unwrap();

        assert_eq!(plan.movement.unwrap().amount, dec!(30000));
        assert!(!plan.is_complete);
        assert!(plan.labor.is_none());
    }

    #[test]
    fn rubro_progress_completion_triggers_labor() {
        let r = rubro(dec!(20000), vec![]);

        let plan = plan_rubro_progress(&r, dec!(20), Utc::now()).unwrap();

        assert!(plan.is_complete);
        assert_eq!(plan.labor.unwrap().movement.unwrap().amount, dec!(20000));
    }

    #[test]
    fn rubro_progress_without_increase_posts_no_movement() {
        let mut r = rubro(Decimal::ZERO, vec![]);
        r.cantidad_aplicada = dec!(10);

        let same = plan_rubro_progress(&r, dec!(10), Utc::now()).unwrap();
        let lower = plan_rubro_progress(&r, dec!(6), Utc::now()).unwrap();

        assert!(same.movement.is_none());
        assert!(lower.movement.is_none());
        assert_eq!(lower.cantidad_aplicada, dec!(6));
    }

    #[test]
    fn rubro_progress_out_of_range_is_rejected() {
        let r = rubro(Decimal::ZERO, vec![]);

        for value in [dec!(-0.1), dec!(20.5)] {
            let err = plan_rubro_progress(&r, value, Utc::now()).unwrap_err();
            assert!(matches!(err, AppError::InvalidQuantity { max: Some(_), .. }));
        }
    }

    #[test]
    fn rubro_progress_on_rubro_with_materials_is_rejected() {
        let r = rubro(Decimal::ZERO, vec![material(1, dec!(1), dec!(1))]);

        let err = plan_rubro_progress(&r, dec!(1), Utc::now()).unwrap_err();

        assert!(matches!(err, AppError::RubroHasMaterials { rubro_id: 1 }));
    }

    #[test]
    fn rubro_with_zero_quantity_has_zero_unit_cost() {
        let mut r = rubro(Decimal::ZERO, vec![]);
        r.quantity = Decimal::ZERO;

        let plan = plan_rubro_progress(&r, Decimal::ZERO, Utc::now()).unwrap();

        assert!(plan.movement.is_none());
        assert!(plan.is_complete);
    }

    #[test]
    fn progress_view_reports_states_and_costs() {
        let mut partial = material(1, dec!(10), dec!(100));
        partial.cantidad_aplicada = dec!(5);
        let pending = material(2, dec!(10), dec!(100));
        let r = rubro(dec!(50000), vec![partial, pending]);

        let view = rubro_progress(&r);

        assert_eq!(view.state, ProgressState::Partial);
        assert_eq!(view.percent, dec!(25));
        assert_eq!(view.executed_cost, dec!(500));
        assert_eq!(view.materials[0].state, ProgressState::Partial);
        assert_eq!(view.materials[1].state, ProgressState::Pending);
        assert_eq!(view.materials[0].remaining, dec!(5));
    }

    #[test]
    fn project_progress_sums_rubros() {
        let mut done = rubro(dec!(50000), vec![]);
        done.cantidad_aplicada = dec!(20);
        done.mano_obra_applied = true;
        let todo = rubro(Decimal::ZERO, vec![]);

        let view = project_progress(42, &[done, todo]);

        assert_eq!(view.budgeted_cost, dec!(250000));
        // 150000 (avanço) + 50000 (mão de obra)
        assert_eq!(view.executed_cost, dec!(200000));
        assert_eq!(view.rubros[0].state, ProgressState::Applied);
        assert_eq!(view.rubros[1].state, ProgressState::Pending);
    }
}
