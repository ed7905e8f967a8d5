use anyhow::{bail, Result};

/// Holliday-Segar daily maintenance fluid volume in ml.
///
/// 100 ml/kg for the first 10 kg, 50 ml/kg for the next 10 kg and 20 ml/kg
/// for every kg above 20.
pub fn daily_maintenance_ml(weight_kg: f64) -> Result<f64> {
    if !weight_kg.is_finite() || weight_kg <= 0.0 {
        bail!("Invalid weight: {weight_kg} kg (must be a positive number)");
    }

    let total = if weight_kg <= 10.0 {
        weight_kg * 100.0
    } else if weight_kg <= 20.0 {
        1000.0 + (weight_kg - 10.0) * 50.0
    } else {
        1500.0 + (weight_kg - 20.0) * 20.0
    };
    Ok(total)
}

pub fn format_requirement(total_ml: f64) -> String {
    format!("Estimated Daily Fluid Requirement: {total_ml:.0} ml/day")
}
