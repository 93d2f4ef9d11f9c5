//! Resource utilization models.

use std::collections::HashMap;

use dyn_clone::{clone_trait_object, DynClone};

/// A utilization model defines which fraction of the granted resource a workload actually consumes.
/// time - current simulation time, time_from_start - time since the workload started executing.
pub trait UtilizationModel: DynClone + Send + Sync {
    fn get_utilization(&self, time: f64, time_from_start: f64) -> f64;
}

clone_trait_object!(UtilizationModel);

/// Workload always consumes everything it is granted.
#[derive(Clone)]
pub struct FullUtilizationModel;

impl UtilizationModel for FullUtilizationModel {
    fn get_utilization(&self, _time: f64, _time_from_start: f64) -> f64 {
        1.
    }
}

/// Workload consumes a constant fraction of what it is granted.
#[derive(Clone)]
pub struct ConstantUtilizationModel {
    utilization: f64,
}

impl ConstantUtilizationModel {
    pub fn new(utilization: f64) -> Self {
        Self {
            utilization: utilization.clamp(0., 1.),
        }
    }
}

impl UtilizationModel for ConstantUtilizationModel {
    fn get_utilization(&self, _time: f64, _time_from_start: f64) -> f64 {
        self.utilization
    }
}

/// Splits `Name[key=value,...]` into the model name and its numeric parameters.
fn split_model_str(config_str: &str) -> Result<(&str, HashMap<&str, f64>), String> {
    let (name, rest) = match config_str.split_once('[') {
        Some((name, rest)) => (name, Some(rest)),
        None => (config_str, None),
    };
    let mut params = HashMap::new();
    if let Some(rest) = rest {
        let body = rest
            .strip_suffix(']')
            .ok_or_else(|| format!("unclosed parameter list: {}", config_str))?;
        for pair in body.split(',').filter(|p| !p.trim().is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| format!("parameter without value in {}: {}", config_str, pair))?;
            let value = value
                .trim()
                .parse::<f64>()
                .map_err(|e| format!("bad {} in {}: {}", key.trim(), config_str, e))?;
            params.insert(key.trim(), value);
        }
    }
    Ok((name.trim(), params))
}

/// Resolves model from config string, e.g. `Full` or `Constant[utilization=0.5]`.
pub fn utilization_model_resolver(config_str: &str) -> Result<Box<dyn UtilizationModel>, String> {
    let (name, params) = split_model_str(config_str)?;
    match name {
        "Full" => Ok(Box::new(FullUtilizationModel)),
        "Constant" => {
            let utilization = params
                .get("utilization")
                .ok_or_else(|| format!("missing utilization option: {}", config_str))?;
            Ok(Box::new(ConstantUtilizationModel::new(*utilization)))
        }
        _ => Err(format!("can't resolve utilization model: {}", config_str)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_models() {
        assert_eq!(utilization_model_resolver("Full").unwrap().get_utilization(5., 1.), 1.);
        let half = utilization_model_resolver("Constant[utilization=0.5]").unwrap();
        assert_eq!(half.get_utilization(0., 0.), 0.5);
        assert!(utilization_model_resolver("Constant").is_err());
        assert!(utilization_model_resolver("Stochastic").is_err());
    }

    #[test]
    fn model_strings_are_split() {
        let (name, params) = split_model_str(" Constant[utilization=0.8, scale = 2]").unwrap();
        assert_eq!(name, "Constant");
        assert_eq!(params.get("utilization"), Some(&0.8));
        assert_eq!(params.get("scale"), Some(&2.));
        assert!(split_model_str("Full").unwrap().1.is_empty());
        assert!(split_model_str("Constant[utilization=0.5").is_err());
        assert!(split_model_str("Constant[utilization=high]").is_err());
    }
}
