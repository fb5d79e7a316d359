use serde::{Deserialize, Serialize};

use crate::error::{InferenceError, InferenceResult};

/// Slope used by `leaky_relu` and `prelu` when a record does not give one.
pub const DEFAULT_LEAKY_ALPHA: f64 = 0.01;
/// Scale used by `elu` when a record does not give one.
pub const DEFAULT_ELU_ALPHA: f64 = 1.0;

/// Shape parameters of the neuroplast activation: a sigmoid ramp multiplied
/// by a gaussian plateau.
///
/// - `alpha` — ramp slope
/// - `beta`  — shift of both ramp and plateau centre
/// - `gamma` — plateau height
/// - `delta` — plateau width
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NeuroplastParams {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
    pub delta: f64,
}

/// Closed set of element-wise activations a layer can declare.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Activation {
    ReLU,
    Sigmoid,
    Tanh,
    Identity,
    Gelu,
    LeakyReLU { alpha: f64 },
    Elu { alpha: f64 },
    Mish,
    Swish,
    PReLU { alpha: f64 },
    Neuroplast(NeuroplastParams),
}

impl Activation {
    /// Element-wise activation.
    pub fn function(&self, x: f64) -> f64 {
        match self {
            Activation::ReLU => if x > 0.0 { x } else { 0.0 },
            Activation::Sigmoid => sigmoid(x),
            Activation::Tanh => x.tanh(),
            Activation::Identity => x,
            Activation::Gelu => {
                0.5 * x * (1.0 + (0.797_884_56 * (x + 0.044715 * x * x * x)).tanh())
            }
            Activation::LeakyReLU { alpha } | Activation::PReLU { alpha } => {
                if x > 0.0 { x } else { alpha * x }
            }
            Activation::Elu { alpha } => if x > 0.0 { x } else { alpha * (x.exp() - 1.0) },
            Activation::Mish => x * x.exp().ln_1p().tanh(),
            Activation::Swish => x * sigmoid(x),
            Activation::Neuroplast(p) => {
                let shifted = x - p.beta;
                let ramp = sigmoid(p.alpha * shifted);
                let plateau = p.gamma * (-(shifted * shifted) / (p.delta * p.delta)).exp();
                ramp * plateau
            }
        }
    }

    /// Canonical lowercase name written to records.
    pub fn name(&self) -> &'static str {
        match self {
            Activation::ReLU => "relu",
            Activation::Sigmoid => "sigmoid",
            Activation::Tanh => "tanh",
            Activation::Identity => "identity",
            Activation::Gelu => "gelu",
            Activation::LeakyReLU { .. } => "leaky_relu",
            Activation::Elu { .. } => "elu",
            Activation::Mish => "mish",
            Activation::Swish => "swish",
            Activation::PReLU { .. } => "prelu",
            Activation::Neuroplast(_) => "neuroplast",
        }
    }

    /// Integer tag used by the legacy `activation_type` field.
    pub fn code(&self) -> i64 {
        match self {
            Activation::ReLU => 0,
            Activation::Sigmoid => 1,
            Activation::Gelu => 2,
            Activation::Neuroplast(_) => 3,
            Activation::LeakyReLU { .. } => 4,
            Activation::Elu { .. } => 5,
            Activation::Mish => 6,
            Activation::Swish => 7,
            Activation::PReLU { .. } => 8,
            Activation::Tanh => 9,
            Activation::Identity => 10,
        }
    }

    /// Slope/scale parameter, for the variants that carry one.
    pub fn alpha(&self) -> Option<f64> {
        match self {
            Activation::LeakyReLU { alpha }
            | Activation::Elu { alpha }
            | Activation::PReLU { alpha } => Some(*alpha),
            _ => None,
        }
    }

    pub fn neuroplast_params(&self) -> Option<NeuroplastParams> {
        match self {
            Activation::Neuroplast(p) => Some(*p),
            _ => None,
        }
    }

    /// Resolves an activation by name (case-insensitive). `alpha` overrides
    /// the default slope of parameterised variants; `params` is mandatory for
    /// `neuroplast`.
    pub fn from_name(
        name: &str,
        alpha: Option<f64>,
        params: Option<NeuroplastParams>,
    ) -> InferenceResult<Activation> {
        let activation = match name.trim().to_ascii_lowercase().as_str() {
            "relu" => Activation::ReLU,
            "sigmoid" => Activation::Sigmoid,
            "tanh" => Activation::Tanh,
            "identity" | "linear" => Activation::Identity,
            "gelu" => Activation::Gelu,
            "leaky_relu" => Activation::LeakyReLU { alpha: alpha.unwrap_or(DEFAULT_LEAKY_ALPHA) },
            "elu" => Activation::Elu { alpha: alpha.unwrap_or(DEFAULT_ELU_ALPHA) },
            "mish" => Activation::Mish,
            "swish" => Activation::Swish,
            "prelu" => Activation::PReLU { alpha: alpha.unwrap_or(DEFAULT_LEAKY_ALPHA) },
            "neuroplast" => Activation::Neuroplast(params.ok_or_else(|| {
                InferenceError::MalformedRecord(
                    "neuroplast activation requires `neuroplast_params`".to_string(),
                )
            })?),
            _ => return Err(InferenceError::UnsupportedActivation(name.to_string())),
        };
        activation.validate()?;
        Ok(activation)
    }

    /// Checks that the parameters describe a finite, well-defined function.
    /// A neuroplast `delta` of zero would divide by zero.
    pub fn validate(&self) -> InferenceResult<()> {
        let invalid = |what: &str| {
            Err(InferenceError::MalformedRecord(format!("{} {what}", self.name())))
        };
        match self {
            Activation::LeakyReLU { alpha }
            | Activation::Elu { alpha }
            | Activation::PReLU { alpha }
                if !alpha.is_finite() =>
            {
                invalid("alpha must be finite")
            }
            Activation::Neuroplast(p) => {
                if ![p.alpha, p.beta, p.gamma, p.delta].iter().all(|v| v.is_finite()) {
                    invalid("parameters must be finite")
                } else if p.delta == 0.0 {
                    invalid("delta must be non-zero")
                } else {
                    Ok(())
                }
            }
            _ => Ok(()),
        }
    }

    /// Resolves an activation from its legacy integer tag.
    pub fn from_code(
        code: i64,
        alpha: Option<f64>,
        params: Option<NeuroplastParams>,
    ) -> InferenceResult<Activation> {
        let name = match code {
            0 => "relu",
            1 => "sigmoid",
            2 => "gelu",
            3 => "neuroplast",
            4 => "leaky_relu",
            5 => "elu",
            6 => "mish",
            7 => "swish",
            8 => "prelu",
            9 => "tanh",
            10 => "identity",
            other => return Err(InferenceError::UnsupportedActivation(format!("code {other}"))),
        };
        Activation::from_name(name, alpha, params)
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}
