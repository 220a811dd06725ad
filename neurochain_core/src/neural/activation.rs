//! Pointwise activation functions.

use serde::{Deserialize, Serialize};

/// A pointwise nonlinearity paired with its derivative.
///
/// `derivative` receives both the pre-activation input and the
/// post-activation output so each kind can use whichever is cheaper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    #[default]
    Identity,
    Logistic,
    Tanh,
    Relu,
    SoftPlus,
}

fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

impl Activation {
    pub fn apply(self, x: f64) -> f64 {
        match self {
            Activation::Identity => x,
            Activation::Logistic => logistic(x),
            Activation::Tanh => x.tanh(),
            Activation::Relu => x.max(0.0),
            // ln(1 + e^x) without overflow for large x
            Activation::SoftPlus => x.max(0.0) + (-x.abs()).exp().ln_1p(),
        }
    }

    pub fn derivative(self, pre: f64, post: f64) -> f64 {
        match self {
            Activation::Identity => 1.0,
            Activation::Logistic => post * (1.0 - post),
            Activation::Tanh => 1.0 - post * post,
            Activation::Relu => {
                if pre > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Activation::SoftPlus => logistic(pre),
        }
    }
}
