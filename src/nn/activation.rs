use crate::autograd::Variable;
use crate::error::Error;
use crate::tensor::FloatElem;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Element-wise activation applied between dense layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    #[default]
    Relu,
    Sigmoid,
    Tanh,
    Identity,
}

impl Activation {
    pub fn apply<T: FloatElem, const RANK: usize>(&self, x: &Variable<T, RANK>) -> Variable<T, RANK> {
        match self {
            Activation::Relu => x.relu(),
            Activation::Sigmoid => x.sigmoid(),
            Activation::Tanh => x.tanh(),
            Activation::Identity => x.clone(),
        }
    }
}

impl FromStr for Activation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "relu" => Ok(Activation::Relu),
            "sigmoid" => Ok(Activation::Sigmoid),
            "tanh" => Ok(Activation::Tanh),
            "identity" | "linear" | "none" => Ok(Activation::Identity),
            _ => Err(Error::UnknownActivation(s.to_string())),
        }
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Activation::Relu => "relu",
            Activation::Sigmoid => "sigmoid",
            Activation::Tanh => "tanh",
            Activation::Identity => "identity",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::Tensor;

    #[test]
    fn test_apply() {
        let x = Variable::new(Tensor::<f32, 1>::new(vec![-1.0, 0.0, 2.0], [3]).unwrap());
        assert_eq!(Activation::Relu.apply(&x).data.data(), &[0.0, 0.0, 2.0]);
        assert_eq!(Activation::Identity.apply(&x).data.data(), x.data.data());
        assert_eq!(Activation::Sigmoid.apply(&x).data.data()[1], 0.5);
        assert_eq!(Activation::Tanh.apply(&x).data.data()[1], 0.0);
    }

    #[test]
    fn test_parse() {
        assert_eq!("ReLU".parse::<Activation>().unwrap(), Activation::Relu);
        assert_eq!("linear".parse::<Activation>().unwrap(), Activation::Identity);
        assert!(matches!(
            "gelu".parse::<Activation>(),
            Err(Error::UnknownActivation(_))
        ));
        assert_eq!(Activation::Tanh.to_string(), "tanh");
    }

    #[test]
    fn test_serde_names() {
        let a: Activation = serde_json::from_str("\"sigmoid\"").unwrap();
        assert_eq!(a, Activation::Sigmoid);
        assert_eq!(serde_json::to_string(&Activation::Relu).unwrap(), "\"relu\"");
    }
}
