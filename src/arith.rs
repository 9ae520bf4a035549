//! Example arithmetic service.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::rpc::{Registrar, RequestContext, RpcService, ServiceError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Args {
    #[serde(alias = "a")]
    pub a: i64,
    #[serde(alias = "b")]
    pub b: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Quotient {
    #[serde(alias = "quo")]
    pub quo: i64,
    #[serde(alias = "rem")]
    pub rem: i64,
}

#[derive(Debug, Default)]
pub struct Arith;

impl Arith {
    pub fn multiply(
        &self,
        _ctx: &RequestContext,
        args: &Args,
        reply: &mut i64,
    ) -> Result<(), ServiceError> {
        debug!(a = args.a, b = args.b, "multiply");
        *reply = args
            .a
            .checked_mul(args.b)
            .ok_or_else(|| ServiceError::new("integer overflow"))?;
        Ok(())
    }

    pub fn divide(
        &self,
        _ctx: &RequestContext,
        args: &Args,
        quo: &mut Quotient,
    ) -> Result<(), ServiceError> {
        debug!(a = args.a, b = args.b, "divide");
        if args.b == 0 {
            return Err(ServiceError::new("divide by zero"));
        }
        let overflow = || ServiceError::new("integer overflow");
        quo.quo = args.a.checked_div(args.b).ok_or_else(overflow)?;
        quo.rem = args.a.checked_rem(args.b).ok_or_else(overflow)?;
        Ok(())
    }
}

impl RpcService for Arith {
    fn register(registrar: &mut Registrar<Self>) {
        registrar
            .method("Multiply", Arith::multiply)
            .method("Divide", Arith::divide);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, Method, Uri};

    fn ctx() -> RequestContext {
        RequestContext {
            method: Method::POST,
            uri: Uri::from_static("/"),
            headers: HeaderMap::new(),
        }
    }

    #[test]
    fn multiply() {
        let mut reply = 0;
        Arith.multiply(&ctx(), &Args { a: 6, b: 7 }, &mut reply).unwrap();
        assert_eq!(reply, 42);
    }

    #[test]
    fn multiply_overflow() {
        let mut reply = 0;
        let err = Arith
            .multiply(&ctx(), &Args { a: i64::MAX, b: 2 }, &mut reply)
            .unwrap_err();
        assert_eq!(err.message, "integer overflow");
    }

    #[test]
    fn divide_truncates() {
        let mut quo = Quotient::default();
        Arith.divide(&ctx(), &Args { a: 7, b: 2 }, &mut quo).unwrap();
        assert_eq!(quo, Quotient { quo: 3, rem: 1 });

        Arith.divide(&ctx(), &Args { a: -7, b: 2 }, &mut quo).unwrap();
        assert_eq!(quo, Quotient { quo: -3, rem: -1 });
    }

    #[test]
    fn divide_by_zero() {
        let mut quo = Quotient::default();
        let err = Arith
            .divide(&ctx(), &Args { a: 1, b: 0 }, &mut quo)
            .unwrap_err();
        assert_eq!(err.to_string(), "divide by zero");
        assert_eq!(quo, Quotient::default());
    }

    #[test]
    fn divide_overflow() {
        let mut quo = Quotient::default();
        assert!(
            Arith
                .divide(&ctx(), &Args { a: i64::MIN, b: -1 }, &mut quo)
                .is_err()
        );
    }

    #[test]
    fn wire_field_names() {
        let args: Args = serde_json::from_str(r#"{"A":6,"b":7}"#).unwrap();
        assert_eq!(args, Args { a: 6, b: 7 });

        let json = serde_json::to_value(Quotient { quo: 3, rem: 1 }).unwrap();
        assert_eq!(json, serde_json::json!({"Quo": 3, "Rem": 1}));
    }
}
