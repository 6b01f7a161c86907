use std::borrow::Cow;

use super::{MethodShape, TypeInfo};
use crate::model::{Func, Signature};

/// Adapts a base shape to conventions with an extra leading parameter,
/// such as gorilla/rpc's `*http.Request`.
///
/// Three-parameter methods are presented to the inner shape without their
/// first parameter. Every other method passes through untouched.
#[derive(Debug, Clone, Default)]
pub struct LeadingContext<S> {
    inner: S,
}

impl<S: MethodShape> LeadingContext<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    fn shift<'a>(&self, method: &'a Func) -> Cow<'a, Func> {
        let params = &method.signature.params;
        if params.len() != 3 {
            return Cow::Borrowed(method);
        }

        Cow::Owned(Func {
            name: method.name.clone(),
            package: method.package.clone(),
            receiver: method.receiver.clone(),
            signature: Signature {
                params: params[1..].to_vec(),
                results: method.signature.results.clone(),
                variadic: method.signature.variadic,
            },
        })
    }
}

impl<S: MethodShape> MethodShape for LeadingContext<S> {
    fn name(&self) -> &'static str {
        "leading-context"
    }

    fn is_suitable(&self, method: &Func) -> bool {
        self.inner.is_suitable(&self.shift(method))
    }

    fn arg_type(&self, method: &Func) -> Option<TypeInfo> {
        self.inner.arg_type(&self.shift(method))
    }

    fn reply_type(&self, method: &Func) -> Option<TypeInfo> {
        self.inner.reply_type(&self.shift(method))
    }
}
